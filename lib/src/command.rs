//! Line-based command input: a byte cache fed by the serial port, and the
//! decoder that turns one complete line into a typed [`Command`].

use btoi::{btoi, btou};
use heapless::{String, Vec};

use crate::{Error, CACHE_SIZE, MAX_ARGS, MAX_SIZE_POW, MAX_TOKEN};

const BACKSPACE: u8 = 0x08;

/// Name of a boolean setting for `set` / `unset`.
pub type FlagName = String<MAX_TOKEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleCmd {
    /// Full extent of the x axis.
    pub x_width: u32,
    /// Full extent of the y axis.
    pub y_width: u32,
    /// Zero point at the middle of the x axis instead of its edge.
    pub x_centered: bool,
    pub y_centered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointCmd {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCmd {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Timing settings.  `speed` and `hold` both produce this; each fills in
/// only its own field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedCmd {
    /// Points per millisecond.
    pub speed: Option<f32>,
    /// Microseconds to hold a point.
    pub hold_time: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceAction {
    Start,
    End,
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scale(ScaleCmd),
    Point(PointCmd),
    Line(LineCmd),
    Speed(SpeedCmd),
    Sequence(SequenceAction),
    Set(FlagName),
    Unset(FlagName),
    Noop,
}

/// Accumulates serial input until it holds complete lines.
pub struct CommandCache<const N: usize = CACHE_SIZE> {
    buf: Vec<u8, N>,
}

impl<const N: usize> Default for CommandCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CommandCache<N> {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Add a chunk of raw serial input.
    ///
    /// Only printable characters and line terminators are kept, and a
    /// backspace removes the previous character.  A chunk that could overflow
    /// the cache throws away everything, including what was cached before.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.buf.len() + bytes.len() > N {
            self.clear();
            return Err(Error::CommandTooLong);
        }
        for &byte in bytes {
            match byte {
                b' '..=b'~' | b'\r' | b'\n' => {
                    // capacity was checked for the whole chunk above
                    let _ = self.buf.push(byte);
                }
                BACKSPACE => {
                    self.buf.pop();
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn terminator_pos(&self) -> Option<usize> {
        self.buf.iter().position(|&b| b == b'\r' || b == b'\n')
    }

    /// True once at least one line terminator has arrived.
    pub fn is_complete(&self) -> bool {
        self.terminator_pos().is_some()
    }

    /// Length of the first line, or 0 if no line is complete.
    pub fn line_length(&self) -> usize {
        self.terminator_pos().unwrap_or(0)
    }

    /// Drop `len` bytes from the front.
    fn shift(&mut self, len: usize) {
        let len = len.min(self.buf.len());
        self.buf.copy_within(len.., 0);
        self.buf.truncate(self.buf.len() - len);
    }

    /// Drop up to two leading terminator bytes (CRLF, LFCR or a doubled one).
    fn trim_terminator(&mut self) -> usize {
        let count = self.buf.iter().take(2).take_while(|&&b| b == b'\r' || b == b'\n').count();
        self.shift(count);
        count
    }

    /// Move the first complete line into `out`, without its terminator.
    ///
    /// Returns `Ok(None)` while no line is complete, and `Ok(Some(len))` with
    /// the line length otherwise.  An empty line is consumed and reported as
    /// [`Error::CommandIsNoop`].  If `out` is too small the cache is left
    /// untouched.
    pub fn extract(&mut self, out: &mut [u8]) -> Result<Option<usize>, Error> {
        let len = match self.terminator_pos() {
            None => return Ok(None),
            Some(len) => len,
        };
        if len == 0 {
            self.trim_terminator();
            return Err(Error::CommandIsNoop);
        }
        if out.len() < len {
            return Err(Error::BufferOverrun);
        }
        out[..len].copy_from_slice(&self.buf[..len]);
        self.shift(len);
        self.trim_terminator();
        Ok(Some(len))
    }
}

/// Decode a single command line (without terminator).
pub fn decode(line: &[u8]) -> Result<Command, Error> {
    let mut tokens = line.split(|&b| b == b' ').filter(|tok| !tok.is_empty());
    let name = tokens.next().unwrap_or_default();
    let mut args: Vec<&[u8], MAX_ARGS> = Vec::new();
    for arg in tokens {
        args.push(arg).map_err(|_| Error::TooManyArgs)?;
    }

    match name {
        b"scale"    => decode_scale(&args).map(Command::Scale),
        b"point"    => decode_point(&args).map(Command::Point),
        b"line"     => decode_line(&args).map(Command::Line),
        b"speed"    => {
            let [speed] = expect_args::<1>(&args)?;
            let speed = parse_float(speed)?;
            if !speed.is_finite() || speed < 0.0 {
                return Err(Error::BadArgument);
            }
            Ok(Command::Speed(SpeedCmd { speed: Some(speed), hold_time: None }))
        }
        b"hold"     => {
            let [hold] = expect_args::<1>(&args)?;
            let hold_time = btou(hold).map_err(|_| Error::ParseError)?;
            Ok(Command::Speed(SpeedCmd { speed: None, hold_time: Some(hold_time) }))
        }
        b"sequence" => decode_sequence(&args).map(Command::Sequence),
        b"set"      => decode_flag(&args).map(Command::Set),
        b"unset"    => decode_flag(&args).map(Command::Unset),
        b"noop"     => expect_args::<0>(&args).map(|_| Command::Noop),
        _           => Err(Error::UnknownCommand),
    }
}

/// Check the argument count and hand them out as an array.
fn expect_args<'a, const K: usize>(args: &[&'a [u8]]) -> Result<[&'a [u8]; K], Error> {
    <[&[u8]; K]>::try_from(args).map_err(|_| Error::WrongNumArgs)
}

fn parse_int(arg: &[u8]) -> Result<i32, Error> {
    btoi(arg).map_err(|_| Error::ParseError)
}

fn parse_float(arg: &[u8]) -> Result<f32, Error> {
    core::str::from_utf8(arg).ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::ParseError)
}

fn parse_width(arg: &[u8]) -> Result<u32, Error> {
    let width: u32 = btou(arg).map_err(|_| Error::ParseError)?;
    if width == 0 || width > 1 << MAX_SIZE_POW {
        return Err(Error::BadArgument);
    }
    Ok(width)
}

fn decode_scale(args: &[&[u8]]) -> Result<ScaleCmd, Error> {
    let [xw, yw, xc, yc] = expect_args::<4>(args)?;
    Ok(ScaleCmd {
        x_width: parse_width(xw)?,
        y_width: parse_width(yw)?,
        x_centered: parse_int(xc)? != 0,
        y_centered: parse_int(yc)? != 0,
    })
}

fn decode_point(args: &[&[u8]]) -> Result<PointCmd, Error> {
    let [x, y] = expect_args::<2>(args)?;
    Ok(PointCmd { x: parse_int(x)?, y: parse_int(y)? })
}

fn decode_line(args: &[&[u8]]) -> Result<LineCmd, Error> {
    let [x1, y1, x2, y2] = expect_args::<4>(args)?;
    Ok(LineCmd {
        x1: parse_int(x1)?,
        y1: parse_int(y1)?,
        x2: parse_int(x2)?,
        y2: parse_int(y2)?,
    })
}

fn decode_sequence(args: &[&[u8]]) -> Result<SequenceAction, Error> {
    let [action] = expect_args::<1>(args)?;
    match action {
        b"start" => Ok(SequenceAction::Start),
        b"end"   => Ok(SequenceAction::End),
        b"clear" => Ok(SequenceAction::Clear),
        _        => Err(Error::BadArgument),
    }
}

fn decode_flag(args: &[&[u8]]) -> Result<FlagName, Error> {
    let [name] = expect_args::<1>(args)?;
    let name = core::str::from_utf8(name).map_err(|_| Error::ParseError)?;
    let mut flag = FlagName::new();
    flag.push_str(name).map_err(|_| Error::BadArgument)?;
    Ok(flag)
}
