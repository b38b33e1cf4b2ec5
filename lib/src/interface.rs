//! The command interface to a client.
//!
//! The controller ties the pieces together: serial bytes go into the command
//! cache, complete lines are decoded and executed against the motion pool and
//! the screen, and every line is answered on the same channel.

use core::fmt::{self, Write};

use crate::command::{decode, Command, CommandCache, SequenceAction};
use crate::motion::{push_line, push_point, Motion};
use crate::ring::{PoolError, RingPool};
use crate::screen::{Beam, Progress, Screen};
use crate::{Error, CACHE_SIZE, VERSION};

pub trait WriteToHost {
    fn write_byte(&mut self, byte: u8);
}

/// Answer to one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    /// Empty line or `noop`.
    Noop,
    Error(Error),
}

fn is_terminator(byte: &u8) -> bool {
    *byte == b'\r' || *byte == b'\n'
}

/// Length of the first line in `bytes` including its first terminator, or
/// all of `bytes` if no line is complete.
fn piece_len(bytes: &[u8]) -> usize {
    bytes.iter().position(is_terminator).map_or(bytes.len(), |pos| pos + 1)
}

struct HostWriter<'a, Tx>(&'a mut Tx);

impl<Tx: WriteToHost> fmt::Write for HostWriter<'_, Tx> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            self.0.write_byte(byte);
        }
        Ok(())
    }
}

pub struct Controller<'buf, Tx> {
    cache: CommandCache<CACHE_SIZE>,
    pool: RingPool<'buf>,
    screen: Screen,
    tx: Tx,
    // a line was just terminated; one more terminator byte belongs to it
    line_ended: bool,
}

impl<'buf, Tx: WriteToHost> Controller<'buf, Tx> {
    pub fn new(pool_mem: &'buf mut [u8], screen: Screen, tx: Tx) -> Self {
        Self {
            cache: CommandCache::new(), pool: RingPool::new(pool_mem), screen, tx,
            line_ended: false,
        }
    }

    pub fn pool(&self) -> &RingPool<'buf> {
        &self.pool
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn tx_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    /// Send the version banner.
    pub fn greet(&mut self) {
        let (major, minor, patch) = VERSION;
        let _ = write!(HostWriter(&mut self.tx), "vectorgen v{}.{}.{}\r\n", major, minor, patch);
    }

    /// Drop all queued input and motions, and stop any sequence.  This is the
    /// only way out of a corrupted pool.
    pub fn reset(&mut self) {
        log::info!("resetting controller");
        self.cache.clear();
        self.line_ended = false;
        self.pool.reset();
        self.screen.sequence_clear();
    }

    /// Main entry point to feed a chunk of bytes from remote.
    ///
    /// Every complete line is executed and answered.  Returns the number of
    /// lines that were processed.
    pub fn feed(&mut self, mut bytes: &[u8]) -> usize {
        let mut lines = 0;
        while let Some(first) = bytes.first() {
            // second half of CRLF, LFCR or a doubled terminator, possibly
            // split across chunks
            if self.line_ended && is_terminator(first) {
                self.line_ended = false;
                bytes = &bytes[1..];
                continue;
            }
            // one line at a time, so a burst of short commands cannot overrun the cache
            let (piece, rest) = bytes.split_at(piece_len(bytes));
            self.line_ended = piece.last().is_some_and(is_terminator);
            if let Err(err) = self.cache.append(piece) {
                log::warn!("input discarded: {}", err);
                self.reply(Reply::Error(err));
            }
            lines += self.drain();
            bytes = rest;
        }
        lines
    }

    fn drain(&mut self) -> usize {
        let mut buf = [0; CACHE_SIZE];
        let mut lines = 0;
        loop {
            let reply = match self.cache.extract(&mut buf) {
                Ok(None) => break,
                Ok(Some(len)) => self.process_line(&buf[..len]),
                Err(Error::CommandIsNoop) => Reply::Noop,
                Err(err) => {
                    // the line cannot be extracted; drop it rather than loop
                    self.cache.clear();
                    Reply::Error(err)
                }
            };
            self.reply(reply);
            lines += 1;
        }
        lines
    }

    fn reply(&mut self, reply: Reply) {
        let mut out = HostWriter(&mut self.tx);
        let _ = match reply {
            Reply::Ok => out.write_str("ok\r\n"),
            Reply::Noop => out.write_str("noop\r\n"),
            Reply::Error(err) => write!(out, "error: {}\r\n", err),
        };
    }

    /// Decode and execute a single line, without terminator.
    pub fn process_line(&mut self, line: &[u8]) -> Reply {
        let cmd = match decode(line) {
            Ok(cmd) => cmd,
            Err(err) => {
                log::warn!("rejected {:?}: {}", core::str::from_utf8(line).unwrap_or("?"), err);
                return Reply::Error(err);
            }
        };
        log::debug!("command {:?}", cmd);
        if cmd == Command::Noop {
            return Reply::Noop;
        }
        match self.execute(cmd) {
            Ok(()) => Reply::Ok,
            Err(err) => {
                log::warn!("command failed: {}", err);
                Reply::Error(err)
            }
        }
    }

    pub fn execute(&mut self, cmd: Command) -> Result<(), Error> {
        match cmd {
            // while a sequence is on, motions belong to it instead of the pool
            Command::Point(ref point) => {
                if self.screen.sequence_enabled() {
                    self.record(Motion::point(point))
                } else {
                    push_point(&mut self.pool, point).map(drop)
                }
            }
            Command::Line(ref line) => {
                let speed = self.screen.config().speed;
                if self.screen.sequence_enabled() {
                    self.record(Motion::line(line, speed))
                } else {
                    push_line(&mut self.pool, line, speed).map(drop)
                }
            }
            Command::Scale(ref scale) => {
                self.screen.apply_scale(scale);
                Ok(())
            }
            Command::Speed(ref speed) => {
                self.screen.apply_speed(speed);
                Ok(())
            }
            Command::Set(ref name) => self.screen.set_flag(name, true),
            Command::Unset(ref name) => self.screen.set_flag(name, false),
            Command::Sequence(action) => {
                let done = match action {
                    SequenceAction::Start => self.screen.sequence_start(),
                    SequenceAction::End => self.screen.sequence_end(),
                    SequenceAction::Clear => self.screen.sequence_clear(),
                };
                if done { Ok(()) } else { Err(Error::OtherError) }
            }
            Command::Noop => Ok(()),
        }
    }

    fn record(&mut self, motion: Motion) -> Result<(), Error> {
        if self.screen.add_to_sequence(motion) {
            Ok(())
        } else if self.screen.sequence_index().is_some() {
            // replaying: new motions are neither recorded nor queued
            Err(Error::OtherError)
        } else {
            Err(Error::OutOfMemory)
        }
    }

    /// Advance the beam; see [`Screen::tick`].
    pub fn tick(&mut self, now: u64) -> Progress {
        self.screen.tick(now, &mut self.pool)
    }

    pub fn beam(&self) -> Beam {
        self.screen.beam()
    }

    pub fn dac_output(&self, bits: u8) -> (u16, u16) {
        self.screen.dac_output(bits)
    }

    /// True once the pool has detected corrupted bookkeeping.
    pub fn pool_corrupted(&self) -> bool {
        self.pool.last_error() == Some(PoolError::Critical)
    }
}
