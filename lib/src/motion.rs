//! Beam motions as stored in the ring pool, and their evaluation over time.
//!
//! Positions are in points.  Line velocities are fixed point: millipoints per
//! microsecond, so `position * 1000 + velocity * elapsed_us` is the beam
//! position in millipoints.  All intermediate values are computed in 64 bits
//! (128 for the line length), which cannot overflow for any `i32` endpoints.

use crate::command::{LineCmd, PointCmd};
use crate::ring::RingPool;
use crate::screen::Beam;
use crate::{Error, MAX_SPEED, MIN_SPEED};

const TAG_BLANK: u8 = 0;
const TAG_POINT: u8 = 1;
const TAG_LINE: u8 = 2;

const MILLI: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointMotion {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMotion {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Velocity along x in millipoints per microsecond.
    pub dx: i32,
    /// Velocity along y in millipoints per microsecond.
    pub dy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Point(PointMotion),
    Line(LineMotion),
    /// Anything unrecognised; shows nothing and finishes at once.
    Blank,
}

fn read_i32(bytes: &[u8], idx: usize) -> i32 {
    let start = 1 + 4 * idx;
    let mut word = [0; 4];
    word.copy_from_slice(&bytes[start..start + 4]);
    i32::from_le_bytes(word)
}

fn write_i32s(buf: &mut [u8], values: &[i32]) {
    for (chunk, value) in buf[1..].chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

impl Motion {
    pub fn point(cmd: &PointCmd) -> Motion {
        Motion::Point(PointMotion { x: cmd.x, y: cmd.y })
    }

    /// A line drawn at `speed` millipoints per microsecond.
    pub fn line(cmd: &LineCmd, speed: u32) -> Motion {
        let (dx, dy) = line_velocity(cmd, speed);
        Motion::Line(LineMotion { x1: cmd.x1, y1: cmd.y1, x2: cmd.x2, y2: cmd.y2, dx, dy })
    }

    /// Size of the pool record for this motion.
    pub const fn encoded_len(&self) -> usize {
        match self {
            Motion::Point(_) => 1 + 2 * 4,
            Motion::Line(_) => 1 + 6 * 4,
            Motion::Blank => 1,
        }
    }

    /// Write the record into `buf`, which must hold `encoded_len()` bytes.
    pub fn encode_into(&self, buf: &mut [u8]) {
        match *self {
            Motion::Point(p) => {
                buf[0] = TAG_POINT;
                write_i32s(buf, &[p.x, p.y]);
            }
            Motion::Line(l) => {
                buf[0] = TAG_LINE;
                write_i32s(buf, &[l.x1, l.y1, l.x2, l.y2, l.dx, l.dy]);
            }
            Motion::Blank => buf[0] = TAG_BLANK,
        }
    }

    /// Read a record back.  Unknown tags and short records give `Blank`.
    pub fn decode(bytes: &[u8]) -> Motion {
        match bytes.first() {
            Some(&TAG_POINT) if bytes.len() >= 9 => Motion::Point(PointMotion {
                x: read_i32(bytes, 0),
                y: read_i32(bytes, 1),
            }),
            Some(&TAG_LINE) if bytes.len() >= 25 => Motion::Line(LineMotion {
                x1: read_i32(bytes, 0),
                y1: read_i32(bytes, 1),
                x2: read_i32(bytes, 2),
                y2: read_i32(bytes, 3),
                dx: read_i32(bytes, 4),
                dy: read_i32(bytes, 5),
            }),
            _ => Motion::Blank,
        }
    }

    /// Beam position `elapsed_us` after the motion started, before clamping
    /// to the screen.  The motion is finished once the beam is inactive.
    pub fn evaluate(&self, elapsed_us: u64, hold_time: u32) -> Beam {
        match self {
            Motion::Point(p) => Beam { x: p.x, y: p.y, active: elapsed_us < hold_time as u64 },
            Motion::Line(l) => l.evaluate(elapsed_us),
            Motion::Blank => Beam::default(),
        }
    }
}

/// Has the axis position `pos` (millipoints) reached `end` (points) when
/// travelling with velocity `d`?
fn reached(pos: i64, end: i32, d: i32) -> bool {
    let end = end as i64 * MILLI;
    match d {
        0 => false,
        d if d > 0 => pos >= end,
        _ => pos <= end,
    }
}

fn to_points(milli: i64) -> i32 {
    (milli + MILLI / 2).div_euclid(MILLI) as i32
}

impl LineMotion {
    fn evaluate(&self, elapsed_us: u64) -> Beam {
        let t = i64::try_from(elapsed_us).unwrap_or(i64::MAX);
        let mx = (self.x1 as i64 * MILLI).saturating_add((self.dx as i64).saturating_mul(t));
        let my = (self.y1 as i64 * MILLI).saturating_add((self.dy as i64).saturating_mul(t));

        let stalled = self.dx == 0 && self.dy == 0;
        if stalled || reached(mx, self.x2, self.dx) || reached(my, self.y2, self.dy) {
            Beam { x: self.x2, y: self.y2, active: false }
        } else {
            Beam { x: to_points(mx), y: to_points(my), active: true }
        }
    }
}

/// Per-axis velocity for a line at `speed` millipoints per microsecond.
///
/// The speed is floored to `MIN_SPEED`, so every line of non-zero length
/// moves along its dominant axis.  A zero-length line gets no velocity.
pub fn line_velocity(cmd: &LineCmd, speed: u32) -> (i32, i32) {
    let ex = cmd.x2 as i128 - cmd.x1 as i128;
    let ey = cmd.y2 as i128 - cmd.y1 as i128;
    let len_mpt = ((ex * ex + ey * ey) as u128 * (MILLI * MILLI) as u128).isqrt() as i128;
    if len_mpt == 0 {
        return (0, 0);
    }
    let speed = speed.clamp(MIN_SPEED, MAX_SPEED) as i128;
    let component = |e: i128| {
        let num = speed * e * MILLI as i128;
        // rounds half away from zero
        let d = (num.abs() + len_mpt / 2) / len_mpt;
        (d.min(i32::MAX as i128) as i32) * (num.signum() as i32)
    };
    (component(ex), component(ey))
}

fn store(pool: &mut RingPool<'_>, motion: Motion) -> Result<Motion, Error> {
    match pool.allocate(motion.encoded_len()) {
        Ok(Some(slot)) => {
            motion.encode_into(slot);
            Ok(motion)
        }
        Ok(None) => Err(Error::OtherError),
        Err(err) => {
            log::warn!("cannot store {:?}: {:?}", motion, err);
            Err(err.into())
        }
    }
}

/// Append a point to the pool.
pub fn push_point(pool: &mut RingPool<'_>, cmd: &PointCmd) -> Result<Motion, Error> {
    store(pool, Motion::point(cmd))
}

/// Append a line to the pool, with its velocity computed for `speed`.
pub fn push_line(pool: &mut RingPool<'_>, cmd: &LineCmd, speed: u32) -> Result<Motion, Error> {
    store(pool, Motion::line(cmd, speed))
}
