//! The interpolator: picks the motion to draw and moves the beam on every
//! tick.

use heapless::Vec;

use crate::command::{ScaleCmd, SpeedCmd};
use crate::dac::{ceil_log2, position_to_binary};
use crate::motion::Motion;
use crate::ring::RingPool;
use crate::{Error, MAX_SIZE_POW, MAX_SPEED, MIN_SPEED, SEQUENCE_CAPACITY};

pub const DEFAULT_SIZE_POW: u8 = 10;
/// Microseconds.
pub const DEFAULT_HOLD_TIME: u32 = 1000;
/// Millipoints per microsecond, i.e. one point per microsecond.
pub const DEFAULT_SPEED: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenConfig {
    /// The x axis spans `2^x_size_pow` points.
    pub x_size_pow: u8,
    pub y_size_pow: u8,
    pub x_centered: bool,
    pub y_centered: bool,
    /// Line speed in millipoints per microsecond.
    pub speed: u32,
    /// How long a point is shown, in microseconds.
    pub hold_time: u32,
    /// Keep showing the last motion until another one arrives.
    pub repeat: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            x_size_pow: DEFAULT_SIZE_POW,
            y_size_pow: DEFAULT_SIZE_POW,
            x_centered: false,
            y_centered: false,
            speed: DEFAULT_SPEED,
            hold_time: DEFAULT_HOLD_TIME,
            repeat: false,
        }
    }
}

/// Where the beam is, and whether it is drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Beam {
    pub x: i32,
    pub y: i32,
    pub active: bool,
}

/// Result of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing to draw.
    Idle,
    /// A motion is being drawn.
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceState {
    Idle,
    Recording,
    Replay(usize),
}

pub struct Screen {
    config: ScreenConfig,
    beam: Beam,
    motion_start: u64,
    motion_active: bool,
    motions_started: u32,
    sequence: Vec<Motion, SEQUENCE_CAPACITY>,
    seq_state: SequenceState,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(ScreenConfig::default())
    }
}

fn clamp_axis(pos: i32, size_pow: u8, centered: bool) -> i32 {
    let size = 1i32 << size_pow.min(MAX_SIZE_POW);
    if centered {
        pos.clamp(-size / 2, size / 2)
    } else {
        pos.clamp(0, size)
    }
}

fn axis_code(pos: i32, size_pow: u8, centered: bool, bits: u8) -> u16 {
    if centered {
        position_to_binary(pos, size_pow.saturating_sub(1), bits, true)
    } else {
        position_to_binary(pos, size_pow, bits, false)
    }
}

impl Screen {
    pub fn new(config: ScreenConfig) -> Self {
        Self {
            config,
            beam: Beam::default(),
            motion_start: 0,
            motion_active: false,
            motions_started: 0,
            sequence: Vec::new(),
            seq_state: SequenceState::Idle,
        }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ScreenConfig {
        &mut self.config
    }

    pub fn beam(&self) -> Beam {
        self.beam
    }

    /// Number of motions started so far, wrapping.  Changes whenever a new
    /// motion begins, including a repeated or replayed one.
    pub fn motion_count(&self) -> u32 {
        self.motions_started
    }

    /// Beam position as DAC codes for both axes.
    pub fn dac_output(&self, bits: u8) -> (u16, u16) {
        let c = &self.config;
        (axis_code(self.beam.x, c.x_size_pow, c.x_centered, bits),
         axis_code(self.beam.y, c.y_size_pow, c.y_centered, bits))
    }

    pub fn apply_scale(&mut self, cmd: &ScaleCmd) {
        self.config.x_size_pow = ceil_log2(cmd.x_width).clamp(1, MAX_SIZE_POW);
        self.config.y_size_pow = ceil_log2(cmd.y_width).clamp(1, MAX_SIZE_POW);
        self.config.x_centered = cmd.x_centered;
        self.config.y_centered = cmd.y_centered;
        log::debug!("screen is now 2^{} x 2^{}", self.config.x_size_pow, self.config.y_size_pow);
    }

    /// Update speed and/or hold time.  Speed arrives in points per
    /// millisecond, which is the same quantity as millipoints per microsecond.
    pub fn apply_speed(&mut self, cmd: &SpeedCmd) {
        if let Some(speed) = cmd.speed {
            // float to int casts saturate; the decoder rejects NaN and negatives
            self.config.speed = ((speed + 0.5) as u32).clamp(MIN_SPEED, MAX_SPEED);
        }
        if let Some(hold_time) = cmd.hold_time {
            self.config.hold_time = hold_time;
        }
    }

    pub fn set_flag(&mut self, name: &str, on: bool) -> Result<(), Error> {
        match name {
            "repeat" => self.config.repeat = on,
            _ => return Err(Error::BadArgument),
        }
        Ok(())
    }

    pub fn sequence_enabled(&self) -> bool {
        self.seq_state != SequenceState::Idle
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    /// Index of the motion being replayed; `None` unless a replay is running.
    pub fn sequence_index(&self) -> Option<usize> {
        match self.seq_state {
            SequenceState::Replay(idx) => Some(idx),
            _ => None,
        }
    }

    /// Begin recording.  Refused while a sequence is recorded or replayed.
    pub fn sequence_start(&mut self) -> bool {
        if self.seq_state != SequenceState::Idle {
            return false;
        }
        self.sequence.clear();
        self.seq_state = SequenceState::Recording;
        true
    }

    /// Record a motion.  Refused unless recording and there is room left.
    pub fn add_to_sequence(&mut self, motion: Motion) -> bool {
        self.seq_state == SequenceState::Recording && self.sequence.push(motion).is_ok()
    }

    /// Stop recording and start replaying from the first motion.
    pub fn sequence_end(&mut self) -> bool {
        if self.seq_state != SequenceState::Recording {
            return false;
        }
        self.seq_state = SequenceState::Replay(0);
        self.motion_active = false;
        true
    }

    /// Forget the sequence and go back to drawing from the pool.
    pub fn sequence_clear(&mut self) -> bool {
        self.sequence.clear();
        self.seq_state = SequenceState::Idle;
        self.motion_active = false;
        true
    }

    fn current(&self, pool: &RingPool<'_>) -> Option<Motion> {
        match self.seq_state {
            SequenceState::Idle => pool.peek().map(Motion::decode),
            SequenceState::Recording => None,
            SequenceState::Replay(idx) => self.sequence.get(idx).copied(),
        }
    }

    /// Move on from a finished motion.
    fn advance(&mut self, pool: &mut RingPool<'_>) {
        match &mut self.seq_state {
            SequenceState::Replay(idx) => *idx = (*idx + 1) % self.sequence.len().max(1),
            SequenceState::Recording => {}
            SequenceState::Idle => {
                if !(self.config.repeat && pool.len() == 1) {
                    pool.pop();
                }
            }
        }
    }

    fn show(&mut self, beam: Beam) {
        let c = &self.config;
        self.beam = Beam {
            x: clamp_axis(beam.x, c.x_size_pow, c.x_centered),
            y: clamp_axis(beam.y, c.y_size_pow, c.y_centered),
            active: beam.active,
        };
    }

    /// Advance the beam to time `now` (microseconds, monotonic).
    pub fn tick(&mut self, now: u64, pool: &mut RingPool<'_>) -> Progress {
        let motion = match self.current(pool) {
            Some(motion) => motion,
            None => {
                self.beam.active = false;
                self.motion_active = false;
                return Progress::Idle;
            }
        };

        if self.motion_active {
            let beam = motion.evaluate(now.saturating_sub(self.motion_start), self.config.hold_time);
            self.show(beam);
            if beam.active {
                return Progress::Running;
            }
            log::trace!("finished {:?} at {}", motion, now);
            self.advance(pool);
            self.motion_active = false;
        }

        let motion = match self.current(pool) {
            Some(motion) => motion,
            None => return Progress::Idle,
        };
        log::trace!("starting {:?} at {}", motion, now);
        self.motion_active = true;
        self.motions_started = self.motions_started.wrapping_add(1);
        self.motion_start = now;
        self.show(motion.evaluate(0, self.config.hold_time));
        Progress::Running
    }
}
