#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod dac;
mod error;
pub mod interface;
pub mod motion;
pub mod ring;
pub mod screen;

use pkg_version::{pkg_version_major, pkg_version_minor, pkg_version_patch};

pub use error::{error_text, Error};

/// Bytes of serial input buffered while waiting for a line terminator.
pub const CACHE_SIZE: usize = 255;
/// Arguments after the command name.
pub const MAX_ARGS: usize = 10;
/// Longest flag name.
pub const MAX_TOKEN: usize = 16;
/// Motions that fit into a recorded sequence.
pub const SEQUENCE_CAPACITY: usize = 16;

/// Resolution of the DAC the beam position is rendered for.
pub const DAC_BIT_WIDTH: u8 = 16;
/// Largest axis is `2^MAX_SIZE_POW` points.
pub const MAX_SIZE_POW: u8 = 16;

/// Line speed bounds, in millipoints per microsecond.
pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 1_000_000;

/// Reported in the greeting banner.
pub const VERSION: (u32, u32, u32) = (pkg_version_major!(), pkg_version_minor!(), pkg_version_patch!());
