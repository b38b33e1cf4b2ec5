//! Result codes shared by the command decoder, the ring pool and the screen.

use core::fmt;

/// Everything that can go wrong while turning serial bytes into beam motions.
///
/// The numeric codes are part of the serial protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    OtherError,
    BufferOverrun,
    UnknownCommand,
    CommandTooLong,
    CommandIsNoop,
    TooManyArgs,
    WrongNumArgs,
    ParseError,
    BadArgument,
    OutOfMemory,
    CriticalPoolCorruption,
}

const ALL: [Error; 11] = [
    Error::OtherError,
    Error::BufferOverrun,
    Error::UnknownCommand,
    Error::CommandTooLong,
    Error::CommandIsNoop,
    Error::TooManyArgs,
    Error::WrongNumArgs,
    Error::ParseError,
    Error::BadArgument,
    Error::OutOfMemory,
    Error::CriticalPoolCorruption,
];

impl Error {
    /// Stable numeric code, as reported to the host.  Zero is reserved for
    /// "no error".
    pub const fn code(self) -> i8 {
        match self {
            Error::OtherError             => -1,
            Error::BufferOverrun          => -2,
            Error::UnknownCommand         => -3,
            Error::CommandTooLong         => -4,
            Error::CommandIsNoop          => -5,
            Error::TooManyArgs            => -6,
            Error::WrongNumArgs           => -7,
            Error::ParseError             => -8,
            Error::BadArgument            => -10,
            Error::OutOfMemory            => -11,
            Error::CriticalPoolCorruption => -12,
        }
    }

    pub const fn text(self) -> &'static str {
        match self {
            Error::OtherError             => "Other command error",
            Error::BufferOverrun          => "Buffer overrun",
            Error::UnknownCommand         => "Unknown command",
            Error::CommandTooLong         => "Command too long",
            Error::CommandIsNoop          => "Noop command not handled",
            Error::TooManyArgs            => "Too many arguments",
            Error::WrongNumArgs           => "Wrong number of arguments",
            Error::ParseError             => "Parse error",
            Error::BadArgument            => "Bad argument",
            Error::OutOfMemory            => "Out of memory",
            Error::CriticalPoolCorruption => "Critical memory pool corruption",
        }
    }

    pub fn from_code(code: i8) -> Option<Error> {
        ALL.iter().copied().find(|err| err.code() == code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Look up the text for a numeric result code, e.g. for logging a code that
/// came back over the serial line.
pub fn error_text(code: i8) -> &'static str {
    match code {
        0 => "No error",
        _ => Error::from_code(code).map_or("Unknown command error", Error::text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn codes_are_unique_and_round_trip() {
        for (i, a) in ALL.iter().enumerate() {
            assert!(a.code() < 0);
            assert_eq!(Error::from_code(a.code()), Some(*a));
            for b in &ALL[i + 1..] {
                assert!(a.code() != b.code(), "{:?} and {:?} share a code", a, b);
            }
        }
    }

    #[test]
    fn text_lookup() {
        assert_eq!(error_text(0), "No error");
        assert_eq!(error_text(-2), "Buffer overrun");
        assert_eq!(error_text(-7), "Wrong number of arguments");
        assert_eq!(error_text(-12), "Critical memory pool corruption");
        assert_eq!(error_text(-9), "Unknown command error");
        assert_eq!(error_text(42), "Unknown command error");
    }

    #[test]
    fn display_matches_text() {
        assert_eq!(Error::CommandTooLong.to_string(), "Command too long");
    }
}
