//! Error types for the temporary arena and its formatter.

use std::fmt;

/// Errors reported by arena and formatter operations.
///
/// None of these are retried internally. After any of them the arena is
/// still in the state it had before the failing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The memory provider could not supply a buffer.
    AllocationFailed {
        /// The buffer size that was requested, in bytes.
        size: usize,
    },

    /// An allocation would run past the end of a fixed-size arena.
    OutOfArenaSpace {
        /// The allocation size, in bytes.
        requested: usize,
        /// Bytes left between the cursor and the end of the arena.
        available: usize,
    },

    /// A location outside the current buffer was passed to `restore_location`.
    InvalidRestoreLocation {
        /// The offending offset.
        offset: usize,
        /// The largest offset that would have been accepted.
        bound: usize,
    },

    /// An adopted buffer is smaller than the capacity it was installed with.
    ExternalBufferTooSmall {
        /// The capacity asked for, in bytes.
        requested: usize,
        /// The actual length of the buffer.
        len: usize,
    },

    /// The format string or its arguments were rejected.
    Format(FormatError),

    /// Writing formatted text to an output stream failed.
    Io(std::io::ErrorKind),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AllocationFailed { size } => {
                write!(f, "Failed to allocate arena buffer of {size} bytes")
            }
            Error::OutOfArenaSpace { requested, available } => {
                write!(
                    f,
                    "Out of arena space: requested {requested} bytes, available {available} bytes"
                )
            }
            Error::InvalidRestoreLocation { offset, bound } => {
                write!(f, "Invalid restore location {offset}: arena ends at {bound}")
            }
            Error::ExternalBufferTooSmall { requested, len } => {
                write!(
                    f,
                    "External buffer of {len} bytes cannot hold a capacity of {requested} bytes"
                )
            }
            Error::Format(err) => write!(f, "Format error: {err}"),
            Error::Io(kind) => write!(f, "Output error: {kind}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Format(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Self {
        Error::Format(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.kind())
    }
}

/// Problems found while rendering a format string.
///
/// Offsets are byte positions of the `%` that starts the directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The format string ends in the middle of a directive.
    TrailingPercent {
        /// Byte offset of the unfinished directive.
        offset: usize,
    },

    /// The conversion character is not a printf conversion.
    UnknownConversion {
        /// Byte offset of the directive.
        offset: usize,
        /// The character found in conversion position.
        conversion: char,
    },

    /// The conversion exists in C but is deliberately not supported.
    UnsupportedConversion {
        /// Byte offset of the directive.
        offset: usize,
        /// The conversion character.
        conversion: char,
    },

    /// The format consumes more arguments than were supplied.
    MissingArgument {
        /// Zero-based index of the missing argument.
        index: usize,
    },

    /// An argument has the wrong type for the conversion consuming it.
    ArgumentMismatch {
        /// Zero-based index of the argument.
        index: usize,
        /// The conversion character (`*` for width or precision).
        conversion: char,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::TrailingPercent { offset } => {
                write!(f, "incomplete directive at byte {offset}")
            }
            FormatError::UnknownConversion { offset, conversion } => {
                write!(f, "unknown conversion '%{conversion}' at byte {offset}")
            }
            FormatError::UnsupportedConversion { offset, conversion } => {
                write!(f, "unsupported conversion '%{conversion}' at byte {offset}")
            }
            FormatError::MissingArgument { index } => {
                write!(f, "missing argument {index}")
            }
            FormatError::ArgumentMismatch { index, conversion } => {
                write!(f, "argument {index} does not match '%{conversion}'")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Result type for arena and formatter operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::OutOfArenaSpace { requested: 64, available: 8 }),
            "Out of arena space: requested 64 bytes, available 8 bytes"
        );
        assert_eq!(
            format!("{}", Error::InvalidRestoreLocation { offset: 900, bound: 512 }),
            "Invalid restore location 900: arena ends at 512"
        );
        assert_eq!(
            format!("{}", Error::from(FormatError::MissingArgument { index: 2 })),
            "Format error: missing argument 2"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            Error::AllocationFailed { size: 16 },
            Error::AllocationFailed { size: 16 }
        );
        assert_ne!(
            Error::AllocationFailed { size: 16 },
            Error::AllocationFailed { size: 32 }
        );
    }

    #[test]
    fn test_format_error_is_source() {
        use std::error::Error as _;

        let err = Error::Format(FormatError::UnknownConversion {
            offset: 3,
            conversion: 'y',
        });
        assert!(err.source().is_some());
        assert!(Error::AllocationFailed { size: 1 }.source().is_none());
    }

    #[test]
    fn test_io_error_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(Error::from(io), Error::Io(std::io::ErrorKind::BrokenPipe));
    }
}
