//! Error type for byte stream and delta codec operations.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors raised while reading, writing or applying command data.
///
/// Returned by every [`ByteReader`](crate::ByteReader) and
/// [`ByteWriter`](crate::ByteWriter) primitive and by the
/// [`CommandDelta`](crate::CommandDelta) codec.
#[derive(Debug)]
pub enum StreamError {
    /// The underlying I/O handle failed.
    Io(io::Error),
    /// The source ended before a complete value could be read.
    Truncated {
        /// Bytes the read asked for.
        wanted: usize,
        /// Bytes that were actually available.
        got: usize,
    },
    /// The stream failed earlier and refuses further use.
    Invalidated,
    /// Decoded bytes do not form a valid value.
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A delta was written or applied while holding no change.
    NoDelta,
    /// A delta was paired with a command of a different state type.
    TypeMismatch {
        /// Key of the command the delta was offered.
        key: String,
    },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Truncated { wanted, got } => {
                write!(f, "short read: wanted {wanted} bytes, got {got}")
            }
            Self::Invalidated => write!(f, "stream is invalid after an earlier failure"),
            Self::Malformed { detail } => write!(f, "malformed data: {detail}"),
            Self::NoDelta => write!(f, "delta holds no change"),
            Self::TypeMismatch { key } => {
                write!(f, "delta does not match the state type of command '{key}'")
            }
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl StreamError {
    /// Whether this error means the source simply ran out of bytes.
    pub fn is_truncation(&self) -> bool {
        match self {
            Self::Truncated { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
