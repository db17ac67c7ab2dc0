//! Error types for file stream opening, reading and writing.

use std::error::Error;
use std::fmt;
use std::io;

use reel_core::StreamError;

/// Errors raised by [`FileStreamReader`](crate::FileStreamReader) and
/// [`FileStreamWriter`](crate::FileStreamWriter).
#[derive(Debug)]
pub enum FormatError {
    /// Reading or writing the underlying stream failed.
    Stream(StreamError),
    /// The file does not start with the expected signature.
    SignatureMismatch {
        /// Signature the header spec expects.
        expected: Vec<u8>,
        /// Bytes found at the start of the file.
        found: Vec<u8>,
    },
    /// The header carries a format version this build cannot read.
    UnsupportedVersion {
        /// Version stored in the file.
        found: u32,
        /// Newest version this build reads.
        supported: u32,
    },
    /// The stored checksum does not match the payload.
    ChecksumMismatch {
        /// Checksum from the header.
        stored: u64,
        /// Checksum recomputed over the payload.
        computed: u64,
    },
    /// The header's checksum record was never finalized.
    ChecksumMissing,
    /// The header spec itself is invalid.
    InvalidHeader {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "stream error: {e}"),
            Self::SignatureMismatch { expected, found } => write!(
                f,
                "signature mismatch: expected {:?}, found {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(found)
            ),
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    f,
                    "unsupported format version {found} (this build reads up to {supported})"
                )
            }
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "checksum mismatch: stored={stored:#018x}, computed={computed:#018x}"
            ),
            Self::ChecksumMissing => write!(f, "checksum record was never finalized"),
            Self::InvalidHeader { reason } => write!(f, "invalid header spec: {reason}"),
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Stream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StreamError> for FormatError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        Self::Stream(StreamError::Io(e))
    }
}
