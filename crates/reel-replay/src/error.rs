//! Error types for command recording and playback.

use std::error::Error;
use std::fmt;
use std::io;

use reel_core::{CommandIndex, FrameId, StreamError};
use reel_format::FormatError;

/// Errors raised by the command writer, reader and streams.
#[derive(Debug)]
pub enum ReplayError {
    /// A byte stream or delta codec operation failed.
    Stream(StreamError),
    /// The file stream header could not be written or validated.
    Format(FormatError),
    /// The recording names a command this session does not provide.
    MissingCommandType {
        /// Key found in the recording's key table.
        key: String,
    },
    /// The session provides a command the recording does not contain.
    UnrecognizedCommand {
        /// Key of the live command.
        key: String,
    },
    /// Two commands share the same key.
    DuplicateKey {
        /// The repeated key.
        key: String,
    },
    /// A key cannot be stored in the key table.
    InvalidKey {
        /// The offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The key table bytes are not a valid table.
    MalformedKeyTable {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A frame record does not follow its predecessor.
    NonIncreasingFrame {
        /// The previous frame number.
        previous: FrameId,
        /// The offending frame number.
        found: FrameId,
    },
    /// A frame record addresses a command outside the key table.
    UnknownCommandIndex {
        /// Frame of the record.
        frame: FrameId,
        /// The out-of-range index.
        index: u32,
    },
    /// A frame record holds two deltas for the same command.
    DuplicateDelta {
        /// Frame of the record.
        frame: FrameId,
        /// The repeated command index.
        index: CommandIndex,
    },
    /// Playback was asked for a frame the reader has already passed.
    Desync {
        /// Earliest frame the reader can still serve.
        expected: FrameId,
        /// Frame the caller asked for.
        requested: FrameId,
    },
    /// `end_frame` was called without a matching `begin_frame`.
    FrameNotStarted,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "stream error: {e}"),
            Self::Format(e) => write!(f, "file format error: {e}"),
            Self::MissingCommandType { key } => write!(
                f,
                "missing command type '{key}' (the recording may come from a different version)"
            ),
            Self::UnrecognizedCommand { key } => {
                write!(f, "unrecognized command '{key}' is not in the recording")
            }
            Self::DuplicateKey { key } => write!(f, "duplicate command key '{key}'"),
            Self::InvalidKey { key, reason } => write!(f, "invalid command key '{key}': {reason}"),
            Self::MalformedKeyTable { detail } => write!(f, "malformed key table: {detail}"),
            Self::NonIncreasingFrame { previous, found } => write!(
                f,
                "frame {found} does not follow frame {previous}; frame numbers must increase"
            ),
            Self::UnknownCommandIndex { frame, index } => {
                write!(f, "frame {frame} references unknown command index {index}")
            }
            Self::DuplicateDelta { frame, index } => {
                write!(f, "frame {frame} holds two deltas for command {index}")
            }
            Self::Desync {
                expected,
                requested,
            } => write!(
                f,
                "playback desync: frame {requested} requested, reader is at frame {expected}"
            ),
            Self::FrameNotStarted => write!(f, "end_frame called with no frame in progress"),
        }
    }
}

impl Error for ReplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Stream(e) => Some(e),
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StreamError> for ReplayError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<FormatError> for ReplayError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Stream(StreamError::Io(e))
    }
}
