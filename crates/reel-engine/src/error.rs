//! Session error type.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use reel_format::FormatError;
use reel_replay::ReplayError;

use crate::config::ConfigError;

/// Errors raised while opening, driving or closing a session.
///
/// The `Display` text is meant for end users: it tells apart a file that
/// could not be opened, a recording that does not match the session's
/// commands, and a damaged recording.
#[derive(Debug)]
pub enum SessionError {
    /// The configuration is invalid.
    Config(ConfigError),
    /// The recording file could not be opened or created.
    OpenFailed {
        /// Path that was tried.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Recording or playback failed.
    Replay(ReplayError),
    /// The recording's header or checksum is invalid.
    Format(FormatError),
    /// The session was already closed.
    Closed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid session config: {e}"),
            Self::OpenFailed { path, source } => {
                write!(f, "could not open file '{}': {source}", path.display())
            }
            Self::Replay(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "invalid recording: {e}"),
            Self::Closed => write!(f, "session is closed"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::OpenFailed { source, .. } => Some(source),
            Self::Replay(e) => Some(e),
            Self::Format(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ReplayError> for SessionError {
    fn from(e: ReplayError) -> Self {
        match e {
            ReplayError::Format(e) => Self::Format(e),
            e => Self::Replay(e),
        }
    }
}

impl From<FormatError> for SessionError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}
