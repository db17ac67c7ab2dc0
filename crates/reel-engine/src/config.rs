//! Session configuration, validation, and error types.
//!
//! [`SessionConfig`] is the input for constructing a
//! [`CommandManager`](crate::CommandManager).
//! [`validate()`](SessionConfig::validate) checks structural invariants
//! before any file is touched.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use reel_format::HeaderSpec;

// ── PlaybackMode ───────────────────────────────────────────────────

/// Where a session's commands come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Commands are driven by their live streams; nothing is recorded.
    #[default]
    Live,
    /// Commands are driven live and every change is recorded.
    Record,
    /// Commands are driven from a recording.
    Playback,
}

impl PlaybackMode {
    /// Whether the mode reads or writes a file.
    pub fn is_file_backed(self) -> bool {
        !matches!(self, Self::Live)
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Record => write!(f, "record"),
            Self::Playback => write!(f, "playback"),
        }
    }
}

// ── ChecksumPolicy ─────────────────────────────────────────────────

/// What playback does with a recording whose checksum does not verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// A mismatched or missing checksum fails the session at open.
    #[default]
    Strict,
    /// Verify and report through
    /// [`CommandManager::checksum_status`](crate::CommandManager::checksum_status),
    /// but play the file regardless.
    AllowUnsafe,
    /// Do not verify.
    Skip,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SessionConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// A file-backed mode was configured without a path.
    MissingPath {
        /// The configured mode.
        mode: PlaybackMode,
    },
    /// The header spec is invalid.
    InvalidHeader {
        /// Description of the problem.
        reason: String,
    },
    /// An external file handle does not suit the mode.
    IoModeMismatch {
        /// The configured mode.
        mode: PlaybackMode,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPath { mode } => write!(f, "{mode} mode requires a file path"),
            Self::InvalidHeader { reason } => write!(f, "invalid header: {reason}"),
            Self::IoModeMismatch { mode } => {
                write!(f, "file handle does not match {mode} mode")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SessionConfig ──────────────────────────────────────────────────

/// Configuration for one recording or playback session.
///
/// # Examples
///
/// ```
/// use reel_engine::{PlaybackMode, SessionConfig};
///
/// let config = SessionConfig {
///     mode: PlaybackMode::Record,
///     path: Some("session.reel".into()),
///     ..SessionConfig::default()
/// };
/// assert!(config.validate().is_ok());
///
/// let no_path = SessionConfig { path: None, ..config };
/// assert!(no_path.validate().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Live, record or playback. Default: live.
    pub mode: PlaybackMode,
    /// Recording path, required by file-backed modes unless an external
    /// handle is supplied.
    pub path: Option<PathBuf>,
    /// File header written or expected.
    pub header: HeaderSpec,
    /// Checksum handling on playback. Default: strict.
    pub checksum_policy: ChecksumPolicy,
    /// Append an end-of-playback record when a recording is closed.
    /// Default: false.
    pub end_marker: bool,
}

impl SessionConfig {
    /// Check every invariant, including the path for file-backed modes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode.is_file_backed() && self.path.is_none() {
            return Err(ConfigError::MissingPath { mode: self.mode });
        }
        self.validate_header()
    }

    /// Check the header spec alone.
    pub fn validate_header(&self) -> Result<(), ConfigError> {
        self.header
            .validate()
            .map_err(|e| ConfigError::InvalidHeader {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_live_and_valid() {
        let config = SessionConfig::default();
        assert_eq!(config.mode, PlaybackMode::Live);
        assert_eq!(config.checksum_policy, ChecksumPolicy::Strict);
        assert!(!config.end_marker);
        config.validate().unwrap();
    }

    #[test]
    fn file_modes_need_a_path() {
        for mode in [PlaybackMode::Record, PlaybackMode::Playback] {
            let config = SessionConfig {
                mode,
                ..SessionConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::MissingPath { mode }));
        }
    }

    #[test]
    fn oversized_signature_rejected() {
        let mut config = SessionConfig::default();
        config.header.signature = Some(vec![b's'; 65]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }
}
