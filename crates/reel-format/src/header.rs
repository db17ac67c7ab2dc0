//! File header layout and checksum status.

use reel_core::FORMAT_VERSION;

use crate::error::FormatError;

/// Signature at the start of every command recording.
pub const DEFAULT_SIGNATURE: &[u8] = b"REELCMD\0";

/// Checksum key used by command recordings.
pub const DEFAULT_CHECKSUM_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Longest signature a header may carry.
pub const MAX_SIGNATURE_LEN: usize = 64;

/// Encoded size of the checksum record: `u8 present` + `u64 value`.
pub const CHECKSUM_RECORD_LEN: usize = 9;

/// Describes the fixed header a file stream expects or writes.
///
/// # Examples
///
/// ```
/// use reel_format::HeaderSpec;
///
/// let spec = HeaderSpec::default();
/// // 8-byte signature + u32 version + 9-byte checksum record.
/// assert_eq!(spec.encoded_len(), 21);
///
/// let bare = HeaderSpec { signature: None, checksum_seed: None, ..spec };
/// assert_eq!(bare.encoded_len(), 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderSpec {
    /// Leading signature bytes, compared byte-for-byte on open.
    pub signature: Option<Vec<u8>>,
    /// Format version written by this build; files with a newer version
    /// are rejected on open.
    pub version: u32,
    /// Checksum key. `None` means the header has no checksum record.
    pub checksum_seed: Option<u64>,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self {
            signature: Some(DEFAULT_SIGNATURE.to_vec()),
            version: FORMAT_VERSION,
            checksum_seed: Some(DEFAULT_CHECKSUM_SEED),
        }
    }
}

impl HeaderSpec {
    /// Total header size in bytes.
    pub fn encoded_len(&self) -> u64 {
        let signature = self.signature.as_ref().map_or(0, Vec::len);
        let checksum = if self.checksum_seed.is_some() {
            CHECKSUM_RECORD_LEN
        } else {
            0
        };
        (signature + 4 + checksum) as u64
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), FormatError> {
        if let Some(sig) = &self.signature {
            if sig.is_empty() {
                return Err(FormatError::InvalidHeader {
                    reason: "signature must not be empty (use None for no signature)".into(),
                });
            }
            if sig.len() > MAX_SIGNATURE_LEN {
                return Err(FormatError::InvalidHeader {
                    reason: format!(
                        "signature is {} bytes, maximum is {MAX_SIGNATURE_LEN}",
                        sig.len()
                    ),
                });
            }
        }
        if self.version == 0 {
            return Err(FormatError::InvalidHeader {
                reason: "format version must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Outcome of checksum verification when a file stream was opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChecksumStatus {
    /// The header has no checksum record, or verification was skipped.
    NotChecked,
    /// The stored checksum matches the payload.
    Valid(u64),
    /// The stored checksum does not match the payload.
    Mismatch {
        /// Checksum from the header.
        stored: u64,
        /// Checksum recomputed over the payload.
        computed: u64,
    },
    /// The checksum record's `present` flag is clear.
    Missing,
}

impl ChecksumStatus {
    /// Whether the payload may be trusted without opting into unsafe playback.
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Valid(_) | Self::NotChecked)
    }

    /// The failure as an error, if verification failed.
    pub fn to_error(&self) -> Option<FormatError> {
        match *self {
            Self::Mismatch { stored, computed } => {
                Some(FormatError::ChecksumMismatch { stored, computed })
            }
            Self::Missing => Some(FormatError::ChecksumMissing),
            Self::NotChecked | Self::Valid(_) => None,
        }
    }
}
