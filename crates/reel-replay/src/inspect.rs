//! Walk a recording without applying it.

use std::io::{Read, Seek};

use reel_core::{CommandIndex, FrameId, SharedCommand};
use reel_format::{ChecksumStatus, HeaderSpec};

use crate::error::ReplayError;
use crate::reader::FileCommandReader;

/// One frame record of a recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame the record applies to.
    pub frame: FrameId,
    /// Commands the record carries deltas for, in file order.
    pub indices: Vec<CommandIndex>,
}

impl FrameSummary {
    /// Whether this is a zero-delta end-of-playback record.
    pub fn is_terminator(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Structure of a recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingInfo {
    /// Format version from the header.
    pub version: u32,
    /// Checksum verification result.
    pub checksum: ChecksumStatus,
    /// Key table, in index order.
    pub keys: Vec<String>,
    /// Every frame record, terminator included.
    pub frames: Vec<FrameSummary>,
}

impl RecordingInfo {
    /// Number of records carrying deltas.
    pub fn record_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_terminator()).count()
    }
}

/// Parse every record of a recording.
///
/// Delta lengths are implied by command types, so the live `commands`
/// are needed to step over them. They are reset to default and no delta
/// is applied to them. The checksum is verified and reported but not
/// enforced.
pub fn inspect_recording<R: Read + Seek>(
    inner: R,
    header: Option<&HeaderSpec>,
    commands: &[SharedCommand],
) -> Result<RecordingInfo, ReplayError> {
    let mut reader = FileCommandReader::open(inner, header, true, commands)?;
    let mut frames = Vec::new();
    while let Some((frame, indices)) = reader.lookahead() {
        let summary = FrameSummary {
            frame,
            indices: indices.to_vec(),
        };
        let terminator = summary.is_terminator();
        frames.push(summary);
        if terminator {
            break;
        }
        reader.load_next_frame()?;
    }
    Ok(RecordingInfo {
        version: reader.format_version(),
        checksum: reader.checksum_status(),
        keys: reader.keys().map(str::to_string).collect(),
        frames,
    })
}
