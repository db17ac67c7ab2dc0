//! Byte-level recording builder.
//!
//! Writes the key table and frame records by hand, independently of the
//! command writer, so tests can produce files the writer never would:
//! out-of-order frames, unknown indices, truncated records.

use std::io::Cursor;

use reel_core::ByteWriter;
use reel_format::{FileStreamWriter, FormatError, HeaderSpec};

/// Builds a recording one record at a time.
#[derive(Clone, Debug)]
pub struct RecordingBuilder {
    header: Option<HeaderSpec>,
    keys: Vec<String>,
    body: Vec<u8>,
}

impl RecordingBuilder {
    /// A recording with the default header and the given key table.
    pub fn new(keys: &[&str]) -> Self {
        Self {
            header: Some(HeaderSpec::default()),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, header: Option<HeaderSpec>) -> Self {
        self.header = header;
        self
    }

    /// Append a frame record with `(command index, encoded delta)` pairs.
    pub fn record(mut self, frame: u32, deltas: &[(u32, &[u8])]) -> Self {
        self.body.extend_from_slice(&frame.to_le_bytes());
        self.body
            .extend_from_slice(&(deltas.len() as u32).to_le_bytes());
        for (index, delta) in deltas {
            self.body.extend_from_slice(&index.to_le_bytes());
            self.body.extend_from_slice(delta);
        }
        self
    }

    /// Append a zero-delta end-of-playback record.
    pub fn terminator(self, frame: u32) -> Self {
        self.record(frame, &[])
    }

    /// Append arbitrary bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// The payload: key table followed by the records.
    pub fn payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for key in &self.keys {
            out.extend_from_slice(&(key.len() as u16).to_le_bytes());
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    /// The complete file, header and finalized checksum included.
    pub fn build(&self) -> Result<Vec<u8>, FormatError> {
        let mut writer = FileStreamWriter::create(Cursor::new(Vec::new()), self.header.as_ref())?;
        writer.write_bytes(&self.payload())?;
        Ok(writer.into_inner()?.into_inner())
    }
}
