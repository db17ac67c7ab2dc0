//! Header-reserving, checksum-accumulating file stream writer.
//!
//! [`FileStreamWriter`] writes the header up front with a placeholder
//! checksum record, feeds every payload byte into a [`ChecksumCalculator`],
//! and on [`finish`](FileStreamWriter::finish) seeks back to overwrite the
//! placeholder with the finalized value.

use std::io::{Seek, SeekFrom, Write};

use reel_core::{ByteWriter, StreamError, FORMAT_VERSION};

use crate::checksum::ChecksumCalculator;
use crate::error::FormatError;
use crate::header::{HeaderSpec, CHECKSUM_RECORD_LEN};

/// Writes a header plus payload to any `Write + Seek` sink.
///
/// Generic over `W` so tests can use `Cursor<Vec<u8>>` and production
/// code can use `BufWriter<File>`.
pub struct FileStreamWriter<W: Write + Seek> {
    inner: W,
    version: u32,
    checksum: Option<ChecksumCalculator>,
    checksum_offset: Option<u64>,
    payload_bytes: u64,
    valid: bool,
    finished: bool,
}

impl<W: Write + Seek> FileStreamWriter<W> {
    /// Create a writer, immediately reserving the header region if `header` is set.
    pub fn create(mut inner: W, header: Option<&HeaderSpec>) -> Result<Self, FormatError> {
        let Some(spec) = header else {
            return Ok(Self {
                inner,
                version: FORMAT_VERSION,
                checksum: None,
                checksum_offset: None,
                payload_bytes: 0,
                valid: true,
                finished: false,
            });
        };
        spec.validate()?;

        if let Some(sig) = &spec.signature {
            inner.write_all(sig)?;
        }
        inner.write_all(&spec.version.to_le_bytes())?;

        let (checksum, checksum_offset) = match spec.checksum_seed {
            Some(seed) => {
                let offset = inner.stream_position()?;
                inner.write_all(&[0u8; CHECKSUM_RECORD_LEN])?;
                (Some(ChecksumCalculator::new(seed)), Some(offset))
            }
            None => (None, None),
        };

        Ok(Self {
            inner,
            version: spec.version,
            checksum,
            checksum_offset,
            payload_bytes: 0,
            valid: true,
            finished: false,
        })
    }

    /// Payload bytes written so far (header excluded).
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// Whether every write so far succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether [`finish`](Self::finish) has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Finalize the checksum into the reserved header slot and flush.
    ///
    /// Returns the checksum written, or `None` if the header carries no
    /// checksum record. Calling it again is a no-op returning `Ok(None)`.
    /// If patching the header fails the stream is invalidated, and later
    /// calls fail with [`StreamError::Invalidated`].
    pub fn finish(&mut self) -> Result<Option<u64>, FormatError> {
        if self.finished {
            return Ok(None);
        }
        if !self.valid {
            return Err(StreamError::Invalidated.into());
        }
        match self.patch_checksum() {
            Ok(written) => {
                self.checksum = None;
                self.finished = true;
                Ok(written)
            }
            Err(e) => {
                self.valid = false;
                Err(e)
            }
        }
    }

    fn patch_checksum(&mut self) -> Result<Option<u64>, FormatError> {
        let written = match (&self.checksum, self.checksum_offset) {
            (Some(calc), Some(offset)) => {
                let value = calc.clone().finalize();
                let mut record = [0u8; CHECKSUM_RECORD_LEN];
                record[0] = 1;
                record[1..].copy_from_slice(&value.to_le_bytes());
                self.inner.seek(SeekFrom::Start(offset))?;
                self.inner.write_all(&record)?;
                self.inner.seek(SeekFrom::End(0))?;
                tracing::debug!(
                    checksum = value,
                    payload_bytes = self.payload_bytes,
                    "checksum finalized"
                );
                Some(value)
            }
            _ => None,
        };
        self.inner.flush()?;
        Ok(written)
    }

    /// Finish the stream and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W, FormatError> {
        self.finish()?;
        Ok(self.inner)
    }
}

impl<W: Write + Seek> ByteWriter for FileStreamWriter<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        if !self.valid || self.finished {
            return Err(StreamError::Invalidated);
        }
        if let Err(e) = self.inner.write_all(bytes) {
            self.valid = false;
            return Err(e.into());
        }
        if let Some(calc) = &mut self.checksum {
            calc.update(bytes);
        }
        self.payload_bytes += bytes.len() as u64;
        Ok(())
    }

    fn format_version(&self) -> u32 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;
    use crate::header::{DEFAULT_CHECKSUM_SEED, DEFAULT_SIGNATURE};
    use reel_core::stream::write_u32_le;
    use std::io::Cursor;

    #[test]
    fn header_layout_and_patched_checksum() {
        let spec = HeaderSpec::default();
        let mut writer = FileStreamWriter::create(Cursor::new(Vec::new()), Some(&spec)).unwrap();
        write_u32_le(&mut writer, 0xAABB_CCDD).unwrap();
        let value = writer.finish().unwrap().unwrap();
        let bytes = writer.into_inner().unwrap().into_inner();

        let sig_len = DEFAULT_SIGNATURE.len();
        assert_eq!(&bytes[..sig_len], DEFAULT_SIGNATURE);
        assert_eq!(&bytes[sig_len..sig_len + 4], &FORMAT_VERSION.to_le_bytes());
        assert_eq!(bytes[sig_len + 4], 1);
        let stored = u64::from_le_bytes(bytes[sig_len + 5..sig_len + 13].try_into().unwrap());
        assert_eq!(stored, value);
        assert_eq!(value, checksum(DEFAULT_CHECKSUM_SEED, &0xAABB_CCDDu32.to_le_bytes()));
        assert_eq!(bytes.len() as u64, spec.encoded_len() + 4);
    }

    #[test]
    fn unfinished_stream_keeps_placeholder() {
        let spec = HeaderSpec::default();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = FileStreamWriter::create(&mut cursor, Some(&spec)).unwrap();
            writer.write_bytes(&[1, 2, 3]).unwrap();
        }
        let bytes = cursor.into_inner();
        let record_at = DEFAULT_SIGNATURE.len() + 4;
        assert_eq!(&bytes[record_at..record_at + CHECKSUM_RECORD_LEN], &[0u8; 9]);
    }

    #[test]
    fn headerless_stream_is_pure_payload() {
        let mut writer = FileStreamWriter::create(Cursor::new(Vec::new()), None).unwrap();
        writer.write_bytes(b"abc").unwrap();
        assert_eq!(writer.finish().unwrap(), None);
        assert_eq!(writer.into_inner().unwrap().into_inner(), b"abc".to_vec());
    }

    #[test]
    fn writes_after_finish_fail() {
        let mut writer = FileStreamWriter::create(Cursor::new(Vec::new()), None).unwrap();
        writer.finish().unwrap();
        assert!(writer.is_finished());
        assert!(matches!(
            writer.write_bytes(&[0]),
            Err(StreamError::Invalidated)
        ));
        assert_eq!(writer.finish().unwrap(), None);
    }

    /// Sink whose first absolute seek fails.
    struct FlakySeek {
        inner: Cursor<Vec<u8>>,
        fail_next: bool,
    }

    impl Write for FlakySeek {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FlakySeek {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            if let SeekFrom::Start(_) = pos {
                if std::mem::take(&mut self.fail_next) {
                    return Err(std::io::Error::other("seek refused"));
                }
            }
            self.inner.seek(pos)
        }
    }

    #[test]
    fn failed_checksum_patch_is_not_reported_as_finished() {
        let sink = FlakySeek {
            inner: Cursor::new(Vec::new()),
            fail_next: true,
        };
        let mut writer = FileStreamWriter::create(sink, Some(&HeaderSpec::default())).unwrap();
        writer.write_bytes(&[1, 2, 3]).unwrap();

        assert!(writer.finish().is_err());
        assert!(!writer.is_valid());
        assert!(!writer.is_finished());
        assert!(matches!(
            writer.finish(),
            Err(FormatError::Stream(StreamError::Invalidated))
        ));
        assert!(writer.into_inner().is_err());
    }

    #[test]
    fn invalid_spec_rejected() {
        let spec = HeaderSpec {
            version: 0,
            ..HeaderSpec::default()
        };
        let result = FileStreamWriter::create(Cursor::new(Vec::new()), Some(&spec));
        assert!(matches!(result, Err(FormatError::InvalidHeader { .. })));
    }
}
