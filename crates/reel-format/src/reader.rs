//! Header-validating, checksum-verifying file stream reader.
//!
//! [`FileStreamReader`] checks the signature and version on open, then
//! (if asked) re-scans the whole payload to recompute the checksum before
//! seeking back to the first payload byte. A checksum failure is reported
//! through [`checksum_status`](FileStreamReader::checksum_status) rather
//! than failing the open, so callers can choose to accept unsafe playback.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use reel_core::{ByteReader, StreamError, FORMAT_VERSION};

use crate::checksum::ChecksumCalculator;
use crate::error::FormatError;
use crate::header::{ChecksumStatus, HeaderSpec};

const SCAN_CHUNK: usize = 4096;

/// Reads a header plus payload from any `Read + Seek` source.
pub struct FileStreamReader<R: Read + Seek> {
    inner: R,
    version: u32,
    checksum: ChecksumStatus,
    payload_read: u64,
    valid: bool,
}

impl<R: Read + Seek> FileStreamReader<R> {
    /// Open a stream, validating `header` if one is expected.
    ///
    /// With `verify_checksum` set and a checksum-bearing header, the
    /// payload is scanned once up front.
    pub fn open(
        mut inner: R,
        header: Option<&HeaderSpec>,
        verify_checksum: bool,
    ) -> Result<Self, FormatError> {
        let Some(spec) = header else {
            return Ok(Self {
                inner,
                version: FORMAT_VERSION,
                checksum: ChecksumStatus::NotChecked,
                payload_read: 0,
                valid: true,
            });
        };
        spec.validate()?;

        if let Some(expected) = &spec.signature {
            let mut found = vec![0u8; expected.len()];
            let filled = fill(&mut inner, &mut found)?;
            if filled < found.len() || &found != expected {
                found.truncate(filled);
                return Err(FormatError::SignatureMismatch {
                    expected: expected.clone(),
                    found,
                });
            }
        }

        let mut version = [0u8; 4];
        read_header_field(&mut inner, &mut version)?;
        let version = u32::from_le_bytes(version);
        if version == 0 || version > spec.version {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: spec.version,
            });
        }

        let checksum = match spec.checksum_seed {
            Some(seed) => {
                let mut record = [0u8; 9];
                read_header_field(&mut inner, &mut record)?;
                let mut stored = [0u8; 8];
                stored.copy_from_slice(&record[1..]);
                let stored = u64::from_le_bytes(stored);
                match record[0] {
                    0 => ChecksumStatus::Missing,
                    1 if verify_checksum => verify(&mut inner, seed, stored)?,
                    1 => ChecksumStatus::NotChecked,
                    flag => {
                        return Err(StreamError::Malformed {
                            detail: format!("invalid checksum presence flag {flag}"),
                        }
                        .into())
                    }
                }
            }
            None => ChecksumStatus::NotChecked,
        };

        if let ChecksumStatus::Mismatch { stored, computed } = checksum {
            tracing::warn!(
                stored = format_args!("{stored:#018x}"),
                computed = format_args!("{computed:#018x}"),
                "file stream checksum mismatch"
            );
        }

        Ok(Self {
            inner,
            version,
            checksum,
            payload_read: 0,
            valid: true,
        })
    }

    /// Result of checksum verification at open time.
    pub fn checksum_status(&self) -> ChecksumStatus {
        self.checksum
    }

    /// Whether every read so far succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Payload bytes consumed so far.
    pub fn payload_read(&self) -> u64 {
        self.payload_read
    }

    /// Read exactly `buf.len()` bytes, or report a clean end of stream.
    ///
    /// Returns `Ok(false)` if the stream was already exhausted (zero bytes
    /// available), `Ok(true)` once `buf` is filled. A partial fill is a
    /// truncation error and invalidates the stream.
    pub fn read_bytes_or_eof(&mut self, buf: &mut [u8]) -> Result<bool, StreamError> {
        if !self.valid {
            return Err(StreamError::Invalidated);
        }
        match fill(&mut self.inner, buf) {
            Ok(0) if !buf.is_empty() => Ok(false),
            Ok(n) if n == buf.len() => {
                self.payload_read += n as u64;
                Ok(true)
            }
            Ok(n) => {
                self.valid = false;
                Err(StreamError::Truncated {
                    wanted: buf.len(),
                    got: n,
                })
            }
            Err(e) => {
                self.valid = false;
                Err(e.into())
            }
        }
    }
}

impl<R: Read + Seek> ByteReader for FileStreamReader<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        match self.read_bytes_or_eof(buf)? {
            true => Ok(()),
            false => {
                self.valid = false;
                Err(StreamError::Truncated {
                    wanted: buf.len(),
                    got: 0,
                })
            }
        }
    }

    fn format_version(&self) -> u32 {
        self.version
    }
}

/// Read until `buf` is full or the source is exhausted; returns bytes read.
fn fill(r: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_header_field(r: &mut dyn Read, buf: &mut [u8]) -> Result<(), FormatError> {
    let got = fill(r, buf)?;
    if got < buf.len() {
        return Err(StreamError::Truncated {
            wanted: buf.len(),
            got,
        }
        .into());
    }
    Ok(())
}

/// Recompute the payload checksum, then seek back to the payload start.
fn verify<R: Read + Seek>(
    inner: &mut R,
    seed: u64,
    stored: u64,
) -> Result<ChecksumStatus, FormatError> {
    let payload_start = inner.stream_position()?;
    let mut calc = ChecksumCalculator::new(seed);
    let mut chunk = [0u8; SCAN_CHUNK];
    loop {
        let n = fill(inner, &mut chunk)?;
        if n == 0 {
            break;
        }
        calc.update(&chunk[..n]);
    }
    inner.seek(SeekFrom::Start(payload_start))?;
    let computed = calc.finalize();
    Ok(if computed == stored {
        ChecksumStatus::Valid(stored)
    } else {
        ChecksumStatus::Mismatch { stored, computed }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CHECKSUM_RECORD_LEN, DEFAULT_SIGNATURE};
    use crate::writer::FileStreamWriter;
    use reel_core::stream::{read_u32_le, read_u64_le, write_u32_le, write_u64_le};
    use reel_core::ByteWriter;
    use std::io::Cursor;

    fn written(spec: Option<&HeaderSpec>, payload: &[u8]) -> Vec<u8> {
        let mut writer = FileStreamWriter::create(Cursor::new(Vec::new()), spec).unwrap();
        writer.write_bytes(payload).unwrap();
        writer.into_inner().unwrap().into_inner()
    }

    #[test]
    fn roundtrip_with_valid_checksum() {
        let spec = HeaderSpec::default();
        let mut writer = FileStreamWriter::create(Cursor::new(Vec::new()), Some(&spec)).unwrap();
        write_u32_le(&mut writer, 17).unwrap();
        write_u64_le(&mut writer, u64::MAX - 3).unwrap();
        let bytes = writer.into_inner().unwrap().into_inner();

        let mut reader = FileStreamReader::open(Cursor::new(bytes), Some(&spec), true).unwrap();
        assert!(matches!(reader.checksum_status(), ChecksumStatus::Valid(_)));
        assert_eq!(read_u32_le(&mut reader).unwrap(), 17);
        assert_eq!(read_u64_le(&mut reader).unwrap(), u64::MAX - 3);
        assert_eq!(reader.payload_read(), 12);
        assert!(!reader.read_bytes_or_eof(&mut [0u8; 4]).unwrap());
    }

    #[test]
    fn corrupted_payload_reports_mismatch_but_stays_usable() {
        let spec = HeaderSpec::default();
        let mut bytes = written(Some(&spec), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let mut reader = FileStreamReader::open(Cursor::new(bytes), Some(&spec), true).unwrap();
        assert!(matches!(
            reader.checksum_status(),
            ChecksumStatus::Mismatch { .. }
        ));
        assert!(reader.is_valid());
        let mut payload = [0u8; 9];
        reader.read_bytes(&mut payload).unwrap();
        assert_eq!(payload[..8], [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn unfinalized_checksum_is_missing() {
        let spec = HeaderSpec::default();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = FileStreamWriter::create(&mut cursor, Some(&spec)).unwrap();
            writer.write_bytes(&[1, 2]).unwrap();
        }
        let reader =
            FileStreamReader::open(Cursor::new(cursor.into_inner()), Some(&spec), true).unwrap();
        assert_eq!(reader.checksum_status(), ChecksumStatus::Missing);
    }

    #[test]
    fn skipped_verification_is_not_checked() {
        let spec = HeaderSpec::default();
        let bytes = written(Some(&spec), &[9; 32]);
        let reader = FileStreamReader::open(Cursor::new(bytes), Some(&spec), false).unwrap();
        assert_eq!(reader.checksum_status(), ChecksumStatus::NotChecked);
    }

    #[test]
    fn wrong_signature_rejected() {
        let spec = HeaderSpec::default();
        let mut bytes = written(Some(&spec), &[]);
        bytes[0] = b'X';
        match FileStreamReader::open(Cursor::new(bytes), Some(&spec), true) {
            Err(FormatError::SignatureMismatch { expected, found }) => {
                assert_eq!(expected, DEFAULT_SIGNATURE);
                assert_eq!(found[0], b'X');
            }
            other => panic!("expected SignatureMismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn short_signature_rejected() {
        let spec = HeaderSpec::default();
        let result = FileStreamReader::open(Cursor::new(b"REEL".to_vec()), Some(&spec), true);
        assert!(matches!(result, Err(FormatError::SignatureMismatch { .. })));
    }

    #[test]
    fn newer_version_rejected() {
        let newer = HeaderSpec {
            version: 7,
            ..HeaderSpec::default()
        };
        let bytes = written(Some(&newer), &[]);
        let result = FileStreamReader::open(Cursor::new(bytes), Some(&HeaderSpec::default()), true);
        assert!(matches!(
            result,
            Err(FormatError::UnsupportedVersion {
                found: 7,
                supported: 1
            })
        ));
    }

    #[test]
    fn older_version_is_exposed() {
        let newer = HeaderSpec {
            version: 3,
            ..HeaderSpec::default()
        };
        let older = HeaderSpec {
            version: 2,
            ..HeaderSpec::default()
        };
        let bytes = written(Some(&older), &[]);
        let reader = FileStreamReader::open(Cursor::new(bytes), Some(&newer), true).unwrap();
        assert_eq!(ByteReader::format_version(&reader), 2);
    }

    #[test]
    fn bad_presence_flag_rejected() {
        let spec = HeaderSpec::default();
        let mut bytes = written(Some(&spec), &[]);
        bytes[DEFAULT_SIGNATURE.len() + 4] = 7;
        let result = FileStreamReader::open(Cursor::new(bytes), Some(&spec), true);
        assert!(matches!(
            result,
            Err(FormatError::Stream(StreamError::Malformed { .. }))
        ));
    }

    #[test]
    fn truncated_header_rejected() {
        let spec = HeaderSpec::default();
        let bytes = written(Some(&spec), &[]);
        let cut = bytes[..bytes.len() - CHECKSUM_RECORD_LEN / 2].to_vec();
        let result = FileStreamReader::open(Cursor::new(cut), Some(&spec), true);
        assert!(matches!(
            result,
            Err(FormatError::Stream(StreamError::Truncated { .. }))
        ));
    }

    #[test]
    fn short_read_invalidates_stream() {
        let bytes = written(None, &[1, 2, 3]);
        let mut reader = FileStreamReader::open(Cursor::new(bytes), None, true).unwrap();
        assert!(matches!(
            read_u32_le(&mut reader),
            Err(StreamError::Truncated { wanted: 4, got: 3 })
        ));
        assert!(!reader.is_valid());
        assert!(matches!(
            reader.read_bytes(&mut [0u8; 1]),
            Err(StreamError::Invalidated)
        ));
    }
}
