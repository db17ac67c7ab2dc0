//! Sequential byte source/sink contracts and the primitive codec.
//!
//! [`ByteReader`] and [`ByteWriter`] are the foundation of the replay
//! format: file streams, in-memory buffers and delta encoders all speak
//! through them. Each stream also carries the format version it was
//! opened with, so state codecs can branch on it when the layout evolves.
//!
//! All integers are little-endian. The primitive helpers are free
//! functions over `&mut dyn` streams so they work for any implementor.

use crate::error::StreamError;

/// Current command file format version.
///
/// In-memory streams report this version; file streams report the
/// version stored in (or written to) their header.
pub const FORMAT_VERSION: u32 = 1;

/// A sequential source of bytes.
pub trait ByteReader {
    /// Fill `buf` completely or fail.
    ///
    /// A short read is an error; implementors that wrap files also
    /// invalidate themselves so later reads fail fast.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), StreamError>;

    /// Format version the stream's contents were written with.
    fn format_version(&self) -> u32;
}

/// A sequential sink of bytes.
pub trait ByteWriter {
    /// Write all of `bytes` or fail.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError>;

    /// Format version the stream is being written with.
    fn format_version(&self) -> u32;
}

impl ByteWriter for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn format_version(&self) -> u32 {
        FORMAT_VERSION
    }
}

impl ByteReader for &[u8] {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        if self.len() < buf.len() {
            return Err(StreamError::Truncated {
                wanted: buf.len(),
                got: self.len(),
            });
        }
        let (head, tail) = self.split_at(buf.len());
        buf.copy_from_slice(head);
        *self = tail;
        Ok(())
    }

    fn format_version(&self) -> u32 {
        FORMAT_VERSION
    }
}

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn ByteWriter, v: u8) -> Result<(), StreamError> {
    w.write_bytes(&[v])
}

/// Write a little-endian u16.
pub fn write_u16_le(w: &mut dyn ByteWriter, v: u16) -> Result<(), StreamError> {
    w.write_bytes(&v.to_le_bytes())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn ByteWriter, v: u32) -> Result<(), StreamError> {
    w.write_bytes(&v.to_le_bytes())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn ByteWriter, v: u64) -> Result<(), StreamError> {
    w.write_bytes(&v.to_le_bytes())
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn ByteWriter, v: i32) -> Result<(), StreamError> {
    w.write_bytes(&v.to_le_bytes())
}

/// Write a little-endian i64.
pub fn write_i64_le(w: &mut dyn ByteWriter, v: i64) -> Result<(), StreamError> {
    w.write_bytes(&v.to_le_bytes())
}

/// Write a little-endian f32 (bit pattern preserved, including NaN payloads).
pub fn write_f32_le(w: &mut dyn ByteWriter, v: f32) -> Result<(), StreamError> {
    w.write_bytes(&v.to_le_bytes())
}

/// Write a bool as a single `0`/`1` byte.
pub fn write_bool(w: &mut dyn ByteWriter, v: bool) -> Result<(), StreamError> {
    write_u8(w, u8::from(v))
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn ByteReader) -> Result<u8, StreamError> {
    let mut buf = [0u8; 1];
    r.read_bytes(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u16.
pub fn read_u16_le(r: &mut dyn ByteReader) -> Result<u16, StreamError> {
    let mut buf = [0u8; 2];
    r.read_bytes(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn ByteReader) -> Result<u32, StreamError> {
    let mut buf = [0u8; 4];
    r.read_bytes(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn ByteReader) -> Result<u64, StreamError> {
    let mut buf = [0u8; 8];
    r.read_bytes(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn ByteReader) -> Result<i32, StreamError> {
    let mut buf = [0u8; 4];
    r.read_bytes(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian i64.
pub fn read_i64_le(r: &mut dyn ByteReader) -> Result<i64, StreamError> {
    let mut buf = [0u8; 8];
    r.read_bytes(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

/// Read a little-endian f32.
pub fn read_f32_le(r: &mut dyn ByteReader) -> Result<f32, StreamError> {
    let mut buf = [0u8; 4];
    r.read_bytes(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

/// Read a bool encoded as a single `0`/`1` byte.
///
/// Any other byte value is rejected rather than coerced.
pub fn read_bool(r: &mut dyn ByteReader) -> Result<bool, StreamError> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StreamError::Malformed {
            detail: format!("invalid bool byte {other}"),
        }),
    }
}
