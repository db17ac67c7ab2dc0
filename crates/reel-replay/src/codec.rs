//! Key table and frame record codec.
//!
//! ```text
//! key table:    ([len u16] [key bytes])* [0u16]
//! frame record: [frame u32] [count u32] ([index u32] [delta bytes])*
//! ```
//!
//! Delta bytes are self-delimiting; only the command's state type knows
//! their length.

use indexmap::IndexSet;
use reel_core::stream::{read_u16_le, write_u16_le, write_u32_le};
use reel_core::{ByteReader, ByteWriter, FrameId};

use crate::error::ReplayError;

/// Longest key the table can store.
pub const MAX_KEY_LEN: usize = u16::MAX as usize;

/// Check that `key` can be stored in a key table.
pub fn validate_key(key: &str) -> Result<(), ReplayError> {
    if key.is_empty() {
        return Err(ReplayError::InvalidKey {
            key: key.to_string(),
            reason: "keys must not be empty".into(),
        });
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ReplayError::InvalidKey {
            key: key.chars().take(32).collect(),
            reason: format!("key is {} bytes, maximum is {MAX_KEY_LEN}", key.len()),
        });
    }
    Ok(())
}

/// Check every key and reject repeats.
pub fn validate_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<(), ReplayError> {
    let mut seen = IndexSet::new();
    for key in keys {
        validate_key(key)?;
        if !seen.insert(key) {
            return Err(ReplayError::DuplicateKey {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

// ── Key table ───────────────────────────────────────────────────

/// Write `keys` followed by the zero-length terminator.
pub fn write_key_table<'a>(
    w: &mut dyn ByteWriter,
    keys: impl IntoIterator<Item = &'a str>,
) -> Result<(), ReplayError> {
    for key in keys {
        validate_key(key)?;
        write_u16_le(w, key.len() as u16)?;
        w.write_bytes(key.as_bytes())?;
    }
    write_u16_le(w, 0)?;
    Ok(())
}

/// Read a key table up to and including its terminator.
///
/// Keys come back in table order, which is also command index order.
pub fn read_key_table(r: &mut dyn ByteReader) -> Result<IndexSet<String>, ReplayError> {
    let mut keys = IndexSet::new();
    loop {
        let len = read_u16_le(r)? as usize;
        if len == 0 {
            return Ok(keys);
        }
        let mut bytes = vec![0u8; len];
        r.read_bytes(&mut bytes)?;
        let key = String::from_utf8(bytes).map_err(|e| ReplayError::MalformedKeyTable {
            detail: format!("key {} is not valid UTF-8: {e}", keys.len()),
        })?;
        if keys.contains(&key) {
            return Err(ReplayError::DuplicateKey { key });
        }
        keys.insert(key);
    }
}

// ── Frame records ───────────────────────────────────────────────

/// Write the fixed part of a frame record.
pub fn write_frame_header(
    w: &mut dyn ByteWriter,
    frame: FrameId,
    delta_count: u32,
) -> Result<(), ReplayError> {
    write_u32_le(w, frame.0)?;
    write_u32_le(w, delta_count)?;
    Ok(())
}
