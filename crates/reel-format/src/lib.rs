//! Checksummed binary file streams for Reel command recordings.
//!
//! - [`ChecksumCalculator`] accumulates a keyed, chunking-independent
//!   checksum over a byte sequence
//! - [`FileStreamWriter`] reserves an optional header, streams payload
//!   bytes, and patches the checksum record in on [`finish`](FileStreamWriter::finish)
//! - [`FileStreamReader`] validates the header, verifies the checksum by
//!   re-scanning the payload, and serves payload bytes
//!
//! # Format
//!
//! ```text
//! [signature bytes]? [VERSION u32] [present u8, CHECKSUM u64]?
//! [payload ...]
//! ```
//!
//! The checksum covers every payload byte after the header.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checksum;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use checksum::{checksum, ChecksumCalculator, WORD_SIZE};
pub use error::FormatError;
pub use header::{
    ChecksumStatus, HeaderSpec, CHECKSUM_RECORD_LEN, DEFAULT_CHECKSUM_SEED, DEFAULT_SIGNATURE,
    MAX_SIGNATURE_LEN,
};
pub use reader::FileStreamReader;
pub use writer::FileStreamWriter;
