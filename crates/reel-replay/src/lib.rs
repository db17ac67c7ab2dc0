//! Frame-synchronized command recording and playback for Reel.
//!
//! # Architecture
//!
//! - [`FileCommandWriter`] listens to live commands and appends one delta
//!   record per frame in which any of them changed
//! - [`FileCommandReader`] keeps one record decoded ahead of the frame
//!   clock and applies it when the simulation reaches that frame
//! - [`CommandStream`]s produce each command's per-frame value: live
//!   [`ActionStream`]/[`SharedValueStream`], or [`PlaybackStream`]
//! - [`inspect_recording`] walks a file without applying it
//!
//! # Format
//!
//! ```text
//! [file stream header]
//! [key table: ([len u16] [key])* [0u16]]
//! [frame record]*: [frame u32] [count u32] ([index u32] [delta])*
//! ```
//!
//! Frame numbers strictly increase. Frames without changes are absent,
//! and a record with a zero count marks the end of playback.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod inspect;
pub mod reader;
pub mod stream;
pub mod writer;

pub use codec::MAX_KEY_LEN;
pub use error::ReplayError;
pub use inspect::{inspect_recording, FrameSummary, RecordingInfo};
pub use reader::FileCommandReader;
pub use stream::{ActionMode, ActionStream, CommandStream, PlaybackStream, SharedValueStream};
pub use writer::FileCommandWriter;
