//! Reel: deterministic per-frame command recording and playback.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Reel sub-crates. A simulation reads its inputs through named
//! [`Command`](prelude::Command)s; a [`CommandManager`](prelude::CommandManager)
//! drives them live, records every change to a checksummed file, or plays a
//! file back so the simulation sees exactly the same inputs on exactly the
//! same frames.
//!
//! # Quick start
//!
//! ```rust
//! use std::rc::Rc;
//! use reel::prelude::*;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("session.reel");
//!
//! // Record: "fire" is held on frames 1 and 2.
//! let fire = Command::<bool>::shared("fire");
//! let input = Rc::new(|_: &str, frame: FrameId| (1..3).contains(&frame.0));
//! let config = SessionConfig {
//!     mode: PlaybackMode::Record,
//!     path: Some(path.clone()),
//!     ..SessionConfig::default()
//! };
//! let mut session = CommandManager::new(
//!     config,
//!     vec![CommandBinding::action(fire.clone(), input, "fire", ActionMode::Held)],
//! )
//! .unwrap();
//! for frame in 0..4 {
//!     session.on_frame(FrameId(frame)).unwrap();
//!     session.end_frame().unwrap();
//! }
//! assert_eq!(session.close().unwrap().frames_recorded, 2);
//!
//! // Play back into a fresh command; no input source is consulted.
//! let fire = Command::<bool>::shared("fire");
//! let config = SessionConfig {
//!     mode: PlaybackMode::Playback,
//!     path: Some(path),
//!     ..SessionConfig::default()
//! };
//! let mut session =
//!     CommandManager::new(config, vec![CommandBinding::passive(fire.clone())]).unwrap();
//! let mut seen = Vec::new();
//! for frame in 0..4 {
//!     session.on_frame(FrameId(frame)).unwrap();
//!     seen.push(*fire.borrow().state());
//! }
//! assert_eq!(seen, [false, true, true, false]);
//! assert!(session.is_end_of_playback());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `reel-core` | Commands, deltas, ids, byte stream codec |
//! | [`format`] | `reel-format` | Checksum, file header, checksummed file streams |
//! | [`replay`] | `reel-replay` | Command file writer/reader, command streams |
//! | [`engine`] | `reel-engine` | Session config and the command manager |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Commands, deltas, ids and the byte stream codec (`reel-core`).
///
/// [`types::CommandState`] is the extension point for custom command
/// value types.
pub use reel_core as types;

/// Checksummed file streams (`reel-format`).
pub use reel_format as format;

/// Command recording and playback (`reel-replay`).
///
/// Use [`replay::FileCommandWriter`] and [`replay::FileCommandReader`]
/// directly when a session manager is more than you need.
pub use reel_replay as replay;

/// Session orchestration (`reel-engine`).
pub use reel_engine as engine;

/// Common imports for typical Reel usage.
///
/// ```rust
/// use reel::prelude::*;
/// ```
pub mod prelude {
    // Commands
    pub use reel_core::{
        ActionMask, ActionSource, Command, CommandHandle, CommandState, FrameId, SharedCommand,
    };

    // Streams
    pub use reel_replay::{ActionMode, CommandStream};

    // Errors
    pub use reel_core::StreamError;
    pub use reel_engine::SessionError;
    pub use reel_format::FormatError;
    pub use reel_replay::ReplayError;

    // Engine
    pub use reel_engine::{
        ChecksumPolicy, CommandBinding, CommandManager, PlaybackMode, SessionConfig,
        SessionSummary,
    };
    pub use reel_format::ChecksumStatus;
}
