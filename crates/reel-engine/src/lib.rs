//! Session orchestration for Reel command recording and playback.
//!
//! A [`CommandManager`] takes a [`SessionConfig`] and the session's
//! [`CommandBinding`]s, opens the recording the mode calls for, and
//! drives every command once per frame through
//! [`on_frame`](CommandManager::on_frame) /
//! [`end_frame`](CommandManager::end_frame).
//!
//! ```
//! use std::rc::Rc;
//! use reel_core::{Command, FrameId};
//! use reel_engine::{CommandBinding, CommandManager, SessionConfig};
//! use reel_replay::ActionMode;
//!
//! let jump = Command::<bool>::shared("jump");
//! let input = Rc::new(|action: &str, frame: FrameId| action == "jump" && frame.0 == 1);
//! let mut session = CommandManager::new(
//!     SessionConfig::default(),
//!     vec![CommandBinding::action(jump.clone(), input, "jump", ActionMode::Pressed)],
//! )
//! .unwrap();
//!
//! session.on_frame(FrameId(0)).unwrap();
//! assert!(!*jump.borrow().state());
//! session.end_frame().unwrap();
//! session.on_frame(FrameId(1)).unwrap();
//! assert!(*jump.borrow().state());
//! session.end_frame().unwrap();
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod manager;

pub use config::{ChecksumPolicy, ConfigError, PlaybackMode, SessionConfig};
pub use error::SessionError;
pub use manager::{CommandBinding, CommandManager, ReadSeek, SessionIo, SessionSummary, WriteSeek};
