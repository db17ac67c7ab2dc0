//! Core command, delta and byte stream abstractions for Reel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary every other Reel crate speaks: the sequential
//! [`ByteReader`]/[`ByteWriter`] contracts, observable [`Command`] cells,
//! and the [`CommandDelta`] objects that diff, encode and re-apply
//! command state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod delta;
pub mod error;
pub mod id;
pub mod input;
pub mod state;
pub mod stream;

pub use command::{
    AnyCommand, Command, CommandHandle, CommandListener, ListenerHandle, SharedCommand,
};
pub use delta::{CommandDelta, CommandState, StateDelta};
pub use error::StreamError;
pub use id::{CommandIndex, FrameId, SubscriptionId};
pub use input::ActionSource;
pub use state::ActionMask;
pub use stream::{ByteReader, ByteWriter, FORMAT_VERSION};
