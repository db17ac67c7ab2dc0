//! Strongly-typed identifiers used across the replay pipeline.

use std::fmt;

/// Index of a simulation frame.
///
/// Frames are numbered by the owning simulation's frame clock. Recorded
/// frame numbers are stored as `u32` and must be strictly increasing
/// within a recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    /// The frame after this one, saturating at `u32::MAX`.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FrameId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Position of a command in a session's command list.
///
/// `CommandIndex(n)` addresses the n-th entry of the recording's key
/// table, which is also the n-th command registered with the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandIndex(pub u32);

impl CommandIndex {
    /// The index as a `usize`, for slice addressing.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CommandIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CommandIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Caller-chosen tag passed back to a listener with every change
/// notification, so one listener can tell its subscriptions apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u32);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SubscriptionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<CommandIndex> for SubscriptionId {
    fn from(v: CommandIndex) -> Self {
        Self(v.0)
    }
}
