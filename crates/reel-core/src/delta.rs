//! Diffing, encoding and re-applying command state.
//!
//! Each state type implements [`CommandState`], which fixes its diff
//! representation and wire encoding. [`StateDelta`] wraps one state type
//! behind the object-safe [`CommandDelta`] trait so the writer and reader
//! can treat a heterogeneous command list uniformly.

use std::fmt;

use crate::command::{AnyCommand, Command};
use crate::error::StreamError;
use crate::stream::{ByteReader, ByteWriter};

/// A value that can live in a [`Command`] and be recorded.
///
/// The diff encoding must be self-delimiting: the reader knows a delta's
/// length only from the command's type.
pub trait CommandState: Clone + PartialEq + Default + fmt::Debug + 'static {
    /// Encoded difference between two states.
    type Diff: Clone + fmt::Debug + 'static;

    /// Compute the diff taking `previous` to `next`, or `None` if they are equal.
    fn compute_diff(previous: &Self, next: &Self) -> Option<Self::Diff>;

    /// Apply a diff produced by [`compute_diff`](Self::compute_diff).
    fn apply_diff(&mut self, diff: &Self::Diff);

    /// Encode a diff.
    fn encode_diff(diff: &Self::Diff, w: &mut dyn ByteWriter) -> Result<(), StreamError>;

    /// Decode a diff written by [`encode_diff`](Self::encode_diff).
    fn decode_diff(r: &mut dyn ByteReader) -> Result<Self::Diff, StreamError>;

    /// Value equality used for change detection.
    fn same_state(&self, other: &Self) -> bool {
        self == other
    }
}

/// Type-erased delta paired one-to-one with a command.
///
/// `has_delta()` is true iff the last [`on_command`](Self::on_command)
/// observed a change, or a delta was just [`read`](Self::read).
pub trait CommandDelta {
    /// Diff the command's current state against the last observed one.
    ///
    /// Returns the new `has_delta()` value.
    fn on_command(&mut self, command: &dyn AnyCommand) -> Result<bool, StreamError>;

    /// Whether a delta is pending.
    fn has_delta(&self) -> bool;

    /// Encode the pending delta. Fails with [`StreamError::NoDelta`] if none.
    fn write(&self, w: &mut dyn ByteWriter) -> Result<(), StreamError>;

    /// Decode a delta from `r`, making it pending.
    fn read(&mut self, r: &mut dyn ByteReader) -> Result<(), StreamError>;

    /// Apply the pending delta to `command`, notifying its subscribers.
    ///
    /// The delta is consumed. Fails with [`StreamError::NoDelta`] if none.
    fn apply(&mut self, command: &mut dyn AnyCommand) -> Result<(), StreamError>;

    /// Forget the observed state and any pending delta.
    fn reset(&mut self);
}

/// The [`CommandDelta`] for any [`CommandState`].
#[derive(Debug)]
pub struct StateDelta<S: CommandState> {
    previous: S,
    diff: Option<S::Diff>,
}

impl<S: CommandState> StateDelta<S> {
    /// A delta whose previous state is `S::default()`.
    pub fn new() -> Self {
        Self {
            previous: S::default(),
            diff: None,
        }
    }

    /// The last state this delta observed or applied.
    pub fn previous(&self) -> &S {
        &self.previous
    }

    /// The pending diff, if any.
    pub fn diff(&self) -> Option<&S::Diff> {
        self.diff.as_ref()
    }
}

impl<S: CommandState> Default for StateDelta<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<'a, S: CommandState>(
    command: &'a dyn AnyCommand,
) -> Result<&'a Command<S>, StreamError> {
    command
        .as_any()
        .downcast_ref::<Command<S>>()
        .ok_or_else(|| StreamError::TypeMismatch {
            key: command.key().to_string(),
        })
}

impl<S: CommandState> CommandDelta for StateDelta<S> {
    fn on_command(&mut self, command: &dyn AnyCommand) -> Result<bool, StreamError> {
        let state = downcast::<S>(command)?.state();
        self.diff = S::compute_diff(&self.previous, state);
        if self.diff.is_some() {
            self.previous = state.clone();
        }
        Ok(self.diff.is_some())
    }

    fn has_delta(&self) -> bool {
        self.diff.is_some()
    }

    fn write(&self, w: &mut dyn ByteWriter) -> Result<(), StreamError> {
        let diff = self.diff.as_ref().ok_or(StreamError::NoDelta)?;
        S::encode_diff(diff, w)
    }

    fn read(&mut self, r: &mut dyn ByteReader) -> Result<(), StreamError> {
        self.diff = Some(S::decode_diff(r)?);
        Ok(())
    }

    fn apply(&mut self, command: &mut dyn AnyCommand) -> Result<(), StreamError> {
        let key = command.key().to_string();
        let command = command
            .as_any_mut()
            .downcast_mut::<Command<S>>()
            .ok_or(StreamError::TypeMismatch { key })?;
        let diff = self.diff.take().ok_or(StreamError::NoDelta)?;
        let mut next = command.state().clone();
        next.apply_diff(&diff);
        self.previous = next.clone();
        command.set_state(next);
        Ok(())
    }

    fn reset(&mut self) {
        self.previous = S::default();
        self.diff = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActionMask;

    #[test]
    fn no_change_means_no_delta() {
        let cmd = Command::<bool>::new("drop");
        let mut delta = StateDelta::<bool>::new();
        assert!(!delta.on_command(&cmd).unwrap());
        assert!(!delta.has_delta());
    }

    #[test]
    fn write_without_delta_fails() {
        let delta = StateDelta::<u64>::new();
        let mut buf = Vec::new();
        assert!(matches!(delta.write(&mut buf), Err(StreamError::NoDelta)));
        assert!(buf.is_empty());
    }

    #[test]
    fn delta_tracks_last_observed_state() {
        let mut cmd = Command::<u64>::new("seed");
        let mut delta = StateDelta::<u64>::new();

        cmd.set_state(9);
        assert!(delta.on_command(&cmd).unwrap());
        assert_eq!(*delta.previous(), 9);

        // Same value observed again: no delta.
        assert!(!delta.on_command(&cmd).unwrap());
    }

    #[test]
    fn encoded_delta_applies_to_fresh_command() {
        let mut source = Command::<u64>::new("seed");
        source.set_state(0xDEAD_BEEF);
        let mut out = StateDelta::<u64>::new();
        out.on_command(&source).unwrap();
        let mut buf = Vec::new();
        out.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 8);

        let mut target = Command::<u64>::new("seed");
        let mut incoming = StateDelta::<u64>::new();
        incoming.read(&mut buf.as_slice()).unwrap();
        assert!(incoming.has_delta());
        incoming.apply(&mut target).unwrap();
        assert_eq!(*target.state(), 0xDEAD_BEEF);
        assert!(!incoming.has_delta());
    }

    #[test]
    fn xor_delta_reconstructs_mask() {
        let mut source = Command::<ActionMask>::new("buttons");
        let mut target = Command::<ActionMask>::new("buttons");
        let mut out = StateDelta::<ActionMask>::new();
        let mut incoming = StateDelta::<ActionMask>::new();

        for mask in [0b0001u32, 0b0101, 0b0100, 0] {
            source.set_state(ActionMask(mask));
            if out.on_command(&source).unwrap() {
                let mut buf = Vec::new();
                out.write(&mut buf).unwrap();
                incoming.read(&mut buf.as_slice()).unwrap();
                incoming.apply(&mut target).unwrap();
            }
            assert_eq!(*target.state(), ActionMask(mask));
        }
    }

    #[test]
    fn mismatched_command_type_rejected() {
        let cmd = Command::<bool>::new("drop");
        let mut delta = StateDelta::<u64>::new();
        match delta.on_command(&cmd) {
            Err(StreamError::TypeMismatch { key }) => assert_eq!(key, "drop"),
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn apply_without_delta_fails() {
        let mut cmd = Command::<bool>::new("drop");
        let mut delta = StateDelta::<bool>::new();
        assert!(matches!(delta.apply(&mut cmd), Err(StreamError::NoDelta)));
    }

    #[test]
    fn reset_forgets_previous_state() {
        let mut cmd = Command::<u32>::new("n");
        let mut delta = StateDelta::<u32>::new();
        cmd.set_state(4);
        delta.on_command(&cmd).unwrap();
        delta.reset();
        assert!(!delta.has_delta());
        assert_eq!(*delta.previous(), 0);
        // After reset the same value is a change again.
        assert!(delta.on_command(&cmd).unwrap());
    }
}
