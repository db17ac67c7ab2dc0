//! Boundary with the action-mapping layer.

use crate::id::FrameId;

/// Answers whether a named action is held on a given frame.
///
/// Implemented by the application's input translation layer, which turns
/// raw device state into boolean action signals. The replay engine only
/// ever polls it.
pub trait ActionSource {
    /// Whether `action` is held during `frame`.
    fn is_held(&self, action: &str, frame: FrameId) -> bool;
}

impl<F> ActionSource for F
where
    F: Fn(&str, FrameId) -> bool,
{
    fn is_held(&self, action: &str, frame: FrameId) -> bool {
        self(action, frame)
    }
}
