//! Per-frame producers of command state.
//!
//! A [`CommandStream`] sets one command's value for a frame. Live
//! sessions use [`ActionStream`] and [`SharedValueStream`]; playback
//! sessions replace them with [`PlaybackStream`]s vended by the reader.

use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use reel_core::{ActionSource, CommandHandle, CommandIndex, CommandState, FrameId};

use crate::error::ReplayError;
use crate::reader::FileCommandReader;

/// Sets a command's state once per frame.
pub trait CommandStream {
    /// Produce the command's value for `frame`.
    fn update_on_frame(&mut self, frame: FrameId) -> Result<(), ReplayError>;

    /// Forget per-session state, as at a session restart.
    fn reset(&mut self) {}
}

// ── Action streams ──────────────────────────────────────────────

/// How an [`ActionStream`] turns a held action into a command value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActionMode {
    /// True on every frame the action is held.
    #[default]
    Held,
    /// True only on the frame the action goes from released to held.
    Pressed,
    /// True on press, then every `interval` frames once `delay` frames
    /// have passed, for as long as the action stays held.
    Repeat {
        /// Frames between the press and the first repeat.
        delay: u32,
        /// Frames between repeats. Zero is treated as one.
        interval: u32,
    },
}

/// Drives a boolean command from a named action.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use reel_core::{Command, FrameId};
/// use reel_replay::{ActionMode, ActionStream, CommandStream};
///
/// let drop = Command::<bool>::shared("drop");
/// let held = |_: &str, frame: FrameId| frame.0 >= 1;
/// let mut stream = ActionStream::new(drop.clone(), Rc::new(held), "drop", ActionMode::Pressed);
///
/// stream.update_on_frame(FrameId(0)).unwrap();
/// assert!(!drop.borrow().state());
/// stream.update_on_frame(FrameId(1)).unwrap();
/// assert!(*drop.borrow().state());
/// stream.update_on_frame(FrameId(2)).unwrap();
/// assert!(!drop.borrow().state());
/// ```
pub struct ActionStream {
    command: CommandHandle<bool>,
    source: Rc<dyn ActionSource>,
    action: String,
    mode: ActionMode,
    was_held: bool,
    pressed_at: FrameId,
}

impl ActionStream {
    /// Bind `command` to `action` on `source`.
    pub fn new(
        command: CommandHandle<bool>,
        source: Rc<dyn ActionSource>,
        action: impl Into<String>,
        mode: ActionMode,
    ) -> Self {
        Self {
            command,
            source,
            action: action.into(),
            mode,
            was_held: false,
            pressed_at: FrameId(0),
        }
    }

    /// The action this stream polls.
    pub fn action(&self) -> &str {
        &self.action
    }

    fn value(&mut self, held: bool, frame: FrameId) -> bool {
        let pressed = held && !self.was_held;
        if pressed {
            self.pressed_at = frame;
        }
        match self.mode {
            ActionMode::Held => held,
            ActionMode::Pressed => pressed,
            ActionMode::Repeat { delay, interval } => {
                if pressed {
                    return true;
                }
                if !held {
                    return false;
                }
                let elapsed = frame.0.saturating_sub(self.pressed_at.0);
                elapsed >= delay && (elapsed - delay) % interval.max(1) == 0
            }
        }
    }
}

impl CommandStream for ActionStream {
    fn update_on_frame(&mut self, frame: FrameId) -> Result<(), ReplayError> {
        let held = self.source.is_held(&self.action, frame);
        let value = self.value(held, frame);
        self.was_held = held;
        self.command.borrow_mut().set_state(value);
        Ok(())
    }

    fn reset(&mut self) {
        self.was_held = false;
        self.pressed_at = FrameId(0);
    }
}

// ── Shared values ───────────────────────────────────────────────

/// Copies a shared variable (an RNG seed, say) into a command once per
/// session.
pub struct SharedValueStream<S: CommandState> {
    command: CommandHandle<S>,
    source: Rc<RefCell<S>>,
    copied: bool,
}

impl<S: CommandState> SharedValueStream<S> {
    /// Bind `command` to `source`.
    pub fn new(command: CommandHandle<S>, source: Rc<RefCell<S>>) -> Self {
        Self {
            command,
            source,
            copied: false,
        }
    }
}

impl<S: CommandState> CommandStream for SharedValueStream<S> {
    fn update_on_frame(&mut self, _frame: FrameId) -> Result<(), ReplayError> {
        if !self.copied {
            let value = self.source.borrow().clone();
            self.command.borrow_mut().set_state(value);
            self.copied = true;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.copied = false;
    }
}

// ── Playback ────────────────────────────────────────────────────

/// Sources one command from a recording.
///
/// All playback streams of a session share one reader. Updating a stream
/// asks the reader to reach the frame, which is a no-op once the session
/// has advanced it, so the order streams are updated in does not matter.
pub struct PlaybackStream<R: Read + Seek> {
    reader: Rc<RefCell<FileCommandReader<R>>>,
    index: CommandIndex,
}

impl<R: Read + Seek> PlaybackStream<R> {
    pub(crate) fn new(reader: Rc<RefCell<FileCommandReader<R>>>, index: CommandIndex) -> Self {
        Self { reader, index }
    }

    /// Position of the command in the recording's key table.
    pub fn index(&self) -> CommandIndex {
        self.index
    }
}

impl<R: Read + Seek> CommandStream for PlaybackStream<R> {
    fn update_on_frame(&mut self, frame: FrameId) -> Result<(), ReplayError> {
        self.reader.borrow_mut().update_on_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::Command;

    /// Held on the listed frames.
    fn held_on(frames: &'static [u32]) -> Rc<dyn ActionSource> {
        Rc::new(move |_: &str, frame: FrameId| frames.contains(&frame.0))
    }

    fn run(mode: ActionMode, held: &'static [u32], frames: u32) -> Vec<bool> {
        let command = Command::<bool>::shared("fire");
        let mut stream = ActionStream::new(command.clone(), held_on(held), "fire", mode);
        (0..frames)
            .map(|f| {
                stream.update_on_frame(FrameId(f)).unwrap();
                *command.borrow().state()
            })
            .collect()
    }

    #[test]
    fn held_mode_follows_level() {
        assert_eq!(
            run(ActionMode::Held, &[1, 2, 4], 6),
            [false, true, true, false, true, false]
        );
    }

    #[test]
    fn pressed_mode_fires_on_rising_edge() {
        assert_eq!(
            run(ActionMode::Pressed, &[1, 2, 4], 6),
            [false, true, false, false, true, false]
        );
    }

    #[test]
    fn repeat_mode_waits_then_repeats() {
        let mode = ActionMode::Repeat {
            delay: 3,
            interval: 2,
        };
        let held: &[u32] = &[0, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(
            run(mode, held, 9),
            [true, false, false, true, false, true, false, true, false]
        );
    }

    #[test]
    fn zero_interval_repeats_every_frame() {
        let mode = ActionMode::Repeat {
            delay: 1,
            interval: 0,
        };
        assert_eq!(run(mode, &[0, 1, 2], 4), [true, true, true, false]);
    }

    #[test]
    fn reset_forgets_held_action() {
        let command = Command::<bool>::shared("fire");
        let mut stream =
            ActionStream::new(command.clone(), held_on(&[0, 1]), "fire", ActionMode::Pressed);
        stream.update_on_frame(FrameId(0)).unwrap();
        stream.reset();
        stream.update_on_frame(FrameId(1)).unwrap();
        assert!(*command.borrow().state());
    }

    #[test]
    fn shared_value_copied_once_per_session() {
        let seed = Command::<u64>::shared("seed");
        let source = Rc::new(RefCell::new(7u64));
        let mut stream = SharedValueStream::new(seed.clone(), source.clone());

        stream.update_on_frame(FrameId(0)).unwrap();
        assert_eq!(*seed.borrow().state(), 7);

        *source.borrow_mut() = 8;
        stream.update_on_frame(FrameId(1)).unwrap();
        assert_eq!(*seed.borrow().state(), 7);

        stream.reset();
        stream.update_on_frame(FrameId(2)).unwrap();
        assert_eq!(*seed.borrow().state(), 8);
    }
}
