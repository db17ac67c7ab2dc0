//! Test utilities and doubles for Reel development.
//!
//! Provides a scripted [`ActionSource`], an in-memory file handle that
//! outlives the session writing to it ([`SharedBuffer`]), a small
//! deterministic simulation to drive with commands ([`DropSim`]) and a
//! byte-level recording builder for crafting corrupt files
//! ([`RecordingBuilder`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod crafted;
pub mod sim;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use reel_core::{ActionSource, FrameId};

pub use crafted::RecordingBuilder;
pub use sim::{DropInput, DropSim, DropState};

/// Action source that replays a fixed script.
///
/// Each action is held on exactly the frames it was scripted for.
#[derive(Clone, Debug, Default)]
pub struct ScriptedActions {
    held: HashMap<String, HashSet<u32>>,
}

impl ScriptedActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `action` on each of `frames`.
    pub fn hold(mut self, action: &str, frames: impl IntoIterator<Item = u32>) -> Self {
        self.held
            .entry(action.to_string())
            .or_default()
            .extend(frames);
        self
    }
}

impl ActionSource for ScriptedActions {
    fn is_held(&self, action: &str, frame: FrameId) -> bool {
        self.held
            .get(action)
            .is_some_and(|frames| frames.contains(&frame.0))
    }
}

/// Clonable in-memory file.
///
/// Every clone shares one cursor, so a test can hand a clone to a session
/// as its file and read the bytes back after the session is closed.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Rc<RefCell<Cursor<Vec<u8>>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer holding `bytes`, positioned at the start.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Rc::new(RefCell::new(Cursor::new(bytes))))
    }

    /// Copy of the full contents.
    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().get_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Read for SharedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.borrow_mut().read(buf)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SharedBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.borrow_mut().seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_holds_only_listed_frames() {
        let script = ScriptedActions::new().hold("drop", [2]).hold("left", 1..3);
        assert!(script.is_held("drop", FrameId(2)));
        assert!(!script.is_held("drop", FrameId(1)));
        assert!(script.is_held("left", FrameId(1)));
        assert!(!script.is_held("left", FrameId(3)));
        assert!(!script.is_held("right", FrameId(1)));
    }

    #[test]
    fn clones_share_contents() {
        let buffer = SharedBuffer::new();
        let mut writer = buffer.clone();
        writer.write_all(b"reel").unwrap();
        assert_eq!(SharedBuffer::bytes(&buffer), b"reel");

        let mut reader = SharedBuffer::from_bytes(SharedBuffer::bytes(&buffer));
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "reel");
    }
}
