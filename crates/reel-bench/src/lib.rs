//! Benchmark profiles for Reel.
//!
//! - [`axis_commands`]: a set of `u32` commands keyed `axis_0`, `axis_1`, ...
//! - [`record_profile`]: records a session where every command changes on
//!   a fixed stride, returning the file bytes

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use reel_core::{Command, CommandHandle, FrameId, SharedCommand};
use reel_format::HeaderSpec;
use reel_replay::FileCommandWriter;

/// `count` fresh `u32` commands.
pub fn axis_commands(count: usize) -> Vec<CommandHandle<u32>> {
    (0..count)
        .map(|i| Command::shared(format!("axis_{i}")))
        .collect()
}

/// Type-erase a command set for the reader and writer.
pub fn erased(commands: &[CommandHandle<u32>]) -> Vec<SharedCommand> {
    commands
        .iter()
        .map(|c| c.clone() as SharedCommand)
        .collect()
}

/// Record `frames` frames of `commands`, command `i` changing every
/// `i + 1` frames. Ends with a terminator record.
pub fn record_profile(commands: &[CommandHandle<u32>], frames: u32) -> Vec<u8> {
    let writer = FileCommandWriter::create(
        Cursor::new(Vec::new()),
        Some(&HeaderSpec::default()),
        erased(commands),
    )
    .unwrap();
    let writer = Rc::new(RefCell::new(writer));
    FileCommandWriter::attach(&writer);
    for frame in 0..frames {
        writer.borrow_mut().begin_frame(FrameId(frame)).unwrap();
        for (i, command) in commands.iter().enumerate() {
            let stride = i as u32 + 1;
            command.borrow_mut().set_state(frame / stride);
        }
        writer.borrow_mut().end_frame().unwrap();
    }
    FileCommandWriter::detach(&writer);
    writer.borrow_mut().finish(true).unwrap();
    let writer = Rc::try_unwrap(writer)
        .ok()
        .expect("writer is detached")
        .into_inner();
    writer.into_inner().unwrap().into_inner()
}
