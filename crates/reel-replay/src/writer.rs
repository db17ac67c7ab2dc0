//! Command recording writer.
//!
//! [`FileCommandWriter`] subscribes to every live command, collects the
//! commands that changed during a frame, and on
//! [`end_frame`](FileCommandWriter::end_frame) appends one frame record
//! holding a delta for each command whose value actually differs from
//! what was last recorded. Frames without changes are never written.

use std::cell::RefCell;
use std::io::{Seek, Write};
use std::rc::Rc;

use reel_core::stream::write_u32_le;
use reel_core::{
    AnyCommand, CommandDelta, CommandIndex, CommandListener, FrameId, ListenerHandle,
    SharedCommand, SubscriptionId,
};
use reel_format::{FileStreamWriter, HeaderSpec};
use smallvec::SmallVec;

use crate::codec::{validate_keys, write_frame_header, write_key_table};
use crate::error::ReplayError;

/// Records command changes as per-frame delta records.
///
/// Generic over `W: Write + Seek` so tests can use `Cursor<Vec<u8>>` and
/// production code can use `BufWriter<File>`.
///
/// The writer is a [`CommandListener`]: share it with
/// [`attach`](Self::attach) before the first frame and break the
/// subscription cycle with [`detach`](Self::detach) when done.
pub struct FileCommandWriter<W: Write + Seek> {
    stream: FileStreamWriter<W>,
    commands: Vec<SharedCommand>,
    deltas: Vec<Box<dyn CommandDelta>>,
    dirty: Vec<bool>,
    changed: SmallVec<[CommandIndex; 8]>,
    frame: Option<FrameId>,
    last_begun: Option<FrameId>,
    last_written: Option<FrameId>,
    frames_written: u64,
}

impl<W: Write + Seek> FileCommandWriter<W> {
    /// Create a writer over `inner`, writing the header and key table.
    ///
    /// Command `i` of `commands` is recorded under index `i`. Every
    /// command starts dirty, so state that differs from the default at
    /// recording start lands in the first frame record.
    pub fn create(
        inner: W,
        header: Option<&HeaderSpec>,
        commands: Vec<SharedCommand>,
    ) -> Result<Self, ReplayError> {
        let keys: Vec<String> = commands
            .iter()
            .map(|c| c.borrow().key().to_string())
            .collect();
        validate_keys(keys.iter().map(String::as_str))?;

        let mut stream = FileStreamWriter::create(inner, header)?;
        write_key_table(&mut stream, keys.iter().map(String::as_str))?;

        let deltas = commands
            .iter()
            .map(|c| c.borrow().allocate_delta())
            .collect();
        let count = commands.len();
        tracing::debug!(commands = count, "command recording started");

        Ok(Self {
            stream,
            commands,
            deltas,
            dirty: vec![true; count],
            changed: (0..count as u32).map(CommandIndex).collect(),
            frame: None,
            last_begun: None,
            last_written: None,
            frames_written: 0,
        })
    }

    /// Start collecting changes for `frame`.
    ///
    /// Frames must be strictly increasing. Changes observed between
    /// frames are attributed to the next frame.
    pub fn begin_frame(&mut self, frame: FrameId) -> Result<(), ReplayError> {
        if let Some(previous) = self.last_begun {
            if frame <= previous {
                return Err(ReplayError::NonIncreasingFrame {
                    previous,
                    found: frame,
                });
            }
        }
        self.frame = Some(frame);
        self.last_begun = Some(frame);
        Ok(())
    }

    /// Close the current frame, writing a record if any command changed.
    ///
    /// Returns whether a record was written.
    pub fn end_frame(&mut self) -> Result<bool, ReplayError> {
        let frame = self.frame.take().ok_or(ReplayError::FrameNotStarted)?;

        let mut changed = std::mem::take(&mut self.changed);
        changed.sort_unstable();
        let mut recorded: SmallVec<[CommandIndex; 8]> = SmallVec::new();
        for index in changed {
            let i = index.as_usize();
            self.dirty[i] = false;
            let command = self.commands[i].borrow();
            if self.deltas[i].on_command(&*command)? {
                recorded.push(index);
            }
        }
        if recorded.is_empty() {
            return Ok(false);
        }

        write_frame_header(&mut self.stream, frame, recorded.len() as u32)?;
        for index in &recorded {
            write_u32_le(&mut self.stream, index.0)?;
            self.deltas[index.as_usize()].write(&mut self.stream)?;
        }
        self.last_written = Some(frame);
        self.frames_written += 1;
        tracing::trace!(frame = frame.0, deltas = recorded.len(), "frame recorded");
        Ok(true)
    }

    /// Flush any open frame, optionally append a terminator record, and
    /// finalize the checksum.
    ///
    /// The terminator is a zero-delta record for the frame after the last
    /// one begun, so playback reports its end exactly where recording
    /// stopped. Returns the checksum written, if the header has one.
    pub fn finish(&mut self, end_marker: bool) -> Result<Option<u64>, ReplayError> {
        if self.stream.is_finished() {
            return Ok(None);
        }
        if self.frame.is_some() {
            self.end_frame()?;
        }
        if end_marker {
            if let Some(last) = self.last_begun {
                let terminator = last.next();
                if terminator > last {
                    write_frame_header(&mut self.stream, terminator, 0)?;
                }
            }
        }
        let checksum = self.stream.finish()?;
        tracing::debug!(
            frames = self.frames_written,
            payload_bytes = self.stream.payload_bytes(),
            "command recording finished"
        );
        Ok(checksum)
    }

    /// Finish without a terminator and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W, ReplayError> {
        self.finish(false)?;
        Ok(self.stream.into_inner()?)
    }

    /// Forget every recorded state, as after a session reset.
    pub fn reset_deltas(&mut self) {
        for delta in &mut self.deltas {
            delta.reset();
        }
    }

    /// Number of frame records written, terminator excluded.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Frame of the last record written.
    pub fn last_written_frame(&self) -> Option<FrameId> {
        self.last_written
    }

    /// Number of recorded commands.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

impl<W: Write + Seek + 'static> FileCommandWriter<W> {
    /// Subscribe the shared writer to every recorded command.
    pub fn attach(this: &Rc<RefCell<Self>>) {
        let listener: ListenerHandle = this.clone();
        let commands = this.borrow().commands.clone();
        for (i, command) in commands.iter().enumerate() {
            command
                .borrow_mut()
                .subscribe(listener.clone(), SubscriptionId(i as u32));
        }
    }

    /// Unsubscribe the shared writer from every recorded command.
    ///
    /// Returns how many subscriptions were removed.
    pub fn detach(this: &Rc<RefCell<Self>>) -> usize {
        let listener: ListenerHandle = this.clone();
        let commands = this.borrow().commands.clone();
        commands
            .iter()
            .filter(|command| command.borrow_mut().unsubscribe(&listener))
            .count()
    }
}

impl<W: Write + Seek> CommandListener for FileCommandWriter<W> {
    fn on_command_changed(&mut self, _command: &dyn AnyCommand, subscription: SubscriptionId) {
        let i = subscription.0 as usize;
        // Only the first change per frame is tracked; the delta is taken
        // against the final state at end_frame.
        if let Some(dirty) = self.dirty.get_mut(i) {
            if !*dirty {
                *dirty = true;
                self.changed.push(CommandIndex(subscription.0));
            }
        }
    }
}
