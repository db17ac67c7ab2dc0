//! Frame-synchronized command playback reader.
//!
//! [`FileCommandReader`] matches the recording's key table against the
//! live commands, then keeps exactly one frame record decoded ahead of the
//! simulation clock. When the clock reaches that frame the buffered deltas
//! are applied (notifying each command's subscribers) and the following
//! record is loaded.
//!
//! Frame advancement is explicit: the session calls
//! [`advance_to`](FileCommandReader::advance_to) once per frame, and the
//! per-command [`PlaybackStream`]s only re-request the same frame, which
//! is a no-op.

use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use reel_core::stream::read_u32_le;
use reel_core::{CommandDelta, CommandIndex, FrameId, SharedCommand};
use reel_format::{ChecksumStatus, FileStreamReader, HeaderSpec};
use smallvec::SmallVec;

use crate::codec::{read_key_table, validate_keys};
use crate::error::ReplayError;
use crate::stream::PlaybackStream;

/// The next frame record, decoded but not yet applied.
struct Lookahead {
    frame: FrameId,
    indices: SmallVec<[CommandIndex; 8]>,
}

/// Plays a recording back onto live commands.
///
/// Generic over `R: Read + Seek` so tests can use `Cursor<Vec<u8>>` and
/// production code can use `BufReader<File>`.
pub struct FileCommandReader<R: Read + Seek> {
    stream: FileStreamReader<R>,
    keys: IndexSet<String>,
    commands: Vec<SharedCommand>,
    deltas: Vec<Box<dyn CommandDelta>>,
    next: Option<Lookahead>,
    last_loaded: Option<FrameId>,
    current: Option<FrameId>,
    complete: bool,
    load_error: Option<ReplayError>,
    frames_applied: u64,
}

impl<R: Read + Seek> FileCommandReader<R> {
    /// Open a recording and bind it to `commands`.
    ///
    /// The key table must name exactly the live command set: a key with
    /// no live command fails with [`ReplayError::MissingCommandType`], a
    /// live command absent from the table with
    /// [`ReplayError::UnrecognizedCommand`]. Live order does not matter;
    /// commands are addressed by their position in the table.
    ///
    /// Every bound command is reset to its default state, the baseline
    /// the recording's deltas were taken against. The first frame record
    /// is loaded immediately and any failure to parse it is returned.
    pub fn open(
        inner: R,
        header: Option<&HeaderSpec>,
        verify_checksum: bool,
        commands: &[SharedCommand],
    ) -> Result<Self, ReplayError> {
        let mut stream = FileStreamReader::open(inner, header, verify_checksum)?;

        let mut live: IndexMap<String, SharedCommand> = IndexMap::with_capacity(commands.len());
        for command in commands {
            live.insert(command.borrow().key().to_string(), command.clone());
        }
        if live.len() != commands.len() {
            let keys: Vec<String> = commands
                .iter()
                .map(|c| c.borrow().key().to_string())
                .collect();
            validate_keys(keys.iter().map(String::as_str))?;
        }

        let keys = read_key_table(&mut stream)?;
        let mut ordered = Vec::with_capacity(keys.len());
        for key in &keys {
            match live.shift_remove(key) {
                Some(command) => ordered.push(command),
                None => return Err(ReplayError::MissingCommandType { key: key.clone() }),
            }
        }
        if let Some((key, _)) = live.first() {
            return Err(ReplayError::UnrecognizedCommand { key: key.clone() });
        }

        // Recordings are diffs against default state.
        for command in &ordered {
            command.borrow_mut().reset();
        }
        let deltas = ordered
            .iter()
            .map(|c| c.borrow().allocate_delta())
            .collect();
        let mut reader = Self {
            stream,
            keys,
            commands: ordered,
            deltas,
            next: None,
            last_loaded: None,
            current: None,
            complete: false,
            load_error: None,
            frames_applied: 0,
        };
        reader.load_next_frame()?;
        tracing::debug!(
            commands = reader.commands.len(),
            first_frame = ?reader.next_frame(),
            "command playback opened"
        );
        Ok(reader)
    }

    /// Decode the next frame record into the lookahead buffer.
    ///
    /// Any record still buffered is discarded. Returns `Ok(false)` at a
    /// clean end of the recording. On error playback is marked complete
    /// and the error is returned to the caller.
    pub fn load_next_frame(&mut self) -> Result<bool, ReplayError> {
        if let Some(stale) = self.next.take() {
            for index in stale.indices {
                self.deltas[index.as_usize()].reset();
            }
        }
        if self.complete {
            return Ok(false);
        }
        match self.read_record() {
            Ok(Some(lookahead)) => {
                tracing::trace!(
                    frame = lookahead.frame.0,
                    deltas = lookahead.indices.len(),
                    "frame loaded"
                );
                self.last_loaded = Some(lookahead.frame);
                self.next = Some(lookahead);
                Ok(true)
            }
            Ok(None) => {
                self.complete = true;
                Ok(false)
            }
            Err(e) => {
                self.complete = true;
                Err(e)
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<Lookahead>, ReplayError> {
        let mut word = [0u8; 4];
        if !self.stream.read_bytes_or_eof(&mut word)? {
            return Ok(None);
        }
        let frame = FrameId(u32::from_le_bytes(word));
        if let Some(previous) = self.last_loaded {
            if frame <= previous {
                return Err(ReplayError::NonIncreasingFrame {
                    previous,
                    found: frame,
                });
            }
        }

        let count = read_u32_le(&mut self.stream)?;
        let mut indices = SmallVec::new();
        for _ in 0..count {
            let raw = read_u32_le(&mut self.stream)?;
            let index = CommandIndex(raw);
            let delta = self
                .deltas
                .get_mut(index.as_usize())
                .ok_or(ReplayError::UnknownCommandIndex { frame, index: raw })?;
            if indices.contains(&index) {
                return Err(ReplayError::DuplicateDelta { frame, index });
            }
            delta.read(&mut self.stream)?;
            indices.push(index);
        }
        Ok(Some(Lookahead { frame, indices }))
    }

    /// Load the next record after applying one, keeping any failure.
    fn refill(&mut self) {
        if let Err(error) = self.load_next_frame() {
            tracing::warn!(
                %error,
                after_frame = ?self.current,
                "recording is unreadable past this point, ending playback"
            );
            self.load_error = Some(error);
        }
    }

    /// Apply the buffered record if it belongs to `frame`.
    ///
    /// A record for a later frame is left buffered; frames without
    /// changes are simply absent from the file. A buffered record for an
    /// earlier frame means the caller skipped it, which fails with
    /// [`ReplayError::Desync`].
    pub fn set_frame(&mut self, frame: FrameId) -> Result<(), ReplayError> {
        let Some(next) = self.next.as_ref() else {
            self.current = Some(frame);
            return Ok(());
        };
        if next.frame > frame {
            self.current = Some(frame);
            return Ok(());
        }
        if next.frame < frame {
            return Err(ReplayError::Desync {
                expected: next.frame,
                requested: frame,
            });
        }

        let Some(lookahead) = self.next.take() else {
            return Ok(());
        };
        self.current = Some(frame);
        if lookahead.indices.is_empty() {
            tracing::debug!(frame = frame.0, "end of playback marker reached");
            self.complete = true;
            return Ok(());
        }
        for index in &lookahead.indices {
            let i = index.as_usize();
            let mut command = self.commands[i].borrow_mut();
            self.deltas[i].apply(&mut *command)?;
        }
        self.frames_applied += 1;
        self.refill();
        Ok(())
    }

    /// Advance playback to `frame`, applying its record if there is one.
    ///
    /// Repeating the current frame is a no-op; going backwards fails with
    /// [`ReplayError::Desync`].
    pub fn advance_to(&mut self, frame: FrameId) -> Result<(), ReplayError> {
        if let Some(current) = self.current {
            if frame < current {
                return Err(ReplayError::Desync {
                    expected: current,
                    requested: frame,
                });
            }
            if frame == current {
                return Ok(());
            }
        }
        self.set_frame(frame)
    }

    /// Advance only if the reader is behind `frame`.
    pub fn update_on_frame(&mut self, frame: FrameId) -> Result<(), ReplayError> {
        match self.current {
            Some(current) if current >= frame => Ok(()),
            _ => self.set_frame(frame),
        }
    }

    /// Whether every record has been applied, a terminator was reached,
    /// or the rest of the file is unreadable.
    pub fn is_end_of_playback(&self) -> bool {
        self.complete && self.next.is_none()
    }

    /// Why playback ended early, if it did.
    pub fn load_error(&self) -> Option<&ReplayError> {
        self.load_error.as_ref()
    }

    /// Take the early-end error, leaving `None`.
    pub fn take_load_error(&mut self) -> Option<ReplayError> {
        self.load_error.take()
    }

    /// Frame of the buffered record, if one is loaded.
    pub fn next_frame(&self) -> Option<FrameId> {
        self.next.as_ref().map(|n| n.frame)
    }

    /// The buffered record's frame and command indices.
    pub fn lookahead(&self) -> Option<(FrameId, &[CommandIndex])> {
        self.next.as_ref().map(|n| (n.frame, n.indices.as_slice()))
    }

    /// Last frame playback was advanced to.
    pub fn current_frame(&self) -> Option<FrameId> {
        self.current
    }

    /// Number of frame records applied.
    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    /// Keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Table position of `key`.
    pub fn index_of(&self, key: &str) -> Option<CommandIndex> {
        self.keys.get_index_of(key).map(|i| CommandIndex(i as u32))
    }

    /// Checksum verification result from open time.
    pub fn checksum_status(&self) -> ChecksumStatus {
        self.stream.checksum_status()
    }

    /// Format version stored in the file header.
    pub fn format_version(&self) -> u32 {
        reel_core::ByteReader::format_version(&self.stream)
    }
}

impl<R: Read + Seek + 'static> FileCommandReader<R> {
    /// The playback stream for the command registered under `key`.
    pub fn stream_for(this: &Rc<RefCell<Self>>, key: &str) -> Option<PlaybackStream<R>> {
        let index = this.borrow().index_of(key)?;
        Some(PlaybackStream::new(this.clone(), index))
    }
}
