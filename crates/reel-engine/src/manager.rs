//! Session orchestration.
//!
//! [`CommandManager`] owns one session's command set and drives it frame
//! by frame in the configured [`PlaybackMode`]:
//!
//! - **Live**: each command's live stream sets it every frame.
//! - **Record**: as live, plus a [`FileCommandWriter`] subscribed to every
//!   command appends one delta record per changed frame.
//! - **Playback**: live streams are never built; a [`FileCommandReader`]
//!   applies the recording and each command is served by a
//!   [`PlaybackStream`](reel_replay::PlaybackStream).
//!
//! # Frame protocol
//!
//! Call [`on_frame`](CommandManager::on_frame) before the simulation reads
//! any command for that frame, then [`end_frame`](CommandManager::end_frame)
//! after it is done. In playback the manager advances the reader itself
//! before any stream is updated.
//!
//! # Teardown
//!
//! The recording writer and the commands reference each other through
//! subscriptions. [`close`](CommandManager::close) removes every
//! subscription before finalizing the file; dropping an open manager does
//! the same on a best-effort basis.

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::rc::Rc;

use reel_core::{ActionSource, CommandHandle, CommandState, FrameId, SharedCommand};
use reel_format::ChecksumStatus;
use reel_replay::codec::validate_keys;
use reel_replay::{
    ActionMode, ActionStream, CommandStream, FileCommandReader, FileCommandWriter, ReplayError,
    SharedValueStream,
};

use crate::config::{ChecksumPolicy, ConfigError, PlaybackMode, SessionConfig};
use crate::error::SessionError;

// ── File handles ────────────────────────────────────────────────

/// A readable, seekable recording source.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// A writable, seekable recording sink.
pub trait WriteSeek: Write + Seek {}

impl<T: Write + Seek> WriteSeek for T {}

/// An externally opened recording handle.
///
/// The engine never needs to know where the bytes live; callers that
/// manage their own files, or tests using in-memory buffers, pass one of
/// these to [`CommandManager::with_io`].
pub enum SessionIo {
    /// Source for a playback session.
    Reader(Box<dyn ReadSeek>),
    /// Sink for a recording session.
    Writer(Box<dyn WriteSeek>),
}

type SessionReader = FileCommandReader<Box<dyn ReadSeek>>;
type SessionWriter = FileCommandWriter<Box<dyn WriteSeek>>;

// ── CommandBinding ──────────────────────────────────────────────

type StreamFactory = Box<dyn FnOnce() -> Box<dyn CommandStream>>;

/// A command together with the recipe for its live stream.
///
/// The factory only runs in live and record sessions; playback sessions
/// serve the command from the recording instead.
pub struct CommandBinding {
    command: SharedCommand,
    factory: Option<StreamFactory>,
}

impl CommandBinding {
    /// Bind `command` to the live stream built by `factory`.
    pub fn new<S, F>(command: CommandHandle<S>, factory: F) -> Self
    where
        S: CommandState,
        F: FnOnce(CommandHandle<S>) -> Box<dyn CommandStream> + 'static,
    {
        let shared: SharedCommand = command.clone();
        Self {
            command: shared,
            factory: Some(Box::new(move || factory(command))),
        }
    }

    /// A command with no live stream; its owner sets it directly.
    pub fn passive<S: CommandState>(command: CommandHandle<S>) -> Self {
        Self {
            command,
            factory: None,
        }
    }

    /// Drive a boolean command from a named action.
    pub fn action(
        command: CommandHandle<bool>,
        source: Rc<dyn ActionSource>,
        action: impl Into<String>,
        mode: ActionMode,
    ) -> Self {
        let action = action.into();
        Self::new(command, move |command| {
            Box::new(ActionStream::new(command, source, action, mode))
        })
    }

    /// Copy a shared variable into the command once per session.
    pub fn shared_value<S: CommandState>(
        command: CommandHandle<S>,
        source: Rc<RefCell<S>>,
    ) -> Self {
        Self::new(command, move |command| {
            Box::new(SharedValueStream::new(command, source))
        })
    }

    /// The bound command's key.
    pub fn key(&self) -> String {
        self.command.borrow().key().to_string()
    }
}

// ── SessionSummary ──────────────────────────────────────────────

/// What a session did, returned by [`CommandManager::close`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// The session's mode.
    pub mode: PlaybackMode,
    /// Frame records written (record mode).
    pub frames_recorded: u64,
    /// Frame records applied (playback mode).
    pub frames_applied: u64,
    /// Last frame passed to [`CommandManager::on_frame`].
    pub last_frame: Option<FrameId>,
    /// Checksum written (record mode) or verified (playback mode).
    pub checksum: Option<u64>,
}

// ── CommandManager ──────────────────────────────────────────────

enum Session {
    Live,
    Record(Rc<RefCell<SessionWriter>>),
    Playback(Rc<RefCell<SessionReader>>),
    Closed,
}

/// Drives one session's commands in live, record or playback mode.
pub struct CommandManager {
    mode: PlaybackMode,
    end_marker: bool,
    commands: Vec<SharedCommand>,
    streams: Vec<Option<Box<dyn CommandStream>>>,
    session: Session,
    checksum: ChecksumStatus,
    playback_error: Option<ReplayError>,
    last_frame: Option<FrameId>,
}

impl CommandManager {
    /// Open a session, creating or opening `config.path` as the mode requires.
    pub fn new(config: SessionConfig, bindings: Vec<CommandBinding>) -> Result<Self, SessionError> {
        config.validate()?;
        let io = match (config.mode, config.path.as_ref()) {
            (PlaybackMode::Live, _) => None,
            (PlaybackMode::Record, Some(path)) => {
                let file = File::create(path).map_err(|source| SessionError::OpenFailed {
                    path: path.clone(),
                    source,
                })?;
                Some(SessionIo::Writer(Box::new(BufWriter::new(file))))
            }
            (PlaybackMode::Playback, Some(path)) => {
                let file = File::open(path).map_err(|source| SessionError::OpenFailed {
                    path: path.clone(),
                    source,
                })?;
                Some(SessionIo::Reader(Box::new(BufReader::new(file))))
            }
            (mode, None) => return Err(ConfigError::MissingPath { mode }.into()),
        };
        Self::build(config, io, bindings)
    }

    /// Open a session over an already opened handle.
    ///
    /// `config.path` is ignored. Record sessions need a
    /// [`SessionIo::Writer`], playback sessions a [`SessionIo::Reader`].
    pub fn with_io(
        config: SessionConfig,
        io: SessionIo,
        bindings: Vec<CommandBinding>,
    ) -> Result<Self, SessionError> {
        config.validate_header()?;
        Self::build(config, Some(io), bindings)
    }

    fn build(
        config: SessionConfig,
        io: Option<SessionIo>,
        bindings: Vec<CommandBinding>,
    ) -> Result<Self, SessionError> {
        let mut commands = Vec::with_capacity(bindings.len());
        let mut factories = Vec::with_capacity(bindings.len());
        for binding in bindings {
            commands.push(binding.command);
            factories.push(binding.factory);
        }
        {
            let keys: Vec<String> = commands
                .iter()
                .map(|c| c.borrow().key().to_string())
                .collect();
            validate_keys(keys.iter().map(String::as_str))?;
        }

        let mut checksum = ChecksumStatus::NotChecked;
        let (session, streams) = match (config.mode, io) {
            (PlaybackMode::Live, None) => (Session::Live, instantiate(factories)),
            (PlaybackMode::Record, Some(SessionIo::Writer(sink))) => {
                let streams = instantiate(factories);
                let writer =
                    FileCommandWriter::create(sink, Some(&config.header), commands.clone())?;
                let writer = Rc::new(RefCell::new(writer));
                FileCommandWriter::attach(&writer);
                (Session::Record(writer), streams)
            }
            (PlaybackMode::Playback, Some(SessionIo::Reader(source))) => {
                let verify = config.checksum_policy != ChecksumPolicy::Skip;
                let reader =
                    FileCommandReader::open(source, Some(&config.header), verify, &commands)?;
                checksum = reader.checksum_status();
                if !checksum.is_trusted() {
                    if let (ChecksumPolicy::Strict, Some(error)) =
                        (config.checksum_policy, checksum.to_error())
                    {
                        return Err(error.into());
                    }
                    tracing::warn!(?checksum, "playing back an unverified recording");
                }
                let reader = Rc::new(RefCell::new(reader));
                let streams: Vec<Option<Box<dyn CommandStream>>> = commands
                    .iter()
                    .map(|command| {
                        let key = command.borrow().key().to_string();
                        FileCommandReader::stream_for(&reader, &key)
                            .map(|stream| Box::new(stream) as Box<dyn CommandStream>)
                    })
                    .collect();
                (Session::Playback(reader), streams)
            }
            (mode, _) => return Err(ConfigError::IoModeMismatch { mode }.into()),
        };

        tracing::info!(
            mode = %config.mode,
            commands = commands.len(),
            "command session opened"
        );
        Ok(Self {
            mode: config.mode,
            end_marker: config.end_marker,
            commands,
            streams,
            session,
            checksum,
            playback_error: None,
            last_frame: None,
        })
    }

    /// Bring every command up to date for `frame`.
    ///
    /// In playback the reader is advanced first, then every stream is
    /// updated in registration order. A playback desync is returned as
    /// an error.
    pub fn on_frame(&mut self, frame: FrameId) -> Result<(), SessionError> {
        match &self.session {
            Session::Closed => return Err(SessionError::Closed),
            Session::Live => {}
            Session::Record(writer) => writer.borrow_mut().begin_frame(frame)?,
            Session::Playback(reader) => {
                let mut reader = reader.borrow_mut();
                reader.advance_to(frame)?;
                if let Some(error) = reader.take_load_error() {
                    self.playback_error = Some(error);
                }
            }
        }
        for stream in self.streams.iter_mut().flatten() {
            stream.update_on_frame(frame)?;
        }
        self.last_frame = Some(frame);
        Ok(())
    }

    /// Finish the current frame, flushing its record when recording.
    pub fn end_frame(&mut self) -> Result<(), SessionError> {
        match &self.session {
            Session::Closed => Err(SessionError::Closed),
            Session::Record(writer) => {
                writer.borrow_mut().end_frame()?;
                Ok(())
            }
            Session::Live | Session::Playback(_) => Ok(()),
        }
    }

    /// Whether a playback session has run out of records.
    pub fn is_end_of_playback(&self) -> bool {
        match &self.session {
            Session::Playback(reader) => reader.borrow().is_end_of_playback(),
            Session::Closed => self.mode == PlaybackMode::Playback,
            Session::Live | Session::Record(_) => false,
        }
    }

    /// Checksum verification result for a playback session.
    pub fn checksum_status(&self) -> ChecksumStatus {
        self.checksum
    }

    /// Why playback ended before the end of the file, if it did.
    pub fn playback_error(&self) -> Option<&ReplayError> {
        self.playback_error.as_ref()
    }

    /// Restore every command to its default state and restart live streams.
    ///
    /// Meant for the start of a session; a recording does not capture
    /// resets.
    pub fn reset_commands(&mut self) {
        for command in &self.commands {
            command.borrow_mut().reset();
        }
        for stream in self.streams.iter_mut().flatten() {
            stream.reset();
        }
        if let Session::Record(writer) = &self.session {
            writer.borrow_mut().reset_deltas();
        }
    }

    /// The session's mode.
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Commands in registration order.
    pub fn commands(&self) -> &[SharedCommand] {
        &self.commands
    }

    /// Last frame passed to [`on_frame`](Self::on_frame).
    pub fn last_frame(&self) -> Option<FrameId> {
        self.last_frame
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        matches!(self.session, Session::Closed)
    }

    /// Unsubscribe the writer, finalize any recording and release the file.
    ///
    /// Further frame calls fail with [`SessionError::Closed`].
    pub fn close(&mut self) -> Result<SessionSummary, SessionError> {
        let session = std::mem::replace(&mut self.session, Session::Closed);
        let (frames_recorded, frames_applied, checksum) = match session {
            Session::Closed => return Err(SessionError::Closed),
            Session::Live => (0, 0, None),
            Session::Record(shared) => {
                FileCommandWriter::detach(&shared);
                let mut writer = shared.borrow_mut();
                let checksum = writer.finish(self.end_marker)?;
                (writer.frames_written(), 0, checksum)
            }
            Session::Playback(shared) => {
                let applied = shared.borrow().frames_applied();
                let checksum = match self.checksum {
                    ChecksumStatus::Valid(value) => Some(value),
                    _ => None,
                };
                (0, applied, checksum)
            }
        };
        self.streams.clear();

        let summary = SessionSummary {
            mode: self.mode,
            frames_recorded,
            frames_applied,
            last_frame: self.last_frame,
            checksum,
        };
        tracing::info!(
            mode = %summary.mode,
            frames_recorded,
            frames_applied,
            "command session closed"
        );
        Ok(summary)
    }
}

impl Drop for CommandManager {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(error) = self.close() {
                tracing::error!(%error, "command session teardown failed");
            }
        }
    }
}

fn instantiate(factories: Vec<Option<StreamFactory>>) -> Vec<Option<Box<dyn CommandStream>>> {
    factories
        .into_iter()
        .map(|factory| factory.map(|build| build()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::Command;
    use std::io::Cursor;

    fn live_session(bindings: Vec<CommandBinding>) -> CommandManager {
        CommandManager::new(SessionConfig::default(), bindings).unwrap()
    }

    #[test]
    fn live_streams_drive_commands() {
        let left = Command::<bool>::shared("left");
        let source: Rc<dyn ActionSource> = Rc::new(|_: &str, frame: FrameId| frame.0 == 1);
        let mut manager = live_session(vec![CommandBinding::action(
            left.clone(),
            source,
            "left",
            ActionMode::Held,
        )]);

        manager.on_frame(FrameId(0)).unwrap();
        assert!(!*left.borrow().state());
        manager.on_frame(FrameId(1)).unwrap();
        assert!(*left.borrow().state());
        manager.end_frame().unwrap();
        assert!(!manager.is_end_of_playback());
    }

    #[test]
    fn passive_commands_have_no_stream() {
        let score = Command::<u32>::shared("score");
        let mut manager = live_session(vec![CommandBinding::passive(score.clone())]);
        score.borrow_mut().set_state(5);
        manager.on_frame(FrameId(0)).unwrap();
        assert_eq!(*score.borrow().state(), 5);
    }

    #[test]
    fn binding_reports_key() {
        let binding = CommandBinding::passive(Command::<u8>::shared("lives"));
        assert_eq!(binding.key(), "lives");
    }

    #[test]
    fn duplicate_keys_rejected() {
        let result = CommandManager::new(
            SessionConfig::default(),
            vec![
                CommandBinding::passive(Command::<bool>::shared("drop")),
                CommandBinding::passive(Command::<u64>::shared("drop")),
            ],
        );
        assert!(matches!(
            result,
            Err(SessionError::Replay(ReplayError::DuplicateKey { .. }))
        ));
    }

    #[test]
    fn handle_must_match_mode() {
        let config = SessionConfig {
            mode: PlaybackMode::Playback,
            ..SessionConfig::default()
        };
        let io = SessionIo::Writer(Box::new(Cursor::new(Vec::new())));
        let result = CommandManager::with_io(config, io, Vec::new());
        assert!(matches!(
            result,
            Err(SessionError::Config(ConfigError::IoModeMismatch {
                mode: PlaybackMode::Playback
            }))
        ));
    }

    #[test]
    fn closed_session_rejects_frames() {
        let mut manager = live_session(Vec::new());
        let summary = manager.close().unwrap();
        assert_eq!(summary.mode, PlaybackMode::Live);
        assert!(matches!(
            manager.on_frame(FrameId(0)),
            Err(SessionError::Closed)
        ));
        assert!(matches!(manager.end_frame(), Err(SessionError::Closed)));
        assert!(matches!(manager.close(), Err(SessionError::Closed)));
    }

    #[test]
    fn reset_restores_defaults_and_rearms_streams() {
        let seed = Command::<u64>::shared("seed");
        let source = Rc::new(RefCell::new(77u64));
        let mut manager = live_session(vec![CommandBinding::shared_value(
            seed.clone(),
            source,
        )]);
        manager.on_frame(FrameId(0)).unwrap();
        assert_eq!(*seed.borrow().state(), 77);

        manager.reset_commands();
        assert_eq!(*seed.borrow().state(), 0);
        manager.on_frame(FrameId(1)).unwrap();
        assert_eq!(*seed.borrow().state(), 77);
    }
}
