// SPDX-License-Identifier: GPL-3.0-only

//! Recording session controller
//!
//! Two independent machines share the screen:
//!
//! ```text
//! recorder:  Idle ──toggle_record──▶ Recording ──toggle_record──▶ Idle (output_path set)
//! player:    Idle ──toggle_play──▶ Playing ◀──toggle_play──▶ Paused
//!              ▲                      │                        │
//!              └──── stop / end of stream / hide ◀────────────┘
//! ```
//!
//! Encoders and decoders are held in [`Guarded`] wrappers, so every exit path
//! releases them.

use super::notice::Notice;
use super::task::Task;
use crate::backends::permissions::{Capability, PermissionGate};
use crate::errors::{SessionError, SessionResult};
use crate::fl;
use crate::media::{AudioBackend, AudioDecoder, AudioEncoder, EncoderParams, Guarded, StreamEnd};
use crate::storage::recording_file_name;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum RecorderState {
    Idle,
    Recording {
        encoder: Guarded<dyn AudioEncoder>,
        path: PathBuf,
    },
}

pub enum PlayerState {
    Idle,
    Playing { decoder: Guarded<dyn AudioDecoder> },
    Paused { decoder: Guarded<dyn AudioDecoder> },
}

/// Plain view of both machines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStatus {
    Idle,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
pub enum RecordingMessage {
    ToggleRecord,
    TogglePlay,
    Stop,
    PermissionAnswered { generation: u64, granted: bool },
    PlaybackFinished { playback: u64, end: StreamEnd },
}

pub struct RecordingSession {
    backend: Arc<dyn AudioBackend>,
    permissions: Arc<dyn PermissionGate>,
    recordings_dir: PathBuf,
    recorder: RecorderState,
    player: PlayerState,
    output_path: Option<PathBuf>,
    awaiting_permission: bool,
    /// Bumped on teardown; guards permission answers
    generation: u64,
    /// Bumped whenever a decoder goes away; guards completions
    playback: u64,
    notices: Vec<Notice>,
}

impl RecordingSession {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        permissions: Arc<dyn PermissionGate>,
        recordings_dir: PathBuf,
    ) -> Self {
        Self {
            backend,
            permissions,
            recordings_dir,
            recorder: RecorderState::Idle,
            player: PlayerState::Idle,
            output_path: None,
            awaiting_permission: false,
            generation: 0,
            playback: 0,
            notices: Vec::new(),
        }
    }

    /// Start from an existing recording, so it can be played right away
    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    pub fn recorder_status(&self) -> RecorderStatus {
        match self.recorder {
            RecorderState::Idle => RecorderStatus::Idle,
            RecorderState::Recording { .. } => RecorderStatus::Recording,
        }
    }

    pub fn player_status(&self) -> PlayerStatus {
        match self.player {
            PlayerState::Idle => PlayerStatus::Idle,
            PlayerState::Playing { .. } => PlayerStatus::Playing,
            PlayerState::Paused { .. } => PlayerStatus::Paused,
        }
    }

    /// File of the last finished recording
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// File being written right now
    pub fn recording_path(&self) -> Option<&Path> {
        match &self.recorder {
            RecorderState::Recording { path, .. } => Some(path),
            RecorderState::Idle => None,
        }
    }

    pub fn can_play(&self) -> bool {
        self.recorder_status() == RecorderStatus::Idle
    }

    pub fn can_stop(&self) -> bool {
        self.player_status() != PlayerStatus::Idle
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn update(&mut self, message: RecordingMessage) -> Task<RecordingMessage> {
        let result = match message {
            RecordingMessage::ToggleRecord => self.toggle_record(),
            RecordingMessage::TogglePlay => self.toggle_play(),
            RecordingMessage::Stop => self.stop().map(|()| Task::none()),
            RecordingMessage::PermissionAnswered {
                generation,
                granted,
            } => self.on_permission(generation, granted).map(|()| Task::none()),
            RecordingMessage::PlaybackFinished { playback, end } => {
                self.on_playback_finished(playback, end).map(|()| Task::none())
            }
        };

        result.unwrap_or_else(|err| {
            self.notices.push(Notice::from(&err));
            Task::none()
        })
    }

    /// Start or finish a recording
    pub fn toggle_record(&mut self) -> SessionResult<Task<RecordingMessage>> {
        if let RecorderState::Recording { .. } = self.recorder {
            self.finish_recording()?;
            return Ok(Task::none());
        }

        if self.awaiting_permission {
            debug!("Microphone request already in flight");
            return Ok(Task::none());
        }
        if self.permissions.is_granted(Capability::Microphone) {
            self.start_recording()?;
            return Ok(Task::none());
        }

        info!("Requesting microphone permission");
        self.awaiting_permission = true;
        let generation = self.generation;
        Ok(Task::perform(
            self.permissions.request(Capability::Microphone),
            move |granted| RecordingMessage::PermissionAnswered {
                generation,
                granted,
            },
        ))
    }

    pub fn on_permission(&mut self, generation: u64, granted: bool) -> SessionResult<()> {
        if generation != self.generation || !self.awaiting_permission {
            debug!(generation, current = self.generation, "Discarding stale permission answer");
            return Ok(());
        }
        self.awaiting_permission = false;

        if granted {
            self.start_recording()
        } else {
            warn!("Microphone permission denied");
            Err(SessionError::PermissionDenied(Capability::Microphone))
        }
    }

    fn start_recording(&mut self) -> SessionResult<()> {
        let millis = chrono::Utc::now().timestamp_millis();
        let path = self.recordings_dir.join(recording_file_name(millis));

        // A failure below drops the guard, which releases the encoder
        let mut encoder = Guarded::new(self.backend.create_encoder());
        encoder
            .configure(&EncoderParams::speech(path.clone()))
            .map_err(SessionError::IoFailure)?;
        encoder.start().map_err(SessionError::IoFailure)?;

        info!(path = %path.display(), "Recording started");
        self.recorder = RecorderState::Recording { encoder, path };
        self.notices.push(Notice::info(fl!("recording-started")));
        Ok(())
    }

    fn finish_recording(&mut self) -> SessionResult<()> {
        let RecorderState::Recording { mut encoder, path } =
            std::mem::replace(&mut self.recorder, RecorderState::Idle)
        else {
            return Ok(());
        };

        let stopped = encoder.stop();
        encoder.release();

        match stopped {
            Ok(()) => {
                info!(path = %path.display(), "Recording finished");
                self.notices.push(Notice::info(fl!("recording-saved")));
                self.output_path = Some(path);
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Recorder stop failed");
                Err(SessionError::IoFailure(e))
            }
        }
    }

    /// Play, pause or resume the last recording
    pub fn toggle_play(&mut self) -> SessionResult<Task<RecordingMessage>> {
        if !self.can_play() {
            return Err(SessionError::invalid("play", "recording"));
        }

        match std::mem::replace(&mut self.player, PlayerState::Idle) {
            PlayerState::Playing { mut decoder } => match decoder.pause() {
                Ok(()) => {
                    self.player = PlayerState::Paused { decoder };
                    self.notices.push(Notice::info(fl!("playback-paused")));
                    Ok(Task::none())
                }
                Err(e) => {
                    decoder.release();
                    self.playback += 1;
                    Err(SessionError::IoFailure(e))
                }
            },
            PlayerState::Paused { mut decoder } => match decoder.start() {
                Ok(()) => {
                    self.player = PlayerState::Playing { decoder };
                    self.notices.push(Notice::info(fl!("playback-started")));
                    Ok(Task::none())
                }
                Err(e) => {
                    decoder.release();
                    self.playback += 1;
                    Err(SessionError::IoFailure(e))
                }
            },
            PlayerState::Idle => self.start_playback(),
        }
    }

    fn start_playback(&mut self) -> SessionResult<Task<RecordingMessage>> {
        let path = match &self.output_path {
            Some(path) if path.exists() => path.clone(),
            _ => return Err(SessionError::NotFound(fl!("no-recording"))),
        };

        let mut decoder = Guarded::new(self.backend.create_decoder());
        decoder.open(&path).map_err(SessionError::IoFailure)?;
        decoder.start().map_err(SessionError::IoFailure)?;
        let completion = decoder.completion();

        self.playback += 1;
        let playback = self.playback;
        info!(path = %path.display(), playback, "Playback started");
        self.player = PlayerState::Playing { decoder };
        self.notices.push(Notice::info(fl!("playback-started")));

        Ok(Task::perform(completion, move |end| {
            RecordingMessage::PlaybackFinished { playback, end }
        }))
    }

    /// Stop playback from any state
    ///
    /// A paused decoder is released without a `stop()` call.
    pub fn stop(&mut self) -> SessionResult<()> {
        match std::mem::replace(&mut self.player, PlayerState::Idle) {
            PlayerState::Idle => Ok(()),
            PlayerState::Playing { mut decoder } => {
                if let Err(e) = decoder.stop() {
                    debug!(error = %e, "Decoder stop failed");
                }
                decoder.release();
                self.playback += 1;
                self.notices.push(Notice::info(fl!("playback-stopped")));
                Ok(())
            }
            PlayerState::Paused { decoder } => {
                decoder.release();
                self.playback += 1;
                self.notices.push(Notice::info(fl!("playback-stopped")));
                Ok(())
            }
        }
    }

    /// The decoder's stream ended on its own
    pub fn on_playback_finished(&mut self, playback: u64, end: StreamEnd) -> SessionResult<()> {
        if playback != self.playback || self.player_status() == PlayerStatus::Idle {
            debug!(playback, current = self.playback, "Discarding stale playback completion");
            return Ok(());
        }

        if let PlayerState::Playing { decoder } | PlayerState::Paused { decoder } =
            std::mem::replace(&mut self.player, PlayerState::Idle)
        {
            decoder.release();
        }
        self.playback += 1;

        match end {
            StreamEnd::Completed => {
                info!("Playback completed");
                self.notices.push(Notice::info(fl!("playback-completed")));
                Ok(())
            }
            StreamEnd::Aborted => Ok(()),
            StreamEnd::Failed(reason) => Err(SessionError::IoFailure(reason)),
        }
    }

    /// Force both machines to Idle. Never reports errors.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.playback += 1;
        self.awaiting_permission = false;

        if let RecorderState::Recording { mut encoder, path } =
            std::mem::replace(&mut self.recorder, RecorderState::Idle)
        {
            match encoder.stop() {
                Ok(()) => {
                    info!(path = %path.display(), "Recording finished on teardown");
                    self.output_path = Some(path);
                }
                Err(e) => debug!(error = %e, "Recorder stop failed during teardown"),
            }
            encoder.release();
        }

        match std::mem::replace(&mut self.player, PlayerState::Idle) {
            PlayerState::Idle => {}
            PlayerState::Playing { mut decoder } => {
                if let Err(e) = decoder.stop() {
                    debug!(error = %e, "Decoder stop failed during teardown");
                }
                decoder.release();
            }
            PlayerState::Paused { decoder } => decoder.release(),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
