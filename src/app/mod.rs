// SPDX-License-Identifier: GPL-3.0-only

//! Application state and session controllers
//!
//! # Architecture
//!
//! - `state`: `AppModel`, `Message`, `Screen`, `Collaborators`
//! - `update`: Message routing
//! - `camera`: Capture session (lens facing, binding, photo capture)
//! - `gallery`: Photo gallery overlay
//! - `recording`: Voice recorder and player
//! - `scanner`: Barcode scan session
//! - `notice`: Transient user notices
//! - `task`: Deferred work returned from `update`
//!
//! Controllers only talk to the platform through the collaborator traits, so
//! each one runs against in-memory fakes in tests.

pub mod camera;
pub mod gallery;
pub mod notice;
pub mod recording;
pub mod scanner;
mod state;
pub mod task;
mod update;

pub use camera::{CameraMessage, CaptureSession, CaptureState};
pub use gallery::{GalleryMessage, GalleryState};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use recording::{PlayerStatus, RecorderStatus, RecordingMessage, RecordingSession};
pub use scanner::{ScanMessage, ScanSession};
pub use state::{AppModel, Collaborators, Message, Screen};
pub use task::Task;

use crate::backends::camera::PreviewSink;
use crate::config::Config;
use crate::storage::{latest_recording, photos_dir, recordings_dir};

impl AppModel {
    pub fn new(collaborators: Collaborators, config: &Config, preview: PreviewSink) -> Self {
        let photos = photos_dir(config);
        let recordings = recordings_dir(config);
        let last_recording = latest_recording(&recordings);

        Self {
            screen: None,
            camera: CaptureSession::new(
                collaborators.camera,
                collaborators.permissions.clone(),
                photos.clone(),
                config.initial_lens_facing,
                preview,
            ),
            gallery: GalleryState::new(photos, config.gallery_extensions.clone()),
            recording: RecordingSession::new(
                collaborators.audio,
                collaborators.permissions.clone(),
                recordings,
            )
            .with_output_path(last_recording),
            scanner: ScanSession::new(
                collaborators.recognizer,
                collaborators.permissions,
                config.scan_request(),
            ),
            notices: NoticeBoard::default(),
        }
    }

    /// The visible screen, if any
    pub fn screen(&self) -> Option<Screen> {
        self.screen
    }

    pub fn camera(&self) -> &CaptureSession {
        &self.camera
    }

    pub fn gallery(&self) -> &GalleryState {
        &self.gallery
    }

    pub fn recording(&self) -> &RecordingSession {
        &self.recording
    }

    pub fn scanner(&self) -> &ScanSession {
        &self.scanner
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }
}
