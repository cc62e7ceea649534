// SPDX-License-Identifier: GPL-3.0-only

//! Application state types

use super::camera::{CameraMessage, CaptureSession};
use super::gallery::{GalleryMessage, GalleryState};
use super::notice::NoticeBoard;
use super::recording::{RecordingMessage, RecordingSession};
use super::scanner::{ScanMessage, ScanSession};
use crate::backends::camera::{CameraProvider, GstCameraProvider, PreviewSink};
use crate::backends::permissions::{PermissionGate, SystemPermissionGate};
use crate::backends::scanner::{BarcodeRecognizer, CameraQrRecognizer};
use crate::config::Config;
use crate::media::{AudioBackend, GstAudioBackend};
use std::sync::Arc;

/// The three screens; exactly one is visible at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Camera,
    Audio,
    Scanner,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Camera, Screen::Audio, Screen::Scanner];

    pub fn next(self) -> Self {
        match self {
            Screen::Camera => Screen::Audio,
            Screen::Audio => Screen::Scanner,
            Screen::Scanner => Screen::Camera,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    /// Make a screen visible, hiding the current one
    Show(Screen),
    /// Hide the current screen (app going to background or quitting)
    Hide,
    Camera(CameraMessage),
    Gallery(GalleryMessage),
    Recording(RecordingMessage),
    Scan(ScanMessage),
    /// Periodic housekeeping (notice expiry)
    Tick,
}

/// Platform collaborators the controllers are built on
#[derive(Clone)]
pub struct Collaborators {
    pub camera: Arc<dyn CameraProvider>,
    pub permissions: Arc<dyn PermissionGate>,
    pub audio: Arc<dyn AudioBackend>,
    pub recognizer: Arc<dyn BarcodeRecognizer>,
}

impl Collaborators {
    /// GStreamer, V4L2, PipeWire and portal backed collaborators
    pub fn system(config: &Config, preview: PreviewSink) -> Self {
        Self {
            camera: Arc::new(GstCameraProvider::new(
                config.front_camera.clone(),
                config.back_camera.clone(),
                config.capture_timeout(),
            )),
            permissions: Arc::new(SystemPermissionGate::new(config.audio_device.clone())),
            audio: Arc::new(GstAudioBackend::new(config.audio_device.clone())),
            recognizer: Arc::new(
                CameraQrRecognizer::new(config.back_camera.clone(), config.scan_timeout())
                    .with_preview(preview),
            ),
        }
    }
}

/// Main application state
pub struct AppModel {
    pub(super) screen: Option<Screen>,
    pub(super) camera: CaptureSession,
    pub(super) gallery: GalleryState,
    pub(super) recording: RecordingSession,
    pub(super) scanner: ScanSession,
    pub(super) notices: NoticeBoard,
}
