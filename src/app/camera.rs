// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! ```text
//!             activate (granted)
//!   Unbound ─────────────────────────▶ Bound(facing)
//!      │  ▲                               │   ▲
//!      │  │ denied / bind failed          │   │ toggle_lens:
//!      ▼  │                               │   │ unbind_all, then bind
//!   AwaitingPermission ── granted ───────▶┘   └─ (other facing)
//! ```
//!
//! `deactivate` returns to Unbound from any state and bumps the generation,
//! so answers and captures issued before it are discarded.

use super::notice::Notice;
use super::task::Task;
use crate::backends::camera::{BindingHandle, CameraFrame, CameraProvider, LensFacing, PreviewSink};
use crate::backends::permissions::{Capability, PermissionGate};
use crate::errors::{SessionError, SessionResult};
use crate::fl;
use crate::storage::photo_file_name;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Binding state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Unbound,
    AwaitingPermission,
    Bound {
        facing: LensFacing,
        handle: BindingHandle,
    },
}

impl CaptureState {
    fn name(&self) -> &'static str {
        match self {
            CaptureState::Unbound => "the camera is off",
            CaptureState::AwaitingPermission => "waiting for camera permission",
            CaptureState::Bound { .. } => "the camera is on",
        }
    }
}

#[derive(Debug, Clone)]
pub enum CameraMessage {
    Activate,
    ToggleLens,
    Capture,
    Deactivate,
    PermissionAnswered { generation: u64, granted: bool },
    PhotoSaved {
        generation: u64,
        result: Result<PathBuf, String>,
    },
}

pub struct CaptureSession {
    provider: Arc<dyn CameraProvider>,
    permissions: Arc<dyn PermissionGate>,
    photos_dir: PathBuf,
    preview: PreviewSink,
    lens_facing: LensFacing,
    state: CaptureState,
    pending_capture: bool,
    generation: u64,
    notices: Vec<Notice>,
    last_photo: Option<PathBuf>,
}

impl CaptureSession {
    pub fn new(
        provider: Arc<dyn CameraProvider>,
        permissions: Arc<dyn PermissionGate>,
        photos_dir: PathBuf,
        initial_facing: LensFacing,
        preview: PreviewSink,
    ) -> Self {
        Self {
            provider,
            permissions,
            photos_dir,
            preview,
            lens_facing: initial_facing,
            state: CaptureState::Unbound,
            pending_capture: false,
            generation: 0,
            notices: Vec::new(),
            last_photo: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn lens_facing(&self) -> LensFacing {
        self.lens_facing
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, CaptureState::Bound { .. })
    }

    pub fn capture_pending(&self) -> bool {
        self.pending_capture
    }

    pub fn photos_dir(&self) -> &PathBuf {
        &self.photos_dir
    }

    /// Path of the most recent successful capture
    pub fn last_photo(&self) -> Option<&PathBuf> {
        self.last_photo.as_ref()
    }

    /// Live frames of the current binding
    pub fn preview(&self) -> watch::Receiver<Option<Arc<CameraFrame>>> {
        self.preview.subscribe()
    }

    /// Notices produced since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn update(&mut self, message: CameraMessage) -> Task<CameraMessage> {
        let result = match message {
            CameraMessage::Activate => self.activate(),
            CameraMessage::ToggleLens => self.toggle_lens().map(|()| Task::none()),
            CameraMessage::Capture => self.capture_photo(),
            CameraMessage::Deactivate => {
                self.deactivate();
                Ok(Task::none())
            }
            CameraMessage::PermissionAnswered {
                generation,
                granted,
            } => self.on_permission(generation, granted).map(|()| Task::none()),
            CameraMessage::PhotoSaved { generation, result } => {
                self.on_photo_saved(generation, result).map(|_| Task::none())
            }
        };

        result.unwrap_or_else(|err| {
            self.notices.push(Notice::from(&err));
            Task::none()
        })
    }

    /// Bind the current lens, asking for the camera first when needed
    pub fn activate(&mut self) -> SessionResult<Task<CameraMessage>> {
        match self.state {
            CaptureState::Bound { .. } | CaptureState::AwaitingPermission => {
                debug!(state = ?self.state, "Activate ignored");
                Ok(Task::none())
            }
            CaptureState::Unbound if self.permissions.is_granted(Capability::Camera) => {
                self.bind()?;
                Ok(Task::none())
            }
            CaptureState::Unbound => {
                info!("Requesting camera permission");
                self.state = CaptureState::AwaitingPermission;
                let generation = self.generation;
                Ok(Task::perform(
                    self.permissions.request(Capability::Camera),
                    move |granted| CameraMessage::PermissionAnswered {
                        generation,
                        granted,
                    },
                ))
            }
        }
    }

    /// Answer to a camera permission request
    pub fn on_permission(&mut self, generation: u64, granted: bool) -> SessionResult<()> {
        if generation != self.generation || self.state != CaptureState::AwaitingPermission {
            debug!(generation, current = self.generation, "Discarding stale permission answer");
            return Ok(());
        }

        if granted {
            self.bind()
        } else {
            warn!("Camera permission denied");
            self.state = CaptureState::Unbound;
            Err(SessionError::PermissionDenied(Capability::Camera))
        }
    }

    fn bind(&mut self) -> SessionResult<()> {
        match self.provider.bind(self.lens_facing, Arc::clone(&self.preview)) {
            Ok(handle) => {
                info!(facing = %self.lens_facing, handle = ?handle, "Capture session bound");
                self.state = CaptureState::Bound {
                    facing: self.lens_facing,
                    handle,
                };
                Ok(())
            }
            Err(e) => {
                warn!(facing = %self.lens_facing, error = %e, "Camera binding failed");
                self.state = CaptureState::Unbound;
                Err(e.into())
            }
        }
    }

    /// Switch to the other camera
    pub fn toggle_lens(&mut self) -> SessionResult<()> {
        if !self.is_bound() {
            return Err(SessionError::invalid("switch camera", self.state.name()));
        }

        self.lens_facing = self.lens_facing.toggled();
        info!(facing = %self.lens_facing, "Switching camera");

        self.state = CaptureState::Unbound;
        self.preview.send_replace(None);
        self.provider.unbind_all()?;
        self.bind()
    }

    /// Take a still with the bound camera
    pub fn capture_photo(&mut self) -> SessionResult<Task<CameraMessage>> {
        if !self.is_bound() {
            return Err(SessionError::invalid("take a photo", self.state.name()));
        }
        if self.pending_capture {
            return Err(SessionError::invalid("take a photo", "a capture is in progress"));
        }

        let output = self.photos_dir.join(photo_file_name(chrono::Local::now()));
        info!(path = %output.display(), "Capturing photo");
        self.pending_capture = true;

        let generation = self.generation;
        Ok(Task::perform(self.provider.capture(output), move |result| {
            CameraMessage::PhotoSaved { generation, result }
        }))
    }

    /// Completion of a capture; `Ok(None)` when the callback is stale
    pub fn on_photo_saved(
        &mut self,
        generation: u64,
        result: Result<PathBuf, String>,
    ) -> SessionResult<Option<PathBuf>> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale capture result");
            return Ok(None);
        }
        self.pending_capture = false;

        match result {
            Ok(path) => {
                let shown = path.display().to_string();
                self.notices.push(Notice::info(fl!("photo-saved", path = shown)));
                self.last_photo = Some(path.clone());
                Ok(Some(path))
            }
            Err(message) => {
                warn!(error = %message, "Photo capture failed");
                Err(SessionError::CaptureFailed(message))
            }
        }
    }

    /// Release the camera. Safe to call in any state.
    pub fn deactivate(&mut self) {
        self.generation += 1;
        self.pending_capture = false;

        if self.state != CaptureState::Unbound {
            debug!(state = ?self.state, "Deactivating capture session");
        }
        if self.is_bound()
            && let Err(e) = self.provider.unbind_all()
        {
            warn!(error = %e, "Failed to unbind camera");
        }
        self.state = CaptureState::Unbound;
        self.preview.send_replace(None);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}
