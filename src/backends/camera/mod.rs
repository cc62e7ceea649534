// SPDX-License-Identifier: GPL-3.0-only

//! Camera provider abstraction
//!
//! ```text
//! ┌──────────────────────┐
//! │    CaptureSession    │  ← lens facing, binding, pending capture
//! └──────────┬───────────┘
//!            │ bind / unbind_all / capture
//!            ▼
//! ┌──────────────────────┐
//! │ CameraProvider trait │
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │  GstCameraProvider   │  ← v4l2src → videoconvert → appsink
//! └──────────────────────┘
//! ```
//!
//! The provider permits a single active binding at a time, so callers must
//! `unbind_all` before binding again.

pub mod devices;
pub mod pipeline;

pub use devices::{VideoNode, enumerate_video_nodes};
pub use pipeline::{CameraPipeline, GstCameraProvider};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Which physical camera is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LensFacing {
    Front,
    #[default]
    Back,
}

impl LensFacing {
    /// The other camera
    pub fn toggled(self) -> Self {
        match self {
            LensFacing::Front => LensFacing::Back,
            LensFacing::Back => LensFacing::Front,
        }
    }
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
        }
    }
}

/// Opaque token for a live preview+capture binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingHandle(pub u64);

/// A single RGBA frame
#[derive(Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, may include padding
    pub stride: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Pixel data with row padding removed
    pub fn packed_rgba(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * 4;
        let stride = self.stride as usize;
        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);

        for y in 0..self.height as usize {
            let start = y * stride;
            if let Some(row) = self.data.get(start..start + row_bytes) {
                packed.extend_from_slice(row);
            }
        }

        packed
    }

    /// RGBA value at (x, y), black when out of range
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = y as usize * self.stride as usize + x as usize * 4;
        match self.data.get(offset..offset + 4) {
            Some(px) => [px[0], px[1], px[2], px[3]],
            None => [0, 0, 0, 255],
        }
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Where a binding publishes its preview frames
pub type PreviewSink = Arc<tokio::sync::watch::Sender<Option<Arc<CameraFrame>>>>;

/// Create a preview sink and its first receiver
pub fn preview_channel() -> (PreviewSink, tokio::sync::watch::Receiver<Option<Arc<CameraFrame>>>) {
    let (sender, receiver) = tokio::sync::watch::channel(None);
    (Arc::new(sender), receiver)
}

/// Result type for provider operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for camera provider operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No camera device for the requested facing
    DeviceNotFound(String),
    /// A binding is already active
    AlreadyBound,
    /// Pipeline construction or startup failed
    InitializationFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::AlreadyBound => write!(f, "A camera binding is already active"),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Camera collaborator consumed by the capture session
pub trait CameraProvider: Send + Sync {
    /// Bind preview and capture for the given facing
    ///
    /// Fails with [`BackendError::AlreadyBound`] when a binding is active.
    fn bind(&self, facing: LensFacing, preview: PreviewSink) -> BackendResult<BindingHandle>;

    /// Release every active binding. Safe to call when nothing is bound.
    fn unbind_all(&self) -> BackendResult<()>;

    /// Save a still to `output`
    ///
    /// Resolves exactly once, with the saved path or an error message.
    fn capture(&self, output: PathBuf) -> BoxFuture<'static, Result<PathBuf, String>>;
}
