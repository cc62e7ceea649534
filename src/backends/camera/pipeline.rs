// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera pipeline and the provider built on it
//!
//! `v4l2src → videoconvert → videoscale → capsfilter(RGBA) → appsink`
//!
//! The appsink callback runs on the GStreamer streaming thread. It keeps the
//! newest frame for still capture and publishes it to the preview sink.

use super::devices::{enumerate_video_nodes, resolve_device};
use super::{
    BackendError, BackendResult, BindingHandle, CameraFrame, CameraProvider, LensFacing,
    PreviewSink,
};
use crate::constants::{pipeline, timing};
use futures::FutureExt;
use futures::future::BoxFuture;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

type LatestFrame = Arc<Mutex<Option<Arc<CameraFrame>>>>;

/// A running camera pipeline
///
/// Dropping it stops the pipeline and closes the device.
pub struct CameraPipeline {
    pipeline: gst::Pipeline,
    latest: LatestFrame,
    device: PathBuf,
}

impl CameraPipeline {
    /// Build and start a pipeline for a V4L2 device
    pub fn open(device: &Path, preview: Option<PreviewSink>) -> BackendResult<Self> {
        info!(device = %device.display(), "Opening camera pipeline");
        gst::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let make = |factory: &str| {
            gst::ElementFactory::make(factory).build().map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create {}: {}", factory, e))
            })
        };

        let source = gst::ElementFactory::make("v4l2src")
            .property("device", device.to_string_lossy().to_string())
            .build()
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to create v4l2src: {}", e)))?;
        let convert = make("videoconvert")?;
        let scale = make("videoscale")?;

        let caps = gst::Caps::builder("video/x-raw")
            .field("format", pipeline::OUTPUT_FORMAT)
            .field("width", pipeline::PREVIEW_WIDTH)
            .field("height", pipeline::PREVIEW_HEIGHT)
            .build();
        let capsfilter = gst::ElementFactory::make("capsfilter")
            .property("caps", &caps)
            .build()
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to create capsfilter: {}", e)))?;

        let appsink = make("appsink")?
            .dynamic_cast::<AppSink>()
            .map_err(|_| BackendError::InitializationFailed("Failed to cast appsink".to_string()))?;
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);

        let gst_pipeline = gst::Pipeline::new();
        gst_pipeline
            .add_many([&source, &convert, &scale, &capsfilter, appsink.upcast_ref()])
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;
        gst::Element::link_many([&source, &convert, &scale, &capsfilter, appsink.upcast_ref()])
            .map_err(|_| BackendError::InitializationFailed("Failed to link camera pipeline".to_string()))?;

        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let sink_latest = Arc::clone(&latest);
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let frame = Arc::new(frame_from_sample(&sample).ok_or(gst::FlowError::Error)?);

                    if let Ok(mut slot) = sink_latest.lock() {
                        *slot = Some(Arc::clone(&frame));
                    }
                    if let Some(preview) = &preview {
                        preview.send_replace(Some(frame));
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        let camera = Self {
            pipeline: gst_pipeline,
            latest,
            device: device.to_path_buf(),
        };
        camera.start()?;
        Ok(camera)
    }

    /// Go to PLAYING and fail fast on errors posted right after startup
    fn start(&self) -> BackendResult<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to start camera: {}", e)))?;

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| BackendError::InitializationFailed("No bus available".to_string()))?;
        let window = gst::ClockTime::from_mseconds(timing::START_ERROR_WINDOW.as_millis() as u64);

        if let Some(msg) = bus.timed_pop_filtered(window, &[gst::MessageType::Error]) {
            if let gst::MessageView::Error(err) = msg.view() {
                error!(
                    error = %err.error(),
                    debug = ?err.debug(),
                    source = ?err.src().map(|s| s.name()),
                    "GStreamer error during camera start"
                );
                return Err(BackendError::InitializationFailed(err.error().to_string()));
            }
        }

        debug!(device = %self.device.display(), "Camera pipeline running");
        Ok(())
    }

    /// Newest frame, if any arrived yet
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    /// Shared handle to the newest frame slot
    fn latest_handle(&self) -> LatestFrame {
        Arc::clone(&self.latest)
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        debug!(device = %self.device.display(), "Stopping camera pipeline");
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Poll the frame slot until a fresh frame shows up or the timeout passes
async fn wait_for_frame(
    latest: LatestFrame,
    since: Instant,
    timeout: Duration,
) -> Option<Arc<CameraFrame>> {
    let deadline = Instant::now() + timeout;
    loop {
        let fresh = latest
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .filter(|frame| frame.captured_at >= since);
        if fresh.is_some() {
            return fresh;
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Copy an appsink sample into a frame
fn frame_from_sample(sample: &gst::Sample) -> Option<CameraFrame> {
    let buffer = sample.buffer()?;
    if buffer.flags().contains(gst::BufferFlags::CORRUPTED) {
        return None;
    }
    let info = VideoInfo::from_caps(sample.caps()?).ok()?;
    let map = buffer.map_readable().ok()?;

    Some(CameraFrame {
        width: info.width(),
        height: info.height(),
        stride: info.stride()[0] as u32,
        data: Arc::from(map.as_slice()),
        captured_at: Instant::now(),
    })
}

struct ActiveBinding {
    handle: BindingHandle,
    facing: LensFacing,
    camera: CameraPipeline,
}

/// Camera provider backed by V4L2 devices through GStreamer
pub struct GstCameraProvider {
    front_override: Option<String>,
    back_override: Option<String>,
    capture_timeout: Duration,
    active: Mutex<Option<ActiveBinding>>,
    next_handle: AtomicU64,
}

impl GstCameraProvider {
    pub fn new(
        front_override: Option<String>,
        back_override: Option<String>,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            front_override,
            back_override,
            capture_timeout,
            active: Mutex::new(None),
            next_handle: AtomicU64::new(1),
        }
    }

    fn device_for(&self, facing: LensFacing) -> BackendResult<PathBuf> {
        let override_path = match facing {
            LensFacing::Front => self.front_override.as_deref(),
            LensFacing::Back => self.back_override.as_deref(),
        };
        let nodes = if override_path.is_some() {
            Vec::new()
        } else {
            enumerate_video_nodes()
        };
        resolve_device(facing, &nodes, override_path)
    }
}

impl CameraProvider for GstCameraProvider {
    fn bind(&self, facing: LensFacing, preview: PreviewSink) -> BackendResult<BindingHandle> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| BackendError::Other("camera state poisoned".to_string()))?;
        if let Some(existing) = active.as_ref() {
            warn!(handle = ?existing.handle, facing = %existing.facing, "Bind refused, binding still active");
            return Err(BackendError::AlreadyBound);
        }

        let device = self.device_for(facing)?;
        let camera = CameraPipeline::open(&device, Some(preview))?;
        let handle = BindingHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        info!(handle = ?handle, facing = %facing, device = %device.display(), "Camera bound");

        *active = Some(ActiveBinding {
            handle,
            facing,
            camera,
        });
        Ok(handle)
    }

    fn unbind_all(&self) -> BackendResult<()> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| BackendError::Other("camera state poisoned".to_string()))?;
        if let Some(binding) = active.take() {
            info!(handle = ?binding.handle, "Camera unbound");
        }
        Ok(())
    }

    fn capture(&self, output: PathBuf) -> BoxFuture<'static, Result<PathBuf, String>> {
        let latest = self
            .active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|binding| binding.camera.latest_handle()));
        let timeout = self.capture_timeout;
        let requested_at = Instant::now();

        async move {
            let latest = latest.ok_or("Camera is not bound")?;
            let frame = wait_for_frame(latest, requested_at, timeout)
                .await
                .ok_or("No frame arrived from the camera")?;
            crate::pipelines::photo::save_photo(frame, output).await
        }
        .boxed()
    }
}
