// SPDX-License-Identifier: GPL-3.0-only

//! QR code recognition with rqrr
//!
//! Frames are converted to greyscale and downscaled before detection. With
//! auto-zoom enabled a frame that yields nothing is retried on a magnified
//! centre crop, which helps with small codes held far from the lens.

use super::{BarcodeFormat, BarcodeRecognizer, ScanOutcome, ScanRequest};
use crate::backends::camera::devices::{enumerate_video_nodes, resolve_device};
use crate::backends::camera::{CameraFrame, CameraPipeline, LensFacing, PreviewSink};
use crate::constants::scan;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// An 8-bit greyscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LumaImage {
    /// Greyscale copy of a frame, downscaled to fit `max_dimension`
    pub fn from_frame(frame: &CameraFrame, max_dimension: u32) -> Self {
        let (width, height) = (frame.width, frame.height);
        if width <= max_dimension && height <= max_dimension {
            let data = (0..height)
                .flat_map(|y| (0..width).map(move |x| (x, y)))
                .map(|(x, y)| luma(frame.pixel(x, y)))
                .collect();
            return Self { width, height, data };
        }

        let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
        let dst_width = ((width as f32 / scale) as u32).max(1);
        let dst_height = ((height as f32 / scale) as u32).max(1);
        Self {
            width: dst_width,
            height: dst_height,
            data: downscale_luma(frame, dst_width, dst_height),
        }
    }

    /// Wrap an already decoded greyscale image
    pub fn from_gray(image: image::GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
        }
    }

    fn at(&self, x: u32, y: u32) -> u8 {
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .unwrap_or(255)
    }

    /// Centre crop of `1/factor` the size, scaled back up to the original size
    pub fn zoomed(&self, factor: u32) -> Self {
        let factor = factor.max(1);
        let crop_width = (self.width / factor).max(1);
        let crop_height = (self.height / factor).max(1);
        let left = (self.width - crop_width) / 2;
        let top = (self.height - crop_height) / 2;

        let width = crop_width * factor;
        let height = crop_height * factor;
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| self.at(left + x / factor, top + y / factor))
            .collect();

        Self { width, height, data }
    }
}

/// BT.601 luma
fn luma(px: [u8; 4]) -> u8 {
    ((77 * px[0] as u32 + 150 * px[1] as u32 + 29 * px[2] as u32) >> 8) as u8
}

/// Downscale to greyscale using bilinear interpolation
fn downscale_luma(frame: &CameraFrame, dst_width: u32, dst_height: u32) -> Vec<u8> {
    let src_width = frame.width;
    let src_height = frame.height;
    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);
    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;
            let x0 = src_x as u32;
            let y0 = src_y as u32;
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);
            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let sample = |px: u32, py: u32| luma(frame.pixel(px, py)) as f32;
            let value = sample(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                + sample(x1, y0) * x_frac * (1.0 - y_frac)
                + sample(x0, y1) * (1.0 - x_frac) * y_frac
                + sample(x1, y1) * x_frac * y_frac;
            result.push(value as u8);
        }
    }
    result
}

/// First QR code rqrr can decode in the image
pub fn decode_luma(image: &LumaImage) -> Option<String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width as usize,
        image.height as usize,
        |x, y| image.at(x as u32, y as u32),
    );

    prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
        Ok((_meta, content)) => Some(content),
        Err(e) => {
            debug!(error = ?e, "Failed to decode QR grid");
            None
        }
    })
}

/// Decode the full image, then the zoomed centre when allowed
pub fn decode_with_zoom(image: &LumaImage, auto_zoom: bool) -> Option<String> {
    decode_luma(image).or_else(|| {
        if !auto_zoom {
            return None;
        }
        trace!(factor = scan::AUTO_ZOOM_FACTOR, "Retrying on zoomed centre");
        decode_luma(&image.zoomed(scan::AUTO_ZOOM_FACTOR))
    })
}

/// Reject requests this recognizer cannot serve at all
///
/// Only QR codes are decoded; other requested formats are ignored when a QR
/// code is also requested.
fn check_formats(formats: &BTreeSet<BarcodeFormat>) -> Result<(), String> {
    if formats.contains(&BarcodeFormat::QrCode) {
        for other in formats.iter().filter(|f| **f != BarcodeFormat::QrCode) {
            debug!(format = %other, "Barcode format not supported, ignoring");
        }
        Ok(())
    } else {
        Err("None of the requested barcode formats is supported".to_string())
    }
}

/// Scans live camera frames until a code shows up
pub struct CameraQrRecognizer {
    device: Option<String>,
    timeout: Duration,
    preview: Option<PreviewSink>,
    cancel: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl CameraQrRecognizer {
    /// `device` overrides the back camera; `timeout` bounds each scan
    pub fn new(device: Option<String>, timeout: Duration) -> Self {
        Self {
            device,
            timeout,
            preview: None,
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish scanned frames to a preview
    pub fn with_preview(mut self, preview: PreviewSink) -> Self {
        self.preview = Some(preview);
        self
    }
}

impl BarcodeRecognizer for CameraQrRecognizer {
    fn scan(&self, request: ScanRequest) -> BoxFuture<'static, ScanOutcome> {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = Some(cancel_tx);
        }
        let device = self.device.clone();
        let preview = self.preview.clone();
        let timeout = self.timeout;

        async move {
            if let Err(reason) = check_formats(&request.formats) {
                return ScanOutcome::Failed(reason);
            }

            let opened = tokio::task::spawn_blocking(move || {
                let nodes = if device.is_some() {
                    Vec::new()
                } else {
                    enumerate_video_nodes()
                };
                let path = resolve_device(LensFacing::Back, &nodes, device.as_deref())?;
                CameraPipeline::open(&path, preview)
            })
            .await;
            let camera = match opened {
                Ok(Ok(camera)) => camera,
                Ok(Err(e)) => return ScanOutcome::Failed(e.to_string()),
                Err(e) => return ScanOutcome::Failed(format!("Camera task error: {}", e)),
            };

            info!(timeout_secs = timeout.as_secs(), auto_zoom = request.auto_zoom, "Scanning for QR codes");
            tokio::select! {
                decoded = search_frames(&camera, request.auto_zoom) => ScanOutcome::Decoded(decoded),
                _ = cancel_rx => {
                    info!("Scan cancelled");
                    ScanOutcome::Cancelled
                }
                _ = tokio::time::sleep(timeout) => {
                    info!("Scan timed out");
                    ScanOutcome::Cancelled
                }
            }
        }
        .boxed()
    }

    fn cancel(&self) {
        if let Ok(mut slot) = self.cancel.lock()
            && let Some(sender) = slot.take()
        {
            let _ = sender.send(());
        }
    }
}

/// Decode every new frame until one contains a code
async fn search_frames(camera: &CameraPipeline, auto_zoom: bool) -> String {
    let mut last_seen: Option<Instant> = None;
    loop {
        tokio::time::sleep(Duration::from_millis(scan::FRAME_INTERVAL_MS)).await;

        let Some(frame) = camera.latest_frame() else {
            continue;
        };
        if last_seen.is_some_and(|seen| frame.captured_at <= seen) {
            continue;
        }
        last_seen = Some(frame.captured_at);

        let result = tokio::task::spawn_blocking(move || {
            let image = LumaImage::from_frame(&frame, scan::MAX_DIMENSION);
            decode_with_zoom(&image, auto_zoom)
        })
        .await;

        match result {
            Ok(Some(content)) => {
                info!(length = content.len(), "QR code decoded");
                return content;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "QR detection task panicked"),
        }
    }
}

/// Scans a still image from disk
#[derive(Debug, Clone)]
pub struct ImageQrRecognizer {
    path: PathBuf,
}

impl ImageQrRecognizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BarcodeRecognizer for ImageQrRecognizer {
    fn scan(&self, request: ScanRequest) -> BoxFuture<'static, ScanOutcome> {
        let path = self.path.clone();

        async move {
            if let Err(reason) = check_formats(&request.formats) {
                return ScanOutcome::Failed(reason);
            }

            let result = tokio::task::spawn_blocking(move || {
                let decoded = image::open(&path)
                    .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
                let gray = LumaImage::from_gray(decoded.to_luma8());
                Ok::<_, String>(decode_with_zoom(&gray, request.auto_zoom))
            })
            .await;

            match result {
                Ok(Ok(Some(content))) => ScanOutcome::Decoded(content),
                Ok(Ok(None)) => ScanOutcome::Failed("No code found in image".to_string()),
                Ok(Err(e)) => ScanOutcome::Failed(e),
                Err(e) => ScanOutcome::Failed(format!("Scan task error: {}", e)),
            }
        }
        .boxed()
    }

    fn uses_camera(&self) -> bool {
        false
    }
}
