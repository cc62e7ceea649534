// SPDX-License-Identifier: GPL-3.0-only

//! Still photo encoding
//!
//! Frames arrive as (possibly padded) RGBA and are written as baseline JPEG.
//! Encoding and the file write run on the blocking pool.

use crate::backends::camera::CameraFrame;
use crate::constants::pipeline::JPEG_QUALITY;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Drop alpha and row padding
pub fn frame_to_rgb(frame: &CameraFrame) -> Result<RgbImage, String> {
    let rgb: Vec<u8> = frame
        .packed_rgba()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    RgbImage::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| format!("Frame data too short for {}x{}", frame.width, frame.height))
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
        std::io::Cursor::new(&mut buffer),
        quality,
    );

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;

    Ok(buffer)
}

/// Encode and write a frame synchronously
pub fn write_jpeg(frame: &CameraFrame, output: &Path) -> Result<(), String> {
    let rgb = frame_to_rgb(frame)?;
    let data = encode_jpeg(&rgb, JPEG_QUALITY)?;
    debug!(size = data.len(), "Encoding complete");

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(output, &data).map_err(|e| format!("Failed to save photo: {}", e))
}

/// Encode and save a frame off the calling thread
pub async fn save_photo(frame: Arc<CameraFrame>, output: PathBuf) -> Result<PathBuf, String> {
    info!(path = %output.display(), width = frame.width, height = frame.height, "Saving photo");

    let target = output.clone();
    tokio::task::spawn_blocking(move || write_jpeg(&frame, &target))
        .await
        .map_err(|e| format!("Save task error: {}", e))??;

    info!(path = %output.display(), "Photo saved successfully");
    Ok(output)
}
