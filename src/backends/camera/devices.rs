// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture node discovery and lens facing resolution

use super::{BackendError, BackendResult, LensFacing};
use std::path::PathBuf;
use tracing::{debug, info};
use v4l::capability::Flags;
use v4l::prelude::*;

/// A V4L2 node that can capture video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoNode {
    pub index: usize,
    pub path: PathBuf,
    pub name: String,
}

/// List capture-capable `/dev/video*` nodes, lowest index first
///
/// Metadata nodes (UVC exposes one per camera) are skipped.
pub fn enumerate_video_nodes() -> Vec<VideoNode> {
    let mut nodes: Vec<VideoNode> = v4l::context::enum_devices()
        .into_iter()
        .filter_map(|node| {
            let path = node.path().to_path_buf();
            let caps = Device::with_path(&path).and_then(|dev| dev.query_caps()).ok()?;
            if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                debug!(path = %path.display(), "Skipping non-capture node");
                return None;
            }
            Some(VideoNode {
                index: node.index(),
                name: node.name().unwrap_or_else(|| caps.card.clone()),
                path,
            })
        })
        .collect();

    nodes.sort_by_key(|node| node.index);
    nodes
}

/// Pick the device for a lens facing
///
/// An explicit override wins. Otherwise the first node is the front camera
/// and the second the back camera; with a single camera both facings share it.
pub fn resolve_device(
    facing: LensFacing,
    nodes: &[VideoNode],
    override_path: Option<&str>,
) -> BackendResult<PathBuf> {
    if let Some(path) = override_path {
        return Ok(PathBuf::from(path));
    }

    let node = match facing {
        LensFacing::Front => nodes.first(),
        LensFacing::Back => nodes.get(1).or_else(|| {
            if let Some(only) = nodes.first() {
                info!(device = %only.name, "Single camera, using it for the back facing");
            }
            nodes.first()
        }),
    };

    node.map(|node| node.path.clone())
        .ok_or_else(|| BackendError::DeviceNotFound(format!("no {} camera", facing)))
}
