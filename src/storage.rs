// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for photo and recording files
//!
//! The gallery is a read-only projection of a directory: nothing is cached,
//! every listing goes back to the filesystem.

use crate::config::Config;
use crate::constants::{APP_DIR_NAME, files};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// A file shown in the gallery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl GalleryEntry {
    /// File name for display
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// List files whose extension is in `extensions`, newest first
///
/// Extensions are compared case-sensitively. A missing or unreadable
/// directory yields an empty list.
pub fn list_gallery<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Vec<GalleryEntry> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Gallery directory not readable");
            return Vec::new();
        }
    };

    let mut gallery: Vec<GalleryEntry> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let ext = path.extension()?.to_str()?;
            if !extensions.iter().any(|wanted| wanted.as_ref() == ext) {
                return None;
            }
            // Follows symlinks
            let metadata = std::fs::metadata(&path).ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(GalleryEntry {
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                path,
            })
        })
        .collect();

    // Newest first; ties keep a stable order by name
    gallery.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    debug!(dir = %dir.display(), count = gallery.len(), "Listed gallery");
    gallery
}

/// Delete a gallery file. Returns `false` when nothing was removed.
pub fn delete_entry(entry: &GalleryEntry) -> bool {
    match std::fs::remove_file(&entry.path) {
        Ok(()) => {
            info!(path = %entry.path.display(), "Deleted file");
            true
        }
        Err(e) => {
            warn!(path = %entry.path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}

/// Most recent recording in `dir`
pub fn latest_recording(dir: &Path) -> Option<PathBuf> {
    list_gallery(dir, &[files::RECORDING_EXTENSION])
        .into_iter()
        .next()
        .map(|entry| entry.path)
}

/// Photo file name for a capture time, e.g. `2024-03-09-14-05-59-042.jpg`
pub fn photo_file_name(time: DateTime<Local>) -> String {
    format!(
        "{}.{}",
        time.format(files::PHOTO_NAME_FORMAT),
        files::PHOTO_EXTENSION
    )
}

/// Recording file name for a unix timestamp in milliseconds
pub fn recording_file_name(unix_millis: i64) -> String {
    format!(
        "{}{}.{}",
        files::RECORDING_PREFIX,
        unix_millis,
        files::RECORDING_EXTENSION
    )
}

/// App-scoped photo directory: the configured one, else `~/Pictures/notekit`
pub fn photos_dir(config: &Config) -> PathBuf {
    config.photos_dir.clone().unwrap_or_else(|| {
        dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
    })
}

/// App-scoped recordings directory: the configured one, else `~/Music/notekit`
pub fn recordings_dir(config: &Config) -> PathBuf {
    config.recordings_dir.clone().unwrap_or_else(|| {
        dirs::audio_dir()
            .or_else(dirs::data_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
    })
}
