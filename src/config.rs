// SPDX-License-Identifier: GPL-3.0-only

//! Persistent settings
//!
//! Stored as pretty JSON at `$XDG_CONFIG_HOME/notekit/config.json`. Unknown
//! fields are ignored and missing ones take their defaults, so older files
//! keep loading after new settings are added.

use crate::backends::camera::LensFacing;
use crate::backends::scanner::{BarcodeFormat, ScanRequest};
use crate::constants::{APP_DIR_NAME, files, timing};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Photo directory override
    pub photos_dir: Option<PathBuf>,
    /// Recording directory override
    pub recordings_dir: Option<PathBuf>,
    /// Lens used when the camera screen opens
    pub initial_lens_facing: LensFacing,
    /// V4L2 device path for the front camera
    pub front_camera: Option<String>,
    /// V4L2 device path for the back camera
    pub back_camera: Option<String>,
    /// PipeWire audio source (`pipewire-serial-<n>`, `pipewire-<node>` or a node name)
    pub audio_device: Option<String>,
    pub scan_formats: BTreeSet<BarcodeFormat>,
    pub scan_auto_zoom: bool,
    /// Seconds before a camera scan gives up
    pub scan_timeout_secs: u64,
    /// Milliseconds a capture waits for a fresh frame
    pub capture_timeout_ms: u64,
    /// Extensions listed in the photo gallery
    pub gallery_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            photos_dir: None,
            recordings_dir: None,
            initial_lens_facing: LensFacing::default(),
            front_camera: None,
            back_camera: None,
            audio_device: None,
            scan_formats: ScanRequest::default().formats,
            scan_auto_zoom: true,
            scan_timeout_secs: timing::DEFAULT_SCAN_TIMEOUT_SECS,
            capture_timeout_ms: timing::DEFAULT_CAPTURE_TIMEOUT_MS,
            gallery_extensions: files::GALLERY_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(files::CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory, using default settings");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing, unreadable or malformed file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path().ok_or("No config directory available")?;
        self.save_to(&path)
    }

    /// Write pretty JSON, creating the parent directory
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Scan request built from the scan settings
    pub fn scan_request(&self) -> ScanRequest {
        ScanRequest {
            formats: self.scan_formats.clone(),
            auto_zoom: self.scan_auto_zoom,
        }
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{ "initial_lens_facing": "Front" }"#).unwrap();
        assert_eq!(config.initial_lens_facing, LensFacing::Front);
        assert_eq!(config.gallery_extensions, vec!["jpg", "jpeg"]);
        assert!(config.scan_auto_zoom);
    }

    #[test]
    fn test_scan_request_from_settings() {
        let config = Config {
            scan_auto_zoom: false,
            ..Config::default()
        };
        let request = config.scan_request();
        assert!(!request.auto_zoom);
        assert!(request.formats.contains(&BarcodeFormat::QrCode));
    }
}
