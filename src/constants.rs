// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Directory name used under the XDG picture/audio/config/cache roots
pub const APP_DIR_NAME: &str = "notekit";

/// Photo and gallery file naming
pub mod files {
    /// chrono pattern for photo names: `yyyy-MM-dd-HH-mm-ss-SSS`
    pub const PHOTO_NAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

    /// Extension written for captured photos
    pub const PHOTO_EXTENSION: &str = "jpg";

    /// Extensions shown in the photo gallery (matched case-sensitively)
    pub const GALLERY_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

    /// Prefix for voice recordings, followed by unix milliseconds
    pub const RECORDING_PREFIX: &str = "recording_";

    /// 3GPP container extension for voice recordings
    pub const RECORDING_EXTENSION: &str = "3gp";

    /// Config file name inside the config directory
    pub const CONFIG_FILE: &str = "config.json";

    /// Log file used while the terminal UI owns stdout
    pub const LOG_FILE: &str = "notekit.log";
}

/// Fixed speech recording parameters
pub mod audio {
    /// AMR narrow-band only accepts 8 kHz input
    pub const SAMPLE_RATE: i32 = 8_000;

    /// Mono
    pub const CHANNELS: u32 = 1;

    /// amrnbenc band mode: MR122, 12.2 kbit/s
    pub const AMR_NB_BAND_MODE: &str = "MR122";
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Preview frame width requested from the camera pipeline
    pub const PREVIEW_WIDTH: i32 = 640;

    /// Preview frame height requested from the camera pipeline
    pub const PREVIEW_HEIGHT: i32 = 480;

    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Output pixel format for appsink
    pub const OUTPUT_FORMAT: &str = "RGBA";

    /// JPEG quality for captured photos (0-100)
    pub const JPEG_QUALITY: u8 = 92;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// How long to watch the bus for immediate errors after going to PLAYING
    pub const START_ERROR_WINDOW: Duration = Duration::from_millis(500);

    /// Upper bound for the muxer to finish writing after EOS
    pub const EOS_TIMEOUT: Duration = Duration::from_secs(3);

    /// Default time a capture waits for the first preview frame
    pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 3_000;

    /// Default time a camera scan runs before giving up as cancelled
    pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 30;

    /// Terminal redraw interval
    pub const UI_TICK: Duration = Duration::from_millis(50);

    /// How long a notice stays on screen
    pub const NOTICE_LIFETIME: Duration = Duration::from_secs(3);
}

/// Barcode scanner constants
pub mod scan {
    /// Frames are downscaled to this maximum dimension before decoding
    pub const MAX_DIMENSION: u32 = 640;

    /// Magnification used for the auto-zoom retry
    pub const AUTO_ZOOM_FACTOR: u32 = 2;

    /// Delay between frame grabs while scanning
    pub const FRAME_INTERVAL_MS: u64 = 100;
}
