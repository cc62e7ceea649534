// SPDX-License-Identifier: GPL-3.0-only

//! Barcode recognizer abstraction
//!
//! A scan is a single request that resolves to exactly one [`ScanOutcome`].
//! Recognizers keep no state between requests apart from the handle needed
//! to cancel the one in flight.

pub mod qr;

pub use qr::{CameraQrRecognizer, ImageQrRecognizer, decode_luma};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Symbologies a scan may look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    Aztec,
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarcodeFormat::QrCode => write!(f, "QR code"),
            BarcodeFormat::Aztec => write!(f, "Aztec"),
        }
    }
}

/// Parameters for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub formats: BTreeSet<BarcodeFormat>,
    /// Retry on a magnified centre crop when the full frame yields nothing
    pub auto_zoom: bool,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            formats: [BarcodeFormat::QrCode, BarcodeFormat::Aztec].into_iter().collect(),
            auto_zoom: true,
        }
    }
}

/// Terminal result of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Decoded(String),
    Cancelled,
    Failed(String),
}

/// Barcode collaborator consumed by the scan session
pub trait BarcodeRecognizer: Send + Sync {
    /// Start a scan. Resolves exactly once.
    fn scan(&self, request: ScanRequest) -> BoxFuture<'static, ScanOutcome>;

    /// Cancel the scan in flight, which then resolves as [`ScanOutcome::Cancelled`]
    fn cancel(&self) {}

    /// Whether scanning reads from the camera
    fn uses_camera(&self) -> bool {
        true
    }
}
