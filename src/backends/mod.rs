// SPDX-License-Identifier: GPL-3.0-only

//! Platform collaborators behind the session controllers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             Session controllers              │
//! └──────┬──────────────┬───────────────┬───────┘
//!        │              │               │
//! ┌──────┴─────┐ ┌──────┴──────┐ ┌──────┴──────┐
//! │   Camera   │ │ Permissions │ │   Scanner   │
//! │ (V4L2/GSt) │ │(portal/V4L2)│ │   (rqrr)    │
//! └────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`audio`]: PipeWire microphone discovery
//! - [`camera`]: Camera provider with device resolution and frame capture
//! - [`permissions`]: Camera and microphone access gate
//! - [`scanner`]: Barcode recognizers

pub mod audio;
pub mod camera;
pub mod permissions;
pub mod scanner;
