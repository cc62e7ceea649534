// SPDX-License-Identifier: GPL-3.0-only

//! notekit - camera, voice memo and barcode scanner for taking notes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Session controllers, message routing and notices
//! - [`backends`]: Camera, permission, audio device and barcode collaborators
//! - [`media`]: Voice recording and playback resources
//! - [`pipelines`]: Still photo encoding
//! - [`config`]: User configuration handling
//! - [`storage`]: Gallery listing and file naming
//! - [`terminal`]: Full-screen terminal front end

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod i18n;
pub mod media;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppModel, Message, Screen};
pub use config::Config;
pub use errors::{AppError, AppResult, SessionError, SessionResult};
