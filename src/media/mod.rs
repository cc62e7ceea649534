// SPDX-License-Identifier: GPL-3.0-only

//! Audio encoding and decoding resources
//!
//! The recording session drives encoders and decoders through the traits in
//! this module. Each resource follows a strict lifecycle:
//!
//! ```text
//! encoder: created → configure → start → stop → release
//! decoder: created → open → start ⇄ pause → stop → release
//! ```
//!
//! `release` is idempotent, and [`Guarded`] calls it when a resource goes out
//! of scope without being released explicitly.
//!
//! # Modules
//!
//! - [`encoders`]: AMR-NB/3GPP voice recorder on GStreamer
//! - [`decoders`]: playbin based player

pub mod decoders;
pub mod encoders;

pub use decoders::audio::GstAudioPlayer;
pub use encoders::audio::{AudioChannels, AudioCodec, Container, EncoderParams, GstAudioRecorder};

use futures::future::BoxFuture;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// Frees the platform resources behind an encoder or decoder
pub trait Release {
    /// Safe to call more than once
    fn release(&mut self);
}

/// Voice recorder resource
pub trait AudioEncoder: Release + Send {
    /// Build the recording pipeline. Synchronous.
    fn configure(&mut self, params: &EncoderParams) -> Result<(), String>;
    fn start(&mut self) -> Result<(), String>;
    /// Finish and finalize the output file
    fn stop(&mut self) -> Result<(), String>;
}

/// How a playback stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Reached end of stream
    Completed,
    /// Released before reaching the end
    Aborted,
    /// The stream reported an error
    Failed(String),
}

/// Audio player resource
pub trait AudioDecoder: Release + Send {
    /// Bind the decoder to a file. Synchronous.
    fn open(&mut self, path: &Path) -> Result<(), String>;
    fn start(&mut self) -> Result<(), String>;
    fn pause(&mut self) -> Result<(), String>;
    fn stop(&mut self) -> Result<(), String>;
    /// Resolves once when the opened stream ends or the decoder is released
    fn completion(&mut self) -> BoxFuture<'static, StreamEnd>;
}

/// Creates fresh encoder and decoder resources
pub trait AudioBackend: Send + Sync {
    fn create_encoder(&self) -> Box<dyn AudioEncoder>;
    fn create_decoder(&self) -> Box<dyn AudioDecoder>;
}

/// GStreamer implementation of [`AudioBackend`]
#[derive(Debug, Clone, Default)]
pub struct GstAudioBackend {
    audio_device: Option<String>,
}

impl GstAudioBackend {
    /// `audio_device` selects the PipeWire source; `None` uses the default
    pub fn new(audio_device: Option<String>) -> Self {
        Self { audio_device }
    }
}

impl AudioBackend for GstAudioBackend {
    fn create_encoder(&self) -> Box<dyn AudioEncoder> {
        Box::new(GstAudioRecorder::new(self.audio_device.clone()))
    }

    fn create_decoder(&self) -> Box<dyn AudioDecoder> {
        Box::new(GstAudioPlayer::new())
    }
}

/// Owns a resource and releases it on drop unless released explicitly
pub struct Guarded<T: ?Sized + Release> {
    inner: Box<T>,
    released: bool,
}

impl<T: ?Sized + Release> Guarded<T> {
    pub fn new(inner: Box<T>) -> Self {
        Self {
            inner,
            released: false,
        }
    }

    /// Release now and give up the resource
    pub fn release(mut self) {
        self.inner.release();
        self.released = true;
    }
}

impl<T: ?Sized + Release> Deref for Guarded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + Release> DerefMut for Guarded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: ?Sized + Release> Drop for Guarded<T> {
    fn drop(&mut self) {
        if !self.released {
            self.inner.release();
        }
    }
}

impl<T: ?Sized + Release> std::fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guarded")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
