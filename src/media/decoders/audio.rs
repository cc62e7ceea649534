// SPDX-License-Identifier: GPL-3.0-only

//! Recording playback through `playbin`

use crate::media::{AudioDecoder, Release, StreamEnd};
use futures::FutureExt;
use futures::future::BoxFuture;
use gstreamer as gst;
use gstreamer::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the completion watcher checks for release
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// GStreamer audio player
#[derive(Default)]
pub struct GstAudioPlayer {
    playbin: Option<gst::Element>,
    released: Arc<AtomicBool>,
}

impl GstAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn playbin(&self, operation: &str) -> Result<&gst::Element, String> {
        self.playbin
            .as_ref()
            .ok_or_else(|| format!("Cannot {} a decoder that is not open", operation))
    }

    fn set_state(&self, operation: &str, state: gst::State) -> Result<(), String> {
        self.playbin(operation)?
            .set_state(state)
            .map(|_| ())
            .map_err(|e| format!("Failed to {} playback: {}", operation, e))
    }
}

impl AudioDecoder for GstAudioPlayer {
    fn open(&mut self, path: &Path) -> Result<(), String> {
        if self.playbin.is_some() || self.released.load(Ordering::SeqCst) {
            return Err("Decoder already used".to_string());
        }
        let path = path
            .canonicalize()
            .map_err(|e| format!("Cannot open {}: {}", path.display(), e))?;

        gst::init().map_err(|e| format!("Failed to initialize GStreamer: {}", e))?;
        let uri = gst::glib::filename_to_uri(&path, None)
            .map_err(|e| format!("Invalid recording path {}: {}", path.display(), e))?;

        let playbin = gst::ElementFactory::make("playbin")
            .property("uri", uri.as_str())
            .build()
            .map_err(|e| format!("Failed to create playbin: {}", e))?;
        playbin
            .set_state(gst::State::Ready)
            .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;

        debug!(path = %path.display(), "Audio decoder opened");
        self.playbin = Some(playbin);
        Ok(())
    }

    fn start(&mut self) -> Result<(), String> {
        info!("Starting playback");
        self.set_state("start", gst::State::Playing)
    }

    fn pause(&mut self) -> Result<(), String> {
        info!("Pausing playback");
        self.set_state("pause", gst::State::Paused)
    }

    fn stop(&mut self) -> Result<(), String> {
        info!("Stopping playback");
        self.set_state("stop", gst::State::Null)
    }

    fn completion(&mut self) -> BoxFuture<'static, StreamEnd> {
        let bus = self.playbin.as_ref().and_then(|playbin| playbin.bus());
        let released = Arc::clone(&self.released);

        async move {
            let Some(bus) = bus else {
                return StreamEnd::Aborted;
            };
            let timeout = gst::ClockTime::from_mseconds(POLL_INTERVAL.as_millis() as u64);

            tokio::task::spawn_blocking(move || {
                loop {
                    if released.load(Ordering::SeqCst) {
                        return StreamEnd::Aborted;
                    }
                    let Some(msg) =
                        bus.timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error])
                    else {
                        continue;
                    };
                    match msg.view() {
                        gst::MessageView::Eos(..) => {
                            info!("Playback reached end of stream");
                            return StreamEnd::Completed;
                        }
                        gst::MessageView::Error(err) => {
                            warn!(error = %err.error(), debug = ?err.debug(), "Playback error");
                            return StreamEnd::Failed(err.error().to_string());
                        }
                        _ => {}
                    }
                }
            })
            .await
            .unwrap_or(StreamEnd::Aborted)
        }
        .boxed()
    }
}

impl Release for GstAudioPlayer {
    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
        if let Some(playbin) = self.playbin.take() {
            debug!("Releasing audio decoder");
            let _ = playbin.set_state(gst::State::Null);
        }
    }
}

impl Drop for GstAudioPlayer {
    fn drop(&mut self) {
        self.release();
    }
}
