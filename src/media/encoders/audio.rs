// SPDX-License-Identifier: GPL-3.0-only

//! Voice recorder
//!
//! ```text
//! pipewiresrc → queue → audioconvert → audioresample → capsfilter(8 kHz mono)
//!     → amrnbenc → 3gppmux → filesink
//! ```

use crate::backends::audio::pipewire_target;
use crate::constants::{audio, timing};
use crate::media::{AudioEncoder, Release};
use gstreamer as gst;
use gstreamer::prelude::*;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Audio codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    /// AMR narrow-band speech codec
    AmrNb,
}

impl AudioCodec {
    /// Get audio caps string for this codec
    pub fn caps_string(&self) -> &'static str {
        match self {
            AudioCodec::AmrNb => "audio/AMR",
        }
    }

    /// GStreamer encoder element
    pub fn element_name(&self) -> &'static str {
        match self {
            AudioCodec::AmrNb => "amrnbenc",
        }
    }
}

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioChannels {
    Mono,
}

impl AudioChannels {
    /// Get number of channels
    pub fn count(&self) -> u32 {
        match self {
            AudioChannels::Mono => audio::CHANNELS,
        }
    }
}

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// 3GPP (`.3gp`)
    ThreeGpp,
}

impl Container {
    pub fn muxer_name(&self) -> &'static str {
        match self {
            Container::ThreeGpp => "3gppmux",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Container::ThreeGpp => crate::constants::files::RECORDING_EXTENSION,
        }
    }
}

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderParams {
    pub codec: AudioCodec,
    pub channels: AudioChannels,
    pub sample_rate: i32,
    pub container: Container,
    pub output: PathBuf,
}

impl EncoderParams {
    /// The fixed voice memo format: mono AMR-NB at 8 kHz in 3GPP
    pub fn speech(output: PathBuf) -> Self {
        Self {
            codec: AudioCodec::AmrNb,
            channels: AudioChannels::Mono,
            sample_rate: audio::SAMPLE_RATE,
            container: Container::ThreeGpp,
            output,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Created,
    Configured,
    Recording,
    Stopped,
    Released,
}

/// GStreamer voice recorder
pub struct GstAudioRecorder {
    audio_device: Option<String>,
    pipeline: Option<gst::Pipeline>,
    output: Option<PathBuf>,
    state: EncoderState,
}

impl GstAudioRecorder {
    pub fn new(audio_device: Option<String>) -> Self {
        Self {
            audio_device,
            pipeline: None,
            output: None,
            state: EncoderState::Created,
        }
    }

    fn build_pipeline(&self, params: &EncoderParams) -> Result<gst::Pipeline, String> {
        gst::init().map_err(|e| format!("Failed to initialize GStreamer: {}", e))?;

        let mut source_builder = gst::ElementFactory::make("pipewiresrc").property("do-timestamp", true);
        match self.audio_device.as_deref() {
            Some(device) => {
                let target = pipewire_target(device);
                info!(target_object = target, "Using PipeWire audio source");
                source_builder = source_builder.property("target-object", target);
            }
            None => info!("Using default PipeWire audio source"),
        }
        let source = source_builder
            .build()
            .map_err(|e| format!("Failed to create audio source: {}", e))?;

        let make = |factory: &str| {
            gst::ElementFactory::make(factory)
                .build()
                .map_err(|e| format!("Failed to create {}: {}", factory, e))
        };
        let queue = make("queue")?;
        let convert = make("audioconvert")?;
        let resample = make("audioresample")?;

        let caps = gst::Caps::builder("audio/x-raw")
            .field("rate", params.sample_rate)
            .field("channels", params.channels.count() as i32)
            .build();
        let capsfilter = gst::ElementFactory::make("capsfilter")
            .property("caps", &caps)
            .build()
            .map_err(|e| format!("Failed to create capsfilter: {}", e))?;

        let encoder = make_encoder(params.codec)?;

        let muxer = make(params.container.muxer_name())?;
        let sink = gst::ElementFactory::make("filesink")
            .property("location", params.output.to_string_lossy().to_string())
            .build()
            .map_err(|e| format!("Failed to create filesink: {}", e))?;

        let pipeline = gst::Pipeline::new();
        let elements = [
            &source,
            &queue,
            &convert,
            &resample,
            &capsfilter,
            &encoder,
            &muxer,
            &sink,
        ];
        pipeline
            .add_many(elements)
            .map_err(|e| format!("Failed to add audio elements: {}", e))?;
        gst::Element::link_many(elements).map_err(|_| "Failed to link audio recording chain".to_string())?;

        Ok(pipeline)
    }

    fn wrong_state(&self, operation: &str) -> String {
        format!("Cannot {} encoder in state {:?}", operation, self.state)
    }
}

impl AudioEncoder for GstAudioRecorder {
    fn configure(&mut self, params: &EncoderParams) -> Result<(), String> {
        if self.state != EncoderState::Created {
            return Err(self.wrong_state("configure"));
        }
        if let Some(parent) = params.output.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        self.pipeline = Some(self.build_pipeline(params)?);
        self.output = Some(params.output.clone());
        self.state = EncoderState::Configured;
        debug!(path = %params.output.display(), "Audio encoder configured");
        Ok(())
    }

    fn start(&mut self) -> Result<(), String> {
        let (EncoderState::Configured, Some(pipeline)) = (self.state, &self.pipeline) else {
            return Err(self.wrong_state("start"));
        };

        info!("Starting voice recording");
        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| format!("Failed to start recording: {}", e))?;

        let bus = pipeline.bus().ok_or("No bus available")?;
        let window = gst::ClockTime::from_mseconds(timing::START_ERROR_WINDOW.as_millis() as u64);
        if let Some(msg) = bus.timed_pop_filtered(window, &[gst::MessageType::Error, gst::MessageType::Warning]) {
            match msg.view() {
                gst::MessageView::Error(err) => {
                    error!(
                        error = %err.error(),
                        debug = ?err.debug(),
                        source = ?err.src().map(|s| s.name()),
                        "GStreamer error during start"
                    );
                    let _ = pipeline.set_state(gst::State::Null);
                    return Err(format!("Recording start error: {}", err.error()));
                }
                gst::MessageView::Warning(w) => {
                    warn!(
                        warning = %w.error(),
                        debug = ?w.debug(),
                        source = ?w.src().map(|s| s.name()),
                        "GStreamer warning during start"
                    );
                }
                _ => {}
            }
        }

        self.state = EncoderState::Recording;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), String> {
        let (EncoderState::Recording, Some(pipeline)) = (self.state, &self.pipeline) else {
            return Err(self.wrong_state("stop"));
        };
        self.state = EncoderState::Stopped;

        info!("Stopping voice recording");
        if !pipeline.send_event(gst::event::Eos::new()) {
            warn!("Failed to send EOS event to pipeline");
        }

        // The muxer writes the moov atom on EOS; the file is unplayable without it
        let bus = pipeline.bus().ok_or("No bus available")?;
        let timeout = gst::ClockTime::from_mseconds(timing::EOS_TIMEOUT.as_millis() as u64);
        let finished = match bus.timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error]) {
            Some(msg) => match msg.view() {
                gst::MessageView::Eos(..) => Ok(()),
                gst::MessageView::Error(err) => Err(format!("Recording error: {}", err.error())),
                _ => Ok(()),
            },
            None => Err("Timed out waiting for the recording to finish".to_string()),
        };

        pipeline
            .set_state(gst::State::Null)
            .map_err(|e| format!("Failed to stop pipeline: {}", e))?;
        finished?;

        if let Some(path) = &self.output {
            info!(path = %path.display(), "Recording saved");
        }
        Ok(())
    }
}

impl Release for GstAudioRecorder {
    fn release(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            debug!(state = ?self.state, "Releasing audio encoder");
            let _ = pipeline.set_state(gst::State::Null);
        }
        self.state = EncoderState::Released;
    }
}

/// Create the encoder element for a codec with its fixed settings
fn make_encoder(codec: AudioCodec) -> Result<gst::Element, String> {
    let factory = gst::ElementFactory::find(codec.element_name()).ok_or_else(|| {
        format!(
            "No {} encoder available. Please install gstreamer1-plugins-ugly",
            codec.caps_string()
        )
    })?;
    let encoder = match codec {
        AudioCodec::AmrNb => factory
            .create()
            .property_from_str("band-mode", audio::AMR_NB_BAND_MODE)
            .build(),
    }
    .map_err(|e| format!("Failed to create {}: {}", codec.element_name(), e))?;

    debug!(encoder = codec.element_name(), band_mode = audio::AMR_NB_BAND_MODE, "Configured encoder");
    Ok(encoder)
}

impl Drop for GstAudioRecorder {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_params() {
        let params = EncoderParams::speech(PathBuf::from("/tmp/recording_1.3gp"));
        assert_eq!(params.codec, AudioCodec::AmrNb);
        assert_eq!(params.channels.count(), 1);
        assert_eq!(params.sample_rate, 8_000);
        assert_eq!(params.container.extension(), "3gp");
    }

    #[test]
    fn test_codec_caps() {
        assert_eq!(AudioCodec::AmrNb.caps_string(), "audio/AMR");
        assert_eq!(AudioCodec::AmrNb.element_name(), "amrnbenc");
        assert_eq!(Container::ThreeGpp.muxer_name(), "3gppmux");
    }

    #[test]
    fn test_amr_encoder_uses_highest_band_mode() {
        if gst::init().is_err() || gst::ElementFactory::find("amrnbenc").is_none() {
            return;
        }
        let encoder = make_encoder(AudioCodec::AmrNb).unwrap();
        let mode = encoder.property_value("band-mode");
        let mode = gst::glib::EnumValue::from_value(&mode).map(|(_, value)| value.nick().to_string());
        assert_eq!(mode.as_deref(), Some(audio::AMR_NB_BAND_MODE));
    }

    #[test]
    fn test_lifecycle_is_enforced() {
        let mut recorder = GstAudioRecorder::new(None);
        assert!(recorder.start().is_err());
        assert!(recorder.stop().is_err());

        recorder.release();
        recorder.release();
        let params = EncoderParams::speech(std::env::temp_dir().join("notekit-never.3gp"));
        assert!(recorder.configure(&params).is_err());
    }
}
