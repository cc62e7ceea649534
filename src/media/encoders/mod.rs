// SPDX-License-Identifier: GPL-3.0-only

//! Media encoders
//!
//! Only speech recording is supported: mono AMR narrow-band in a 3GPP
//! container, the format phones use for voice memos.

pub mod audio;

pub use audio::{AudioChannels, AudioCodec, Container, EncoderParams, GstAudioRecorder};
