// SPDX-License-Identifier: GPL-3.0-only

//! Media decoders

pub mod audio;

pub use audio::GstAudioPlayer;
