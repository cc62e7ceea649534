// SPDX-License-Identifier: GPL-3.0-only

//! Microphone discovery through PipeWire
//!
//! Used by the permission gate (is there a microphone at all) and by the
//! recorder to turn a configured device into a `pipewiresrc` target.

use serde_json::Value;
use std::process::Command;
use tracing::{debug, warn};

/// An audio input device known to PipeWire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub serial: String,
    pub node_name: String,
    pub is_default: bool,
}

/// List audio sources, default device first, then by name
///
/// Returns an empty list when `pw-dump` is missing or its output cannot be
/// parsed.
pub fn enumerate_audio_devices() -> Vec<AudioDevice> {
    let output = match Command::new("pw-dump").output() {
        Ok(output) if output.status.success() => output,
        Ok(_) => {
            warn!("pw-dump exited with an error");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Failed to run pw-dump");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<Value>>(&output.stdout) {
        Ok(objects) => parse_audio_sources(&objects),
        Err(e) => {
            warn!(error = %e, "Failed to parse pw-dump output");
            Vec::new()
        }
    }
}

/// Extract `Audio/Source` nodes from a `pw-dump` object list
pub fn parse_audio_sources(objects: &[Value]) -> Vec<AudioDevice> {
    let default_source = default_source_name(objects);

    let mut devices: Vec<AudioDevice> = objects
        .iter()
        .filter_map(|object| object.pointer("/info/props"))
        .filter(|props| props.get("media.class").and_then(Value::as_str) == Some("Audio/Source"))
        .map(|props| {
            let text = |key: &str| props.get(key).and_then(Value::as_str);
            let node_name = text("node.name").unwrap_or_default().to_string();
            // object.serial is a number in recent PipeWire releases, a string in older ones
            let serial = match props.get("object.serial") {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => "0".to_string(),
            };

            let device = AudioDevice {
                name: text("node.nick")
                    .or_else(|| text("node.description"))
                    .or_else(|| text("node.name"))
                    .unwrap_or("Unknown Audio Device")
                    .to_string(),
                is_default: default_source.as_deref() == Some(node_name.as_str()),
                serial,
                node_name,
            };
            debug!(name = %device.name, serial = %device.serial, is_default = device.is_default, "Found audio input device");
            device
        })
        .collect();

    devices.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));
    devices
}

/// Node name of the default source from the `default` metadata object
fn default_source_name(objects: &[Value]) -> Option<String> {
    let metadata = objects.iter().find(|object| {
        object.get("type").and_then(Value::as_str) == Some("PipeWire:Interface:Metadata")
            && object.pointer("/props/metadata.name").and_then(Value::as_str) == Some("default")
    })?;

    metadata
        .get("metadata")?
        .as_array()?
        .iter()
        .filter(|entry| {
            matches!(
                entry.get("key").and_then(Value::as_str),
                Some("default.audio.source") | Some("default.configured.audio.source")
            )
        })
        .find_map(|entry| entry.pointer("/value/name").and_then(Value::as_str))
        .map(str::to_string)
}

/// Value for `pipewiresrc target-object` from a configured device id
///
/// Accepts `pipewire-serial-<serial>`, `pipewire-<node name>` or a bare node name.
pub fn pipewire_target(device: &str) -> &str {
    device
        .strip_prefix("pipewire-serial-")
        .or_else(|| device.strip_prefix("pipewire-"))
        .unwrap_or(device)
}
