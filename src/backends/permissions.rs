// SPDX-License-Identifier: GPL-3.0-only

//! Device access gate for the camera and the microphone
//!
//! Inside a flatpak sandbox camera access goes through the XDG desktop
//! portal (`org.freedesktop.portal.Camera`), which shows the system prompt.
//! On a regular session access is granted when a usable device node exists
//! and the current user can open it. Grants are remembered for the lifetime
//! of the gate, like a runtime permission.

use super::audio::enumerate_audio_devices;
use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

/// A device capability that needs the user's consent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Camera,
    Microphone,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Camera => write!(f, "Camera"),
            Capability::Microphone => write!(f, "Microphone"),
        }
    }
}

/// Permission collaborator consumed by the session controllers
pub trait PermissionGate: Send + Sync {
    /// Whether the capability has already been granted
    fn is_granted(&self, capability: Capability) -> bool;

    /// Ask for the capability. Resolves exactly once with the user's answer.
    fn request(&self, capability: Capability) -> BoxFuture<'static, bool>;
}

/// Permission gate backed by the portal and device node checks
#[derive(Debug, Default)]
pub struct SystemPermissionGate {
    granted: Arc<Mutex<HashSet<Capability>>>,
    audio_device: Option<String>,
}

impl SystemPermissionGate {
    pub fn new(audio_device: Option<String>) -> Self {
        Self {
            granted: Arc::new(Mutex::new(HashSet::new())),
            audio_device,
        }
    }
}

impl PermissionGate for SystemPermissionGate {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted
            .lock()
            .map(|granted| granted.contains(&capability))
            .unwrap_or(false)
    }

    fn request(&self, capability: Capability) -> BoxFuture<'static, bool> {
        let granted = Arc::clone(&self.granted);
        let audio_device = self.audio_device.clone();

        async move {
            let allowed = match capability {
                Capability::Camera if is_sandboxed() => match request_portal_camera().await {
                    Ok(allowed) => allowed,
                    Err(e) => {
                        warn!(error = %e, "Camera portal request failed");
                        false
                    }
                },
                Capability::Camera => tokio::task::spawn_blocking(camera_nodes_accessible)
                    .await
                    .unwrap_or(false),
                Capability::Microphone => {
                    tokio::task::spawn_blocking(move || microphone_available(audio_device.as_deref()))
                        .await
                        .unwrap_or(false)
                }
            };

            info!(capability = %capability, allowed, "Permission request resolved");
            if allowed && let Ok(mut granted) = granted.lock() {
                granted.insert(capability);
            }
            allowed
        }
        .boxed()
    }
}

/// Running inside a flatpak sandbox
fn is_sandboxed() -> bool {
    Path::new("/.flatpak-info").exists()
}

/// At least one V4L2 capture node exists and is readable and writable
fn camera_nodes_accessible() -> bool {
    v4l::context::enum_devices()
        .iter()
        .any(|node| path_accessible(node.path()))
}

fn path_accessible(path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let accessible = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) } == 0;
    debug!(path = %path.display(), accessible, "Checked camera node access");
    accessible
}

/// An audio source exists (the configured one, when set)
fn microphone_available(audio_device: Option<&str>) -> bool {
    let devices = enumerate_audio_devices();
    match audio_device {
        Some(wanted) => devices
            .iter()
            .any(|d| d.node_name == wanted || d.serial == wanted),
        None => !devices.is_empty(),
    }
}

/// Ask the desktop portal for camera access
///
/// Subscribes to the `Response` signal on the predicted request path before
/// calling `AccessCamera`, so the answer cannot be missed.
async fn request_portal_camera() -> Result<bool, String> {
    let connection = zbus::Connection::session()
        .await
        .map_err(|e| format!("Failed to connect to session D-Bus: {}", e))?;

    let portal = zbus::Proxy::new(
        &connection,
        "org.freedesktop.portal.Desktop",
        "/org/freedesktop/portal/desktop",
        "org.freedesktop.portal.Camera",
    )
    .await
    .map_err(|e| format!("Failed to create camera portal proxy: {}", e))?;

    let present: bool = portal.get_property("IsCameraPresent").await.unwrap_or(true);
    if !present {
        info!("Camera portal reports no camera present");
        return Ok(false);
    }

    let sender = connection
        .unique_name()
        .ok_or("D-Bus connection has no unique name")?
        .as_str()
        .trim_start_matches(':')
        .replace('.', "_");
    let token = format!("notekit_{}", uuid::Uuid::new_v4().simple());
    let request_path = format!("/org/freedesktop/portal/desktop/request/{}/{}", sender, token);

    let request = zbus::Proxy::new(
        &connection,
        "org.freedesktop.portal.Desktop",
        request_path.as_str(),
        "org.freedesktop.portal.Request",
    )
    .await
    .map_err(|e| format!("Failed to create request proxy: {}", e))?;

    let mut responses = request
        .receive_signal("Response")
        .await
        .map_err(|e| format!("Failed to subscribe to portal response: {}", e))?;

    let mut options: HashMap<&str, Value> = HashMap::new();
    options.insert("handle_token", Value::new(token.as_str()));

    let handle: OwnedObjectPath = portal
        .call("AccessCamera", &(options,))
        .await
        .map_err(|e| format!("AccessCamera failed: {}", e))?;
    debug!(handle = %handle, "Camera portal request issued");

    let message = responses
        .next()
        .await
        .ok_or("Portal closed without answering")?;
    let (response, _results): (u32, HashMap<String, OwnedValue>) = message
        .body()
        .deserialize()
        .map_err(|e| format!("Malformed portal response: {}", e))?;

    // 0 = granted, 1 = cancelled by the user, 2 = other failure
    Ok(response == 0)
}
