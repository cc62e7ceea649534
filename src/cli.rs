// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! Each command drives the same session controllers as the terminal
//! interface, so permissions, file naming and notices behave identically:
//! - Listing cameras and microphones
//! - Taking photos and managing the gallery
//! - Recording and playing voice memos
//! - Scanning QR codes from the camera or an image file

use chrono::{DateTime, Local};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use notekit::app::{
    CameraMessage, CaptureSession, Collaborators, Notice, RecordingMessage, RecordingSession,
    ScanMessage, ScanSession, Task,
};
use notekit::backends::audio::enumerate_audio_devices;
use notekit::backends::camera::devices::enumerate_video_nodes;
use notekit::backends::camera::{LensFacing, preview_channel};
use notekit::backends::scanner::{
    BarcodeRecognizer, CameraQrRecognizer, ImageQrRecognizer, ScanOutcome,
};
use notekit::config::Config;
use notekit::storage::{self, GalleryEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// List cameras and microphones
pub fn list_devices() -> CliResult {
    let cameras = enumerate_video_nodes();
    if cameras.is_empty() {
        println!("No cameras found.");
    } else {
        println!("Cameras (first is front, second is back):");
        for node in &cameras {
            println!("  [{}] {} ({})", node.index, node.name, node.path.display());
        }
    }
    println!();

    let microphones = enumerate_audio_devices();
    if microphones.is_empty() {
        println!("No microphones found.");
    } else {
        println!("Microphones:");
        for device in &microphones {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("  pipewire-serial-{}  {}{}", device.serial, device.name, marker);
        }
    }
    Ok(())
}

/// Take a photo
pub fn take_photo(front: bool, output: Option<PathBuf>) -> CliResult {
    let config = Config::load();
    let facing = if front {
        LensFacing::Front
    } else {
        config.initial_lens_facing
    };
    let (preview, _) = preview_channel();
    let collaborators = Collaborators::system(&config, Arc::clone(&preview));
    let mut session = CaptureSession::new(
        collaborators.camera,
        collaborators.permissions,
        storage::photos_dir(&config),
        facing,
        preview,
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let task = session.update(CameraMessage::Activate);
        drive(task, None, |msg| session.update(msg)).await;
    });
    report(session.take_notices())?;

    if !session.is_bound() {
        return Err("Camera is not available".into());
    }
    println!("Capturing with the {} camera...", session.lens_facing());

    runtime.block_on(async {
        let task = session.update(CameraMessage::Capture);
        drive(task, None, |msg| session.update(msg)).await;
    });
    let notices = session.take_notices();
    let saved = session.last_photo().cloned();
    session.deactivate();
    report(notices)?;

    let Some(saved) = saved else {
        return Err("No photo was saved".into());
    };
    let path = match output {
        Some(target) => {
            move_file(&saved, &target)?;
            target
        }
        None => saved,
    };
    println!("Photo saved to: {}", path.display());
    Ok(())
}

/// List gallery photos, newest first
pub fn list_gallery() -> CliResult {
    let config = Config::load();
    let dir = storage::photos_dir(&config);
    let entries = storage::list_gallery(&dir, config.gallery_extensions.as_slice());

    if entries.is_empty() {
        println!("No photos in {}", dir.display());
        return Ok(());
    }

    println!("Photos in {}:", dir.display());
    for entry in &entries {
        let modified: DateTime<Local> = entry.modified.into();
        println!("  {}  {}", modified.format("%Y-%m-%d %H:%M:%S"), entry.name());
    }
    Ok(())
}

/// Delete one photo
pub fn delete_photo(path: PathBuf) -> CliResult {
    let entry = GalleryEntry {
        path,
        modified: SystemTime::now(),
    };
    if storage::delete_entry(&entry) {
        println!("Deleted {}", entry.path.display());
        Ok(())
    } else {
        Err(format!("Could not delete {}", entry.path.display()).into())
    }
}

/// Record a voice memo for `duration` seconds or until Ctrl+C
pub fn record(duration: u64) -> CliResult {
    let config = Config::load();
    let collaborators = Collaborators::system(&config, preview_channel().0);
    let mut session = RecordingSession::new(
        collaborators.audio,
        collaborators.permissions,
        storage::recordings_dir(&config),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let task = session.update(RecordingMessage::ToggleRecord);
        drive(task, None, |msg| session.update(msg)).await;
    });
    report(session.take_notices())?;

    let Some(path) = session.recording_path().map(Path::to_path_buf) else {
        return Err("Recording did not start".into());
    };
    println!("Recording to: {}", path.display());
    println!("Press Ctrl+C to stop early.");

    let stop_flag = stop_on_interrupt()?;
    let start = Instant::now();
    let limit = Duration::from_secs(duration);
    while start.elapsed() < limit && !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
        print!("\rRecording... {:.1}s", start.elapsed().as_secs_f32());
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
    println!();

    let _ = session.update(RecordingMessage::ToggleRecord);
    report(session.take_notices())?;

    match session.output_path() {
        Some(saved) => {
            println!("Recording saved to: {}", saved.display());
            Ok(())
        }
        None => Err("Recording was not saved".into()),
    }
}

/// Play a recording to the end, or until Ctrl+C
pub fn play(path: Option<PathBuf>) -> CliResult {
    let config = Config::load();
    let recordings = storage::recordings_dir(&config);
    let path = path.or_else(|| storage::latest_recording(&recordings));
    let collaborators = Collaborators::system(&config, preview_channel().0);
    let mut session = RecordingSession::new(
        collaborators.audio,
        collaborators.permissions,
        recordings,
    )
    .with_output_path(path);

    if let Some(path) = session.output_path() {
        println!("Playing {}", path.display());
    }

    let stop_flag = stop_on_interrupt()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let task = session.update(RecordingMessage::TogglePlay);
        let interrupt = (stop_flag, RecordingMessage::Stop);
        drive(task, Some(interrupt), |msg| session.update(msg)).await;
    });
    report(session.take_notices())
}

/// Scan a QR code from an image file, or from the camera until found,
/// timed out or interrupted
pub fn scan(image: Option<PathBuf>, auto_zoom: bool) -> CliResult {
    let config = Config::load();
    let mut request = config.scan_request();
    request.auto_zoom = auto_zoom;

    let collaborators = Collaborators::system(&config, preview_channel().0);
    let recognizer: Arc<dyn BarcodeRecognizer> = match image {
        Some(path) => Arc::new(ImageQrRecognizer::new(path)),
        None => {
            println!("Point the camera at a code. Press Ctrl+C to cancel.");
            Arc::new(CameraQrRecognizer::new(
                config.back_camera.clone(),
                config.scan_timeout(),
            ))
        }
    };
    let mut session = ScanSession::new(recognizer, collaborators.permissions, request);

    let stop_flag = stop_on_interrupt()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let task = session.update(ScanMessage::Scan);
        let interrupt = (stop_flag, ScanMessage::Cancel);
        drive(task, Some(interrupt), |msg| session.update(msg)).await;
    });
    let notices = session.take_notices();

    match session.last_outcome() {
        Some(ScanOutcome::Decoded(text)) => {
            println!("{}", text);
            Ok(())
        }
        Some(ScanOutcome::Cancelled) => {
            println!("Scan cancelled.");
            Ok(())
        }
        _ => report(notices),
    }
}

/// Run a task and every task its messages produce, until none is left.
///
/// When `interrupt` is given, its message is fed to `update` once after the
/// flag goes up.
async fn drive<M: Send + 'static>(
    task: Task<M>,
    interrupt: Option<(Arc<AtomicBool>, M)>,
    mut update: impl FnMut(M) -> Task<M>,
) {
    let mut pending: FuturesUnordered<_> = task.into_futures().into_iter().collect();
    let mut interrupt = interrupt;

    while !pending.is_empty() {
        tokio::select! {
            Some(message) = pending.next() => {
                pending.extend(update(message).into_futures());
            }
            _ = tokio::time::sleep(Duration::from_millis(100)), if interrupt.is_some() => {
                let raised = interrupt
                    .as_ref()
                    .is_some_and(|(flag, _)| flag.load(Ordering::SeqCst));
                if raised && let Some((_, message)) = interrupt.take() {
                    pending.extend(update(message).into_futures());
                }
            }
            else => break,
        }
    }
}

/// Print notices; the first error notice becomes the command's error
fn report(notices: Vec<Notice>) -> CliResult {
    let mut failure = None;
    for notice in notices {
        if notice.is_error() {
            eprintln!("Error: {}", notice.text);
            failure.get_or_insert(notice.text);
        } else {
            println!("{}", notice.text);
        }
    }
    match failure {
        Some(text) => Err(text.into()),
        None => Ok(()),
    }
}

fn stop_on_interrupt() -> Result<Arc<AtomicBool>, Box<dyn std::error::Error>> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;
    Ok(stop_flag)
}

/// Rename, falling back to copy and delete across filesystems
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}
