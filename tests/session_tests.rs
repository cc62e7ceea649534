// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture, recording and scan controllers

mod common;

use common::{
    AudioLog, FakeAudioBackend, FakeCamera, FakeGate, FakeRecognizer, run, settle, temp_dir,
};
use notekit::app::{
    CameraMessage, CaptureSession, CaptureState, PlayerStatus, RecorderStatus, RecordingMessage,
    RecordingSession, ScanMessage, ScanSession,
};
use notekit::backends::camera::{LensFacing, preview_channel};
use notekit::backends::scanner::{ScanOutcome, ScanRequest};
use notekit::media::{AudioChannels, AudioCodec, Container, StreamEnd};
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn capture_session(camera: &Arc<FakeCamera>, gate: Arc<FakeGate>) -> CaptureSession {
    CaptureSession::new(
        camera.clone(),
        gate,
        temp_dir("photos"),
        LensFacing::Back,
        preview_channel().0,
    )
}

fn recording_session(backend: &Arc<FakeAudioBackend>, gate: Arc<FakeGate>) -> RecordingSession {
    RecordingSession::new(backend.clone(), gate, temp_dir("recordings"))
}

fn count(counter: &std::sync::atomic::AtomicUsize) -> usize {
    AudioLog::count(counter)
}

// Capture session

#[test]
fn test_activate_binds_current_facing() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());

    let task = session.update(CameraMessage::Activate);
    assert!(task.is_none());
    assert!(matches!(
        session.state(),
        CaptureState::Bound {
            facing: LensFacing::Back,
            ..
        }
    ));
    assert_eq!(camera.live(), 1);
}

#[test]
fn test_toggle_lens_parity_with_single_binding() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());
    let _ = session.update(CameraMessage::Activate);

    for toggles in 1..=7 {
        let _ = session.update(CameraMessage::ToggleLens);
        let expected = if toggles % 2 == 1 {
            LensFacing::Front
        } else {
            LensFacing::Back
        };

        assert_eq!(session.lens_facing(), expected);
        assert!(matches!(session.state(), CaptureState::Bound { facing, .. } if facing == expected));
        assert_eq!(camera.live(), 1);
        assert!(session.take_notices().is_empty());
    }

    assert_eq!(camera.max_live.load(Ordering::SeqCst), 1);
    assert_eq!(camera.bind_count(), 8);
}

#[test]
fn test_toggle_lens_requires_binding() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());

    let _ = session.update(CameraMessage::ToggleLens);
    assert_eq!(session.lens_facing(), LensFacing::Back);
    assert_eq!(camera.bind_count(), 0);

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
}

#[test]
fn test_capture_while_pending_is_rejected() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());
    let _ = session.update(CameraMessage::Activate);

    let first = session.update(CameraMessage::Capture);
    assert!(session.capture_pending());
    let second = session.update(CameraMessage::Capture);
    assert!(second.is_none());
    assert_eq!(camera.captures.load(Ordering::SeqCst), 1);
    assert!(session.take_notices().iter().all(|n| n.is_error()));

    let messages = run(first);
    assert_eq!(messages.len(), 1);
    for message in messages {
        let _ = session.update(message);
    }

    assert!(!session.capture_pending());
    let saved = session.last_photo().cloned().unwrap();
    assert_eq!(saved.parent(), Some(session.photos_dir().as_path()));
    assert!(saved.to_string_lossy().ends_with(".jpg"));

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(!notices[0].is_error());

    // A new capture is accepted once the first one resolved
    let third = session.update(CameraMessage::Capture);
    assert!(!third.is_none());
}

#[test]
fn test_capture_failure_becomes_notice() {
    let camera = FakeCamera::new();
    *camera.capture_error.lock().unwrap() = Some("sensor timeout".to_string());
    let mut session = capture_session(&camera, FakeGate::granted());
    let _ = session.update(CameraMessage::Activate);

    let task = session.update(CameraMessage::Capture);
    settle(task, |msg| session.update(msg));

    assert!(!session.capture_pending());
    assert!(session.last_photo().is_none());
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
    assert!(notices[0].text.contains("sensor timeout"));
}

#[test]
fn test_saved_notice_shows_full_path() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());
    let _ = session.update(CameraMessage::Activate);

    let task = session.update(CameraMessage::Capture);
    settle(task, |msg| session.update(msg));

    let saved = session.last_photo().cloned().unwrap();
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].text.contains(&saved.display().to_string()));
}

#[test]
fn test_capture_requires_binding() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());

    assert!(session.update(CameraMessage::Capture).is_none());
    assert_eq!(camera.captures.load(Ordering::SeqCst), 0);
    assert!(session.take_notices()[0].is_error());
}

#[test]
fn test_permission_granted_then_bound() {
    let camera = FakeCamera::new();
    let gate = FakeGate::answering(true);
    let mut session = capture_session(&camera, gate.clone());

    let task = session.update(CameraMessage::Activate);
    assert_eq!(session.state(), CaptureState::AwaitingPermission);

    // A second activate while the request is in flight does nothing
    assert!(session.update(CameraMessage::Activate).is_none());
    assert_eq!(gate.requests.load(Ordering::SeqCst), 1);

    settle(task, |msg| session.update(msg));
    assert!(session.is_bound());
    assert_eq!(camera.live(), 1);
}

#[test]
fn test_permission_denied_stays_unbound() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::answering(false));

    let task = session.update(CameraMessage::Activate);
    settle(task, |msg| session.update(msg));

    assert_eq!(session.state(), CaptureState::Unbound);
    assert_eq!(camera.bind_count(), 0);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_error());
}

#[test]
fn test_late_permission_answer_after_deactivate_is_discarded() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::answering(true));

    let task = session.update(CameraMessage::Activate);
    session.deactivate();
    settle(task, |msg| session.update(msg));

    assert_eq!(session.state(), CaptureState::Unbound);
    assert_eq!(camera.bind_count(), 0);
}

#[test]
fn test_capture_result_after_deactivate_is_discarded() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());
    let _ = session.update(CameraMessage::Activate);

    let task = session.update(CameraMessage::Capture);
    session.deactivate();
    settle(task, |msg| session.update(msg));

    assert!(session.last_photo().is_none());
    assert!(session.take_notices().is_empty());
}

#[test]
fn test_bind_failure_leaves_unbound_with_notice() {
    let camera = FakeCamera::new();
    camera.fail_bind.store(true, Ordering::SeqCst);
    let mut session = capture_session(&camera, FakeGate::granted());

    let _ = session.update(CameraMessage::Activate);
    assert_eq!(session.state(), CaptureState::Unbound);
    assert!(session.take_notices()[0].is_error());
}

#[test]
fn test_deactivate_is_idempotent() {
    let camera = FakeCamera::new();
    let mut session = capture_session(&camera, FakeGate::granted());
    let _ = session.update(CameraMessage::Activate);

    session.deactivate();
    session.deactivate();
    assert_eq!(session.state(), CaptureState::Unbound);
    assert_eq!(camera.live(), 0);
    assert_eq!(camera.unbinds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropping_session_unbinds() {
    let camera = FakeCamera::new();
    {
        let mut session = capture_session(&camera, FakeGate::granted());
        let _ = session.update(CameraMessage::Activate);
        assert_eq!(camera.live(), 1);
    }
    assert_eq!(camera.live(), 0);
}

// Recording session

#[test]
fn test_recording_uses_speech_parameters() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::granted());

    let _ = session.update(RecordingMessage::ToggleRecord);
    assert_eq!(session.recorder_status(), RecorderStatus::Recording);

    let configured = backend.log.configured.lock().unwrap();
    let params = &configured[0];
    assert_eq!(params.codec, AudioCodec::AmrNb);
    assert_eq!(params.channels, AudioChannels::Mono);
    assert_eq!(params.container, Container::ThreeGpp);
    let name = params.output.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("recording_"));
    assert!(name.ends_with(".3gp"));
}

#[test]
fn test_output_path_tracks_most_recent_recording() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::granted());
    assert!(session.output_path().is_none());

    let _ = session.update(RecordingMessage::ToggleRecord);
    // Not set until the recording stops
    assert!(session.output_path().is_none());
    let _ = session.update(RecordingMessage::ToggleRecord);
    let first = session.output_path().map(|p| p.to_path_buf());
    assert!(first.is_some());

    std::thread::sleep(std::time::Duration::from_millis(2));
    let _ = session.update(RecordingMessage::ToggleRecord);
    let second = session.recording_path().map(|p| p.to_path_buf());
    let _ = session.update(RecordingMessage::ToggleRecord);

    assert_eq!(session.recorder_status(), RecorderStatus::Idle);
    assert_eq!(session.output_path().map(|p| p.to_path_buf()), second);
    assert_ne!(first, second);
    assert_eq!(count(&backend.log.encoder_releases), 2);
}

#[test]
fn test_failed_stop_still_releases_encoder() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::granted());

    let _ = session.update(RecordingMessage::ToggleRecord);
    backend.log.fail_encoder_stop.store(true, Ordering::SeqCst);
    let _ = session.update(RecordingMessage::ToggleRecord);

    assert_eq!(session.recorder_status(), RecorderStatus::Idle);
    assert!(session.output_path().is_none());
    assert_eq!(count(&backend.log.encoder_releases), 1);
    assert!(session.take_notices().iter().any(|n| n.is_error()));
}

#[test]
fn test_forced_hide_releases_encoder() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::granted());

    let _ = session.update(RecordingMessage::ToggleRecord);
    session.teardown();

    assert_eq!(session.recorder_status(), RecorderStatus::Idle);
    assert_eq!(count(&backend.log.encoder_releases), 1);
    assert_eq!(count(&backend.log.encoders), 1);
}

#[test]
fn test_microphone_denied_keeps_idle() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::answering(false));

    let task = session.update(RecordingMessage::ToggleRecord);
    settle(task, |msg| session.update(msg));

    assert_eq!(session.recorder_status(), RecorderStatus::Idle);
    assert_eq!(count(&backend.log.encoders), 0);
    assert!(session.take_notices()[0].is_error());
}

#[test]
fn test_microphone_granted_starts_recording() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::answering(true));

    let task = session.update(RecordingMessage::ToggleRecord);
    assert_eq!(session.recorder_status(), RecorderStatus::Idle);
    settle(task, |msg| session.update(msg));

    assert_eq!(session.recorder_status(), RecorderStatus::Recording);
    assert_eq!(count(&backend.log.encoder_starts), 1);
}

fn session_with_recording(backend: &Arc<FakeAudioBackend>) -> RecordingSession {
    let dir = temp_dir("playback");
    let file = dir.join("recording_1.3gp");
    std::fs::write(&file, b"#!AMR").unwrap();
    RecordingSession::new(backend.clone(), FakeGate::granted(), dir).with_output_path(Some(file))
}

#[test]
fn test_pause_and_resume_keeps_decoder() {
    let backend = FakeAudioBackend::new();
    let mut session = session_with_recording(&backend);

    let _ = session.update(RecordingMessage::TogglePlay);
    assert_eq!(session.player_status(), PlayerStatus::Playing);
    let _ = session.update(RecordingMessage::TogglePlay);
    assert_eq!(session.player_status(), PlayerStatus::Paused);
    let _ = session.update(RecordingMessage::TogglePlay);
    assert_eq!(session.player_status(), PlayerStatus::Playing);

    assert_eq!(count(&backend.log.opens), 1);
    assert_eq!(count(&backend.log.pauses), 1);
    assert_eq!(count(&backend.log.decoder_starts), 2);
    assert_eq!(count(&backend.log.decoder_releases), 0);
}

#[test]
fn test_end_of_stream_matches_stop() {
    let backend = FakeAudioBackend::new();
    let mut session = session_with_recording(&backend);

    let task = session.update(RecordingMessage::TogglePlay);
    backend.log.finish_stream(StreamEnd::Completed);
    settle(task, |msg| session.update(msg));

    assert_eq!(session.player_status(), PlayerStatus::Idle);
    assert_eq!(count(&backend.log.decoder_releases), 1);
    assert!(session.can_play());
    assert!(!session.can_stop());

    let _ = session.update(RecordingMessage::TogglePlay);
    let _ = session.update(RecordingMessage::Stop);
    assert_eq!(session.player_status(), PlayerStatus::Idle);
    assert_eq!(count(&backend.log.decoder_releases), 2);
    assert_eq!(count(&backend.log.opens), 2);
}

#[test]
fn test_stop_while_paused_releases_without_stop() {
    let backend = FakeAudioBackend::new();
    let mut session = session_with_recording(&backend);

    let _ = session.update(RecordingMessage::TogglePlay);
    let _ = session.update(RecordingMessage::TogglePlay);
    let _ = session.update(RecordingMessage::Stop);

    assert_eq!(session.player_status(), PlayerStatus::Idle);
    assert_eq!(count(&backend.log.decoder_stops), 0);
    assert_eq!(count(&backend.log.decoder_releases), 1);
}

#[test]
fn test_completion_after_stop_is_discarded() {
    let backend = FakeAudioBackend::new();
    let mut session = session_with_recording(&backend);

    let first = session.update(RecordingMessage::TogglePlay);
    let _ = session.update(RecordingMessage::Stop);
    let _second = session.update(RecordingMessage::TogglePlay);
    let _ = session.take_notices();

    // The first decoder's stream ends late
    let stale = backend.log.completions.lock().unwrap().remove(0);
    let _ = stale.send(StreamEnd::Completed);
    settle(first, |msg| session.update(msg));

    assert_eq!(session.player_status(), PlayerStatus::Playing);
    assert!(session.take_notices().is_empty());
}

#[test]
fn test_play_without_recording_is_informational() {
    let backend = FakeAudioBackend::new();
    let mut session = recording_session(&backend, FakeGate::granted());

    assert!(session.update(RecordingMessage::TogglePlay).is_none());
    assert_eq!(session.player_status(), PlayerStatus::Idle);
    assert_eq!(count(&backend.log.opens), 0);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(!notices[0].is_error());
}

#[test]
fn test_play_rejected_while_recording() {
    let backend = FakeAudioBackend::new();
    let mut session = session_with_recording(&backend);

    let _ = session.update(RecordingMessage::ToggleRecord);
    assert!(!session.can_play());
    let _ = session.update(RecordingMessage::TogglePlay);

    assert_eq!(session.player_status(), PlayerStatus::Idle);
    assert_eq!(count(&backend.log.opens), 0);
}

#[test]
fn test_teardown_forces_both_machines_idle() {
    let backend = FakeAudioBackend::new();
    let mut session = session_with_recording(&backend);

    let _ = session.update(RecordingMessage::TogglePlay);
    session.teardown();
    let _ = session.update(RecordingMessage::ToggleRecord);
    session.teardown();

    assert_eq!(session.player_status(), PlayerStatus::Idle);
    assert_eq!(session.recorder_status(), RecorderStatus::Idle);
    assert_eq!(count(&backend.log.decoder_releases), 1);
    assert_eq!(count(&backend.log.encoder_releases), 1);
}

#[test]
fn test_dropping_session_releases_resources() {
    let backend = FakeAudioBackend::new();
    {
        let mut session = session_with_recording(&backend);
        let _ = session.update(RecordingMessage::TogglePlay);
    }
    assert_eq!(count(&backend.log.decoder_releases), 1);
}

// Scan session

#[test]
fn test_cancelled_scan_then_independent_second_outcome() {
    let recognizer = FakeRecognizer::answering([
        ScanOutcome::Cancelled,
        ScanOutcome::Decoded("https://example.org/notes".to_string()),
    ]);
    let mut session = ScanSession::new(
        recognizer.clone(),
        FakeGate::granted(),
        ScanRequest::default(),
    );

    let task = session.update(ScanMessage::Scan);
    settle(task, |msg| session.update(msg));
    assert_eq!(session.last_outcome(), Some(&ScanOutcome::Cancelled));
    assert!(!session.is_scanning());

    let task = session.update(ScanMessage::Scan);
    settle(task, |msg| session.update(msg));
    assert_eq!(
        session.last_outcome(),
        Some(&ScanOutcome::Decoded("https://example.org/notes".to_string()))
    );
    assert_eq!(recognizer.requests.lock().unwrap().len(), 2);
}

#[test]
fn test_scan_failure_becomes_notice() {
    let recognizer = FakeRecognizer::answering([ScanOutcome::Failed("no camera".to_string())]);
    let mut session = ScanSession::new(recognizer, FakeGate::granted(), ScanRequest::default());

    let task = session.update(ScanMessage::Scan);
    settle(task, |msg| session.update(msg));

    assert!(matches!(session.last_outcome(), Some(ScanOutcome::Failed(_))));
    assert!(session.take_notices()[0].is_error());
}

#[test]
fn test_second_scan_while_scanning_is_rejected() {
    let recognizer = FakeRecognizer::answering([ScanOutcome::Cancelled]);
    let mut session = ScanSession::new(
        recognizer.clone(),
        FakeGate::granted(),
        ScanRequest::default(),
    );

    let _first = session.update(ScanMessage::Scan);
    assert!(session.update(ScanMessage::Scan).is_none());
    assert_eq!(recognizer.requests.lock().unwrap().len(), 1);
    assert!(session.take_notices()[0].is_error());
}

#[test]
fn test_cancel_forwards_to_recognizer() {
    let recognizer = FakeRecognizer::answering([ScanOutcome::Cancelled]);
    let mut session = ScanSession::new(
        recognizer.clone(),
        FakeGate::granted(),
        ScanRequest::default(),
    );

    let task = session.update(ScanMessage::Scan);
    let _ = session.update(ScanMessage::Cancel);
    assert_eq!(recognizer.cancels.load(Ordering::SeqCst), 1);

    settle(task, |msg| session.update(msg));
    assert_eq!(session.last_outcome(), Some(&ScanOutcome::Cancelled));
}

#[test]
fn test_cancel_while_awaiting_permission() {
    let recognizer = FakeRecognizer::answering([ScanOutcome::Decoded("late".to_string())]);
    let mut session = ScanSession::new(
        recognizer.clone(),
        FakeGate::answering(true),
        ScanRequest::default(),
    );

    let task = session.update(ScanMessage::Scan);
    let _ = session.update(ScanMessage::Cancel);
    assert_eq!(session.last_outcome(), Some(&ScanOutcome::Cancelled));

    // The grant arrives after the cancel and must not start a scan
    settle(task, |msg| session.update(msg));
    assert!(recognizer.requests.lock().unwrap().is_empty());
    assert!(!session.is_scanning());
}

#[test]
fn test_scan_outcome_after_teardown_is_discarded() {
    let recognizer = FakeRecognizer::answering([ScanOutcome::Decoded("stale".to_string())]);
    let mut session = ScanSession::new(recognizer, FakeGate::granted(), ScanRequest::default());

    let task = session.update(ScanMessage::Scan);
    session.teardown();
    settle(task, |msg| session.update(msg));

    assert!(session.last_outcome().is_none());
    assert!(!session.is_scanning());
}
