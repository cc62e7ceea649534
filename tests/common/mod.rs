// SPDX-License-Identifier: GPL-3.0-only

//! In-memory collaborators for driving the session controllers

#![allow(dead_code)]

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{BoxFuture, join_all};
use notekit::app::Task;
use notekit::backends::camera::{
    BackendError, BackendResult, BindingHandle, CameraProvider, LensFacing, PreviewSink,
};
use notekit::backends::permissions::{Capability, PermissionGate};
use notekit::backends::scanner::{BarcodeRecognizer, ScanOutcome, ScanRequest};
use notekit::media::{AudioBackend, AudioDecoder, AudioEncoder, EncoderParams, Release, StreamEnd};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Resolve every future of a task and return the produced messages
pub fn run<M: Send + 'static>(task: Task<M>) -> Vec<M> {
    futures::executor::block_on(join_all(task.into_futures()))
}

/// Feed messages back into `update` until no task is left
pub fn settle<M: Send + 'static>(task: Task<M>, mut update: impl FnMut(M) -> Task<M>) {
    let mut pending = vec![task];
    while let Some(task) = pending.pop() {
        for message in run(task) {
            pending.push(update(message));
        }
    }
}

/// Fresh directory under the system temp dir
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("notekit-{}-{}", name, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Default)]
pub struct FakeGate {
    granted: Mutex<HashSet<Capability>>,
    answer: AtomicBool,
    pub requests: AtomicUsize,
}

impl FakeGate {
    /// Everything already granted
    pub fn granted() -> Arc<Self> {
        let gate = Self::default();
        {
            let mut granted = gate.granted.lock().unwrap();
            granted.insert(Capability::Camera);
            granted.insert(Capability::Microphone);
        }
        Arc::new(gate)
    }

    /// Nothing granted yet; requests resolve with `answer`
    pub fn answering(answer: bool) -> Arc<Self> {
        let gate = Self::default();
        gate.answer.store(answer, Ordering::SeqCst);
        Arc::new(gate)
    }
}

impl PermissionGate for FakeGate {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted.lock().unwrap().contains(&capability)
    }

    fn request(&self, capability: Capability) -> BoxFuture<'static, bool> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer.load(Ordering::SeqCst);
        if answer {
            self.granted.lock().unwrap().insert(capability);
        }
        futures::future::ready(answer).boxed()
    }
}

#[derive(Default)]
pub struct FakeCamera {
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub binds: Mutex<Vec<LensFacing>>,
    pub unbinds: AtomicUsize,
    pub captures: AtomicUsize,
    pub fail_bind: AtomicBool,
    /// Error for the next capture instead of success
    pub capture_error: Mutex<Option<String>>,
}

impl FakeCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn bind_count(&self) -> usize {
        self.binds.lock().unwrap().len()
    }
}

impl CameraProvider for FakeCamera {
    fn bind(&self, facing: LensFacing, _preview: PreviewSink) -> BackendResult<BindingHandle> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(BackendError::DeviceNotFound(format!("no {} camera", facing)));
        }
        if self.live() > 0 {
            return Err(BackendError::AlreadyBound);
        }
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        let mut binds = self.binds.lock().unwrap();
        binds.push(facing);
        Ok(BindingHandle(binds.len() as u64))
    }

    fn unbind_all(&self) -> BackendResult<()> {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
        self.live.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn capture(&self, output: PathBuf) -> BoxFuture<'static, Result<PathBuf, String>> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let result = match self.capture_error.lock().unwrap().take() {
            Some(message) => Err(message),
            None => Ok(output),
        };
        futures::future::ready(result).boxed()
    }
}

/// Counters shared by every resource the fake backend creates
#[derive(Default)]
pub struct AudioLog {
    pub encoders: AtomicUsize,
    pub encoder_starts: AtomicUsize,
    pub encoder_stops: AtomicUsize,
    pub encoder_releases: AtomicUsize,
    pub fail_encoder_stop: AtomicBool,
    pub opens: AtomicUsize,
    pub decoder_starts: AtomicUsize,
    pub pauses: AtomicUsize,
    pub decoder_stops: AtomicUsize,
    pub decoder_releases: AtomicUsize,
    pub configured: Mutex<Vec<EncoderParams>>,
    /// Completion senders of every decoder, oldest first
    pub completions: Mutex<Vec<oneshot::Sender<StreamEnd>>>,
}

impl AudioLog {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// End the stream of the most recent decoder
    pub fn finish_stream(&self, end: StreamEnd) {
        if let Some(sender) = self.completions.lock().unwrap().pop() {
            let _ = sender.send(end);
        }
    }
}

#[derive(Default)]
pub struct FakeAudioBackend {
    pub log: Arc<AudioLog>,
}

impl FakeAudioBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl AudioBackend for FakeAudioBackend {
    fn create_encoder(&self) -> Box<dyn AudioEncoder> {
        self.log.encoders.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeEncoder {
            log: Arc::clone(&self.log),
            released: false,
        })
    }

    fn create_decoder(&self) -> Box<dyn AudioDecoder> {
        Box::new(FakeDecoder {
            log: Arc::clone(&self.log),
            released: false,
        })
    }
}

struct FakeEncoder {
    log: Arc<AudioLog>,
    released: bool,
}

impl AudioEncoder for FakeEncoder {
    fn configure(&mut self, params: &EncoderParams) -> Result<(), String> {
        self.log.configured.lock().unwrap().push(params.clone());
        Ok(())
    }

    fn start(&mut self) -> Result<(), String> {
        self.log.encoder_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), String> {
        self.log.encoder_stops.fetch_add(1, Ordering::SeqCst);
        if self.log.fail_encoder_stop.load(Ordering::SeqCst) {
            return Err("muxer did not finish".to_string());
        }
        Ok(())
    }
}

impl Release for FakeEncoder {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.encoder_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FakeDecoder {
    log: Arc<AudioLog>,
    released: bool,
}

impl AudioDecoder for FakeDecoder {
    fn open(&mut self, _path: &Path) -> Result<(), String> {
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn start(&mut self) -> Result<(), String> {
        self.log.decoder_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), String> {
        self.log.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), String> {
        self.log.decoder_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn completion(&mut self) -> BoxFuture<'static, StreamEnd> {
        let (sender, receiver) = oneshot::channel();
        self.log.completions.lock().unwrap().push(sender);
        receiver.map(|end| end.unwrap_or(StreamEnd::Aborted)).boxed()
    }
}

impl Release for FakeDecoder {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.decoder_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Recognizer answering from a queue of outcomes
#[derive(Default)]
pub struct FakeRecognizer {
    pub outcomes: Mutex<VecDeque<ScanOutcome>>,
    pub requests: Mutex<Vec<ScanRequest>>,
    pub cancels: AtomicUsize,
}

impl FakeRecognizer {
    pub fn answering(outcomes: impl IntoIterator<Item = ScanOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        })
    }
}

impl BarcodeRecognizer for FakeRecognizer {
    fn scan(&self, request: ScanRequest) -> BoxFuture<'static, ScanOutcome> {
        self.requests.lock().unwrap().push(request);
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScanOutcome::Cancelled);
        futures::future::ready(outcome).boxed()
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
