// SPDX-License-Identifier: GPL-3.0-only

//! Scan session controller
//!
//! Each scan is one request to the recognizer and ends in exactly one
//! outcome. Only the in-flight flag and the last outcome are kept, for
//! display; nothing carries over into the next scan.

use super::notice::Notice;
use super::task::Task;
use crate::backends::permissions::{Capability, PermissionGate};
use crate::backends::scanner::{BarcodeRecognizer, ScanOutcome, ScanRequest};
use crate::errors::{SessionError, SessionResult};
use crate::fl;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum ScanMessage {
    Scan,
    Cancel,
    PermissionAnswered { generation: u64, granted: bool },
    Finished { generation: u64, outcome: ScanOutcome },
}

pub struct ScanSession {
    recognizer: Arc<dyn BarcodeRecognizer>,
    permissions: Arc<dyn PermissionGate>,
    request: ScanRequest,
    scanning: bool,
    awaiting_permission: bool,
    generation: u64,
    last_outcome: Option<ScanOutcome>,
    notices: Vec<Notice>,
}

impl ScanSession {
    pub fn new(
        recognizer: Arc<dyn BarcodeRecognizer>,
        permissions: Arc<dyn PermissionGate>,
        request: ScanRequest,
    ) -> Self {
        Self {
            recognizer,
            permissions,
            request,
            scanning: false,
            awaiting_permission: false,
            generation: 0,
            last_outcome: None,
            notices: Vec::new(),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn last_outcome(&self) -> Option<&ScanOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn update(&mut self, message: ScanMessage) -> Task<ScanMessage> {
        let result = match message {
            ScanMessage::Scan => self.scan(),
            ScanMessage::Cancel => {
                self.cancel();
                Ok(Task::none())
            }
            ScanMessage::PermissionAnswered {
                generation,
                granted,
            } => self.on_permission(generation, granted),
            ScanMessage::Finished {
                generation,
                outcome,
            } => self.on_finished(generation, outcome).map(|_| Task::none()),
        };

        result.unwrap_or_else(|err| {
            self.notices.push(Notice::from(&err));
            Task::none()
        })
    }

    /// Issue a scan with the configured formats and zoom setting
    pub fn scan(&mut self) -> SessionResult<Task<ScanMessage>> {
        if self.scanning {
            return Err(SessionError::invalid("start a scan", "scanning"));
        }
        self.scanning = true;
        self.last_outcome = None;

        if self.recognizer.uses_camera() && !self.permissions.is_granted(Capability::Camera) {
            info!("Requesting camera permission for scanning");
            self.awaiting_permission = true;
            let generation = self.generation;
            return Ok(Task::perform(
                self.permissions.request(Capability::Camera),
                move |granted| ScanMessage::PermissionAnswered {
                    generation,
                    granted,
                },
            ));
        }
        Ok(self.issue())
    }

    fn issue(&mut self) -> Task<ScanMessage> {
        info!(formats = ?self.request.formats, auto_zoom = self.request.auto_zoom, "Scanning");
        let generation = self.generation;
        Task::perform(self.recognizer.scan(self.request.clone()), move |outcome| {
            ScanMessage::Finished {
                generation,
                outcome,
            }
        })
    }

    pub fn on_permission(&mut self, generation: u64, granted: bool) -> SessionResult<Task<ScanMessage>> {
        if generation != self.generation || !self.awaiting_permission {
            debug!(generation, current = self.generation, "Discarding stale permission answer");
            return Ok(Task::none());
        }
        self.awaiting_permission = false;
        if granted {
            Ok(self.issue())
        } else {
            self.scanning = false;
            Err(SessionError::PermissionDenied(Capability::Camera))
        }
    }

    /// Terminal outcome of a scan; `Ok(None)` when the result is stale
    pub fn on_finished(
        &mut self,
        generation: u64,
        outcome: ScanOutcome,
    ) -> SessionResult<Option<ScanOutcome>> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale scan outcome");
            return Ok(None);
        }
        self.scanning = false;
        self.last_outcome = Some(outcome.clone());

        match &outcome {
            ScanOutcome::Decoded(text) => {
                info!(length = text.len(), "Scan decoded");
                self.notices.push(Notice::info(fl!("scan-decoded")));
            }
            ScanOutcome::Cancelled => self.notices.push(Notice::info(fl!("scan-cancelled"))),
            ScanOutcome::Failed(reason) => return Err(SessionError::CaptureFailed(reason.clone())),
        }
        Ok(Some(outcome))
    }

    /// Cancel the scan in flight; it then finishes as cancelled
    pub fn cancel(&mut self) {
        if self.awaiting_permission {
            // Nothing was issued yet, so finish right here
            self.generation += 1;
            self.awaiting_permission = false;
            self.scanning = false;
            self.last_outcome = Some(ScanOutcome::Cancelled);
            self.notices.push(Notice::info(fl!("scan-cancelled")));
        } else if self.scanning {
            info!("Cancelling scan");
            self.recognizer.cancel();
        }
    }

    /// Drop any scan in flight without waiting for its outcome
    pub fn teardown(&mut self) {
        if self.scanning {
            self.recognizer.cancel();
        }
        self.generation += 1;
        self.scanning = false;
        self.awaiting_permission = false;
    }
}
