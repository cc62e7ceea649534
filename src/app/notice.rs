// SPDX-License-Identifier: GPL-3.0-only

//! Transient notices shown in the status bar

use crate::backends::permissions::Capability;
use crate::errors::SessionError;
use crate::fl;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: NoticeLevel::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&SessionError> for Notice {
    fn from(err: &SessionError) -> Self {
        let text = match err {
            SessionError::NotFound(what) => return Notice::info(what.as_str()),
            SessionError::PermissionDenied(Capability::Camera) => fl!("camera-permission-denied"),
            SessionError::PermissionDenied(Capability::Microphone) => {
                fl!("microphone-permission-denied")
            }
            SessionError::ResourceBindingFailed(reason) => {
                fl!("camera-unavailable", reason = reason.as_str())
            }
            SessionError::CaptureFailed(reason) => fl!("capture-failed", reason = reason.as_str()),
            SessionError::IoFailure(reason) => fl!("media-failed", reason = reason.as_str()),
            SessionError::InvalidState { operation, state } => {
                fl!("invalid-state", operation = *operation, state = *state)
            }
        };
        Notice::error(text)
    }
}

/// Notices currently on screen, oldest first
#[derive(Debug)]
pub struct NoticeBoard {
    lifetime: Duration,
    shown: VecDeque<(Notice, Instant)>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(crate::constants::timing::NOTICE_LIFETIME)
    }
}

impl NoticeBoard {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            shown: VecDeque::new(),
        }
    }

    pub fn push(&mut self, notice: Notice) {
        self.push_at(notice, Instant::now());
    }

    pub fn push_at(&mut self, notice: Notice, at: Instant) {
        self.shown.push_back((notice, at));
    }

    /// Drop notices older than the lifetime
    pub fn expire(&mut self, now: Instant) {
        self.shown
            .retain(|(_, shown_at)| now.saturating_duration_since(*shown_at) < self.lifetime);
    }

    /// Newest notice
    pub fn latest(&self) -> Option<&Notice> {
        self.shown.back().map(|(notice, _)| notice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.shown.iter().map(|(notice, _)| notice)
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_expire() {
        let mut board = NoticeBoard::new(Duration::from_secs(3));
        let start = Instant::now();
        board.push_at(Notice::info("first"), start);
        board.push_at(Notice::info("second"), start + Duration::from_secs(2));

        board.expire(start + Duration::from_secs(4));
        assert_eq!(board.latest().map(|n| n.text.as_str()), Some("second"));
        assert_eq!(board.iter().count(), 1);

        board.expire(start + Duration::from_secs(10));
        assert!(board.is_empty());
    }

    #[test]
    fn test_invalid_state_notice_is_localized() {
        let err = SessionError::invalid("switch camera", "unbound");
        let notice = Notice::from(&err);
        assert!(notice.is_error());
        assert!(notice.text.starts_with("Cannot"));
        assert!(notice.text.contains("switch camera"));
        assert!(notice.text.contains("unbound"));
    }

    #[test]
    fn test_not_found_is_informational() {
        let notice = Notice::from(&SessionError::NotFound(fl!("no-recording")));
        assert!(!notice.is_error());
        assert_eq!(notice.text, fl!("no-recording"));
    }
}
