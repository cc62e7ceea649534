// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the session controllers and the application shell

use crate::backends::camera::BackendError;
use crate::backends::permissions::Capability;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for controller operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Top-level error for the binaries
#[derive(Debug, Clone)]
pub enum AppError {
    /// A controller operation failed
    Session(SessionError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Failures surfaced by the capture, recording and scan controllers
///
/// Every variant is caught at the controller boundary and turned into a
/// transient notice; none of them is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The user refused access to a device capability
    PermissionDenied(Capability),
    /// The camera provider refused to bind or unbind
    ResourceBindingFailed(String),
    /// An asynchronous capture or scan reported an error
    CaptureFailed(String),
    /// Encoder/decoder open, start or stop failed
    IoFailure(String),
    /// Nothing to act on (no recording yet, empty gallery)
    NotFound(String),
    /// The operation is not valid in the controller's current state
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl SessionError {
    pub(crate) fn invalid(operation: &'static str, state: &'static str) -> Self {
        SessionError::InvalidState { operation, state }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "{}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PermissionDenied(cap) => write!(f, "{} permission denied", cap),
            SessionError::ResourceBindingFailed(msg) => write!(f, "Binding failed: {}", msg),
            SessionError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            SessionError::IoFailure(msg) => write!(f, "I/O failure: {}", msg),
            SessionError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SessionError::InvalidState { operation, state } => {
                write!(f, "Cannot {} while {}", operation, state)
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::ResourceBindingFailed(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::IoFailure(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
