//! Error taxonomy for capture sessions
//!
//! Face-not-detected frames and recognizer restart gaps are not errors and
//! have no variant here: they are absorbed by the signal aggregators.

use thiserror::Error;

/// Camera or microphone could not be acquired
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Recorder error: {0}")]
    Recorder(String),

    #[error("Speech recognition unavailable: {0}")]
    Recognizer(String),
}

impl AcquisitionError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, AcquisitionError::PermissionDenied(_))
    }
}

/// The remote upload/analysis step failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Failed to encode upload: {0}")]
    Encode(String),

    /// Server answered with `success: false`
    #[error("{0}")]
    Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A session is already active ({0})")]
    AlreadyActive(String),

    #[error("Invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::session::SessionStatus,
        to: crate::session::SessionStatus,
    },

    #[error("No active session")]
    NoSession,

    #[error("Session task ended unexpectedly")]
    TaskFailed,
}
