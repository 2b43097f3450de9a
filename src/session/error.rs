// src/session/error.rs

use std::fmt;

use thiserror::Error;

use crate::session::monitor::FacePresenceStatus;

/// A start condition that was not satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    CameraGranted,
    SingleFace(FacePresenceStatus),
    Fullscreen,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::CameraGranted => write!(f, "camera access has not been granted"),
            Precondition::SingleFace(status) => {
                write!(f, "exactly one face must be visible (currently {status})")
            }
            Precondition::Fullscreen => write!(f, "fullscreen mode is not active"),
        }
    }
}

/// Errors from the session gate and from commands sent to a running session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("cannot start exam: {0}")]
    PreconditionNotMet(Precondition),
    #[error("the question set is empty")]
    EmptyQuestionSet,
    #[error("the exam has already been started")]
    AlreadyStarted,
    #[error("question {index} is out of range (paper has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error("return to fullscreen to continue the exam")]
    FullscreenRequired,
    #[error("the exam is no longer in progress")]
    NotInProgress,
}

/// Failure reported by a camera, viewport or face detector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
    #[error("face detection failed: {0}")]
    Detection(String),
}

/// Failure writing an exam result to the result store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("result store rejected the request with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("result store unavailable: {0}")]
    Unavailable(String),
}
