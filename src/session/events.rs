// src/session/events.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::models::streak::StreakSnapshot;
use crate::session::error::{DeviceError, SessionError};
use crate::session::monitor::{FacePresenceStatus, Visibility};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Why an exam was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeTrigger {
    ManualSubmit,
    TimeExpired,
    ViolationLimitExceeded,
}

/// Inbound signal, dispatched serially into the session driver.
#[derive(Debug)]
pub enum Signal {
    Visibility(Visibility),
    Fullscreen(bool),
    FacePolled(Result<usize, DeviceError>),
    Select {
        index: usize,
        option: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Navigate {
        index: usize,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Submit,
}

/// Outbound notification for subscribers of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        started_at: DateTime<Utc>,
        duration_secs: u64,
    },
    TabSwitchWarning {
        count: u32,
        limit: u32,
    },
    FullscreenLost,
    FullscreenRestored,
    FacePresence {
        status: FacePresenceStatus,
    },
    Finalized {
        trigger: FinalizeTrigger,
        score: u32,
        total_questions: u32,
    },
    /// The result could not be saved. The local score stands.
    PersistenceFailed {
        reason: String,
    },
    /// Emitted once, after the result store acknowledged the result.
    AssessmentCompleted {
        subject: String,
        score: u32,
        total_questions: u32,
        streak: StreakSnapshot,
    },
}

/// Live view of a session for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub time_left_secs: u64,
    pub tab_switches: u32,
    pub face: FacePresenceStatus,
    pub needs_fullscreen: bool,
    pub cursor: usize,
    pub answered: usize,
}
