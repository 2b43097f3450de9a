// src/session/monitor.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::device::{FaceDetector, VideoStream};
use crate::session::error::DeviceError;
use crate::session::events::Signal;

/// Advisory result of the most recent face check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacePresenceStatus {
    #[default]
    Unknown,
    Present,
    Absent,
    Multiple,
    Error,
}

impl FacePresenceStatus {
    pub fn from_detection(result: &Result<usize, DeviceError>) -> Self {
        match result {
            Ok(0) => FacePresenceStatus::Absent,
            Ok(1) => FacePresenceStatus::Present,
            Ok(_) => FacePresenceStatus::Multiple,
            Err(_) => FacePresenceStatus::Error,
        }
    }
}

impl fmt::Display for FacePresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FacePresenceStatus::Unknown => "unknown",
            FacePresenceStatus::Present => "present",
            FacePresenceStatus::Absent => "no face detected",
            FacePresenceStatus::Multiple => "multiple faces detected",
            FacePresenceStatus::Error => "detector error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOutcome {
    Ignored,
    Warning { count: u32, limit: u32 },
    LimitReached { count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenOutcome {
    Unchanged,
    Lost,
    Restored,
}

/// Violation and presence state of a running exam.
///
/// Only the visibility signal can end an exam. Leaving fullscreen blocks
/// input until it is restored but is not counted, and face presence is
/// purely informational.
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    tab_switches: u32,
    limit: u32,
    visibility: Visibility,
    fullscreen: bool,
    face: FacePresenceStatus,
    attached: bool,
}

impl IntegrityMonitor {
    pub fn attach(limit: u32, face: FacePresenceStatus) -> Self {
        Self {
            tab_switches: 0,
            limit,
            visibility: Visibility::Visible,
            fullscreen: true,
            face,
            attached: true,
        }
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn tab_switches(&self) -> u32 {
        self.tab_switches
    }

    pub fn needs_fullscreen(&self) -> bool {
        !self.fullscreen
    }

    pub fn face(&self) -> FacePresenceStatus {
        self.face
    }

    pub fn on_visibility(&mut self, visibility: Visibility) -> VisibilityOutcome {
        if !self.attached {
            return VisibilityOutcome::Ignored;
        }
        let previous = std::mem::replace(&mut self.visibility, visibility);
        if previous != Visibility::Visible || visibility != Visibility::Hidden {
            return VisibilityOutcome::Ignored;
        }

        self.tab_switches += 1;
        if self.tab_switches >= self.limit {
            VisibilityOutcome::LimitReached {
                count: self.tab_switches,
            }
        } else {
            VisibilityOutcome::Warning {
                count: self.tab_switches,
                limit: self.limit,
            }
        }
    }

    pub fn on_fullscreen(&mut self, active: bool) -> FullscreenOutcome {
        if !self.attached || self.fullscreen == active {
            return FullscreenOutcome::Unchanged;
        }
        self.fullscreen = active;
        if active {
            FullscreenOutcome::Restored
        } else {
            FullscreenOutcome::Lost
        }
    }

    /// Returns the new status when it changed.
    pub fn on_face_poll(&mut self, result: &Result<usize, DeviceError>) -> Option<FacePresenceStatus> {
        if !self.attached {
            return None;
        }
        let status = FacePresenceStatus::from_detection(result);
        if status == self.face {
            return None;
        }
        self.face = status;
        Some(status)
    }
}

/// Background task polling the face detector at a fixed cadence.
///
/// Results are fed back into the session's signal queue; the poller never
/// touches session state itself. Aborted on drop.
pub struct FacePoller {
    handle: JoinHandle<()>,
}

impl FacePoller {
    pub fn spawn(
        stream: Arc<dyn VideoStream>,
        detector: Arc<dyn FaceDetector>,
        every: Duration,
        signals: mpsc::UnboundedSender<Signal>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // The stream may not be producing frames yet.
                let Some(frame) = stream.capture_frame() else {
                    continue;
                };
                let result = detector.count_faces(&frame).await;
                if let Err(e) = &result {
                    tracing::warn!("Face detection failed: {}", e);
                }
                if signals.send(Signal::FacePolled(result)).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for FacePoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
