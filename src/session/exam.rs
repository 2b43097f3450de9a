// src/session/exam.rs

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::models::question::QuestionSet;
use crate::session::clock::{ExamClock, Tick};
use crate::session::error::{DeviceError, SessionError};
use crate::session::events::{SessionState, SessionStatus};
use crate::session::ledger::AnswerLedger;
use crate::session::monitor::{
    FacePresenceStatus, FullscreenOutcome, IntegrityMonitor, Visibility, VisibilityOutcome,
};

#[derive(Debug)]
pub struct ExamSession {
    subject: String,
    questions: QuestionSet,
    started_at: DateTime<Utc>,
    started: Instant,
    state: SessionState,
    clock: ExamClock,
    ledger: AnswerLedger,
    monitor: IntegrityMonitor,
    face_captured: bool,
}

impl ExamSession {
    /// A session that has passed the entry gate and is now running.
    pub(crate) fn begin(
        config: &SessionConfig,
        questions: QuestionSet,
        face: FacePresenceStatus,
        face_captured: bool,
    ) -> Self {
        let ledger = AnswerLedger::new(questions.len());
        Self {
            subject: config.subject.clone(),
            questions,
            started_at: Utc::now(),
            started: Instant::now(),
            state: SessionState::InProgress,
            clock: ExamClock::new(config.duration_secs),
            ledger,
            monitor: IntegrityMonitor::attach(config.tab_switch_limit, face),
            face_captured,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn clock(&self) -> &ExamClock {
        &self.clock
    }

    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    pub fn monitor(&self) -> &IntegrityMonitor {
        &self.monitor
    }

    pub fn face_captured(&self) -> bool {
        self.face_captured
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            time_left_secs: self.clock.time_left_secs(),
            tab_switches: self.monitor.tab_switches(),
            face: self.monitor.face(),
            needs_fullscreen: self.monitor.needs_fullscreen(),
            cursor: self.ledger.cursor(),
            answered: self.ledger.answered(),
        }
    }

    fn ensure_interactive(&self) -> Result<(), SessionError> {
        if self.state != SessionState::InProgress {
            return Err(SessionError::NotInProgress);
        }
        if self.monitor.needs_fullscreen() {
            return Err(SessionError::FullscreenRequired);
        }
        Ok(())
    }

    pub fn select(&mut self, index: usize, option: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_interactive()?;
        self.ledger.select(index, option)
    }

    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_interactive()?;
        self.ledger.navigate(index)
    }

    pub fn tick(&mut self) -> Tick {
        if self.state != SessionState::InProgress {
            return Tick::Idle;
        }
        self.clock.tick()
    }

    pub fn on_visibility(&mut self, visibility: Visibility) -> VisibilityOutcome {
        if self.state != SessionState::InProgress {
            return VisibilityOutcome::Ignored;
        }
        self.monitor.on_visibility(visibility)
    }

    pub fn on_fullscreen(&mut self, active: bool) -> FullscreenOutcome {
        if self.state != SessionState::InProgress {
            return FullscreenOutcome::Unchanged;
        }
        self.monitor.on_fullscreen(active)
    }

    pub fn on_face_poll(&mut self, result: &Result<usize, DeviceError>) -> Option<FacePresenceStatus> {
        if self.state != SessionState::InProgress {
            return None;
        }
        self.monitor.on_face_poll(result)
    }

    /// Move to `Completed`, stopping the clock and detaching the monitor.
    /// Returns false when the session had already left `InProgress`.
    pub(crate) fn complete(&mut self) -> bool {
        if self.state != SessionState::InProgress {
            return false;
        }
        self.state = SessionState::Completed;
        self.clock.stop();
        self.monitor.detach();
        true
    }
}
