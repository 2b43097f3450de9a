// src/session/finalizer.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::DEVICE_RELEASE_TIMEOUT;
use crate::models::exam_record::ExamResult;
use crate::models::streak::StreakSnapshot;
use crate::session::device::{CameraGuard, Viewport};
use crate::session::events::{FinalizeTrigger, SessionEvent};
use crate::session::exam::ExamSession;
use crate::session::store::ResultStore;

/// Number of positions where the answer equals the correct option.
/// Unanswered positions never match.
pub fn score(answers: &[Option<String>], correct: &[String]) -> u32 {
    answers
        .iter()
        .zip(correct)
        .filter(|(answer, correct)| answer.as_deref() == Some(correct.as_str()))
        .count() as u32
}

/// Whole seconds of `elapsed`, bounded by the configured exam length.
pub fn clamp_duration(elapsed: Duration, configured_secs: u64) -> u64 {
    elapsed.as_secs().min(configured_secs)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Persistence {
    Saved { streak: StreakSnapshot },
    Failed { reason: String },
}

/// Everything a finished session produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub trigger: FinalizeTrigger,
    pub result: ExamResult,
    pub persistence: Persistence,
}

pub struct Finalizer {
    viewport: Arc<dyn Viewport>,
    store: Arc<dyn ResultStore>,
    events: broadcast::Sender<SessionEvent>,
    device_timeout: Duration,
}

impl Finalizer {
    pub fn new(
        viewport: Arc<dyn Viewport>,
        store: Arc<dyn ResultStore>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            viewport,
            store,
            events,
            device_timeout: DEVICE_RELEASE_TIMEOUT,
        }
    }

    /// Completes `session` and scores it.
    ///
    /// Only the first call on a session does anything; every later call
    /// returns `None`. The check and the transition happen under the same
    /// `&mut` borrow, so no other handler can observe the session in between.
    pub fn seal(session: &mut ExamSession, trigger: FinalizeTrigger) -> Option<ExamResult> {
        if !session.complete() {
            tracing::debug!(?trigger, "finalize ignored, session already completed");
            return None;
        }

        let answers = session.ledger().snapshot();
        let correct_answers = session.questions().correct_answers();
        let score = score(&answers, &correct_answers);
        let elapsed = Instant::now().saturating_duration_since(session.started());
        let duration_seconds = clamp_duration(elapsed, session.clock().configured_secs());
        let tab_switches = session.monitor().tab_switches();

        tracing::info!(
            subject = session.subject(),
            ?trigger,
            score,
            total = correct_answers.len(),
            duration_seconds,
            tab_switches,
            "exam finalized"
        );

        Some(ExamResult {
            subject: session.subject().to_string(),
            score,
            total_questions: correct_answers.len() as u32,
            questions: session.questions().contents(),
            user_answers: answers.to_vec(),
            correct_answers,
            duration_seconds,
            tab_switches,
            violations: tab_switches,
            face_captured: session.face_captured(),
            completed_at: Utc::now(),
        })
    }

    /// Releases devices, publishes the local score and then persists it.
    ///
    /// The camera is released first. Leaving fullscreen is bounded by
    /// `DEVICE_RELEASE_TIMEOUT`; a viewport that never answers only costs
    /// that long. Failures are logged or reported as events and never change
    /// the computed result.
    pub async fn finish(
        &self,
        trigger: FinalizeTrigger,
        result: ExamResult,
        camera: Option<CameraGuard>,
    ) -> SessionOutcome {
        if let Some(mut camera) = camera {
            camera.release();
        }
        if self.viewport.is_fullscreen() {
            match tokio::time::timeout(self.device_timeout, self.viewport.exit_fullscreen()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Failed to exit fullscreen after exam: {}", e),
                Err(_) => tracing::warn!(
                    "Fullscreen exit did not finish within {:?}, continuing",
                    self.device_timeout
                ),
            }
        }

        let _ = self.events.send(SessionEvent::Finalized {
            trigger,
            score: result.score,
            total_questions: result.total_questions,
        });

        let persistence = match self.store.save_exam_result(&result).await {
            Ok(ack) => {
                tracing::info!(
                    subject = %result.subject,
                    current = ack.streak.current,
                    longest = ack.streak.longest,
                    "exam result saved"
                );
                let _ = self.events.send(SessionEvent::AssessmentCompleted {
                    subject: result.subject.clone(),
                    score: result.score,
                    total_questions: result.total_questions,
                    streak: ack.streak,
                });
                Persistence::Saved { streak: ack.streak }
            }
            Err(e) => {
                tracing::error!("Failed to save exam result: {}", e);
                let reason = e.to_string();
                let _ = self.events.send(SessionEvent::PersistenceFailed {
                    reason: reason.clone(),
                });
                Persistence::Failed { reason }
            }
        };

        SessionOutcome {
            trigger,
            result,
            persistence,
        }
    }
}
