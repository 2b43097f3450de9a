// src/session/driver.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::SessionConfig;
use crate::session::clock::Tick;
use crate::session::device::{CameraGuard, FaceDetector};
use crate::session::error::SessionError;
use crate::session::events::{FinalizeTrigger, SessionEvent, SessionStatus, Signal};
use crate::session::exam::ExamSession;
use crate::session::finalizer::{Finalizer, SessionOutcome};
use crate::session::monitor::{FacePoller, FullscreenOutcome, Visibility, VisibilityOutcome};

/// Control surface of a running exam.
///
/// Every method enqueues a signal for the session driver; nothing here
/// touches session state directly. Dropping the handle abandons the exam:
/// signals already queued are still processed, so an accepted submit is
/// scored and saved. Otherwise the driver releases the camera and stops
/// without saving a result.
pub struct ExamHandle {
    signals: mpsc::UnboundedSender<Signal>,
    status: watch::Receiver<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
    outcome: JoinHandle<Option<SessionOutcome>>,
    abandon: oneshot::Sender<()>,
}

impl ExamHandle {
    /// Select `option` for question `index`.
    pub async fn select(&self, index: usize, option: impl Into<String>) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Signal::Select {
            index,
            option: option.into(),
            reply,
        })?;
        rx.await.unwrap_or(Err(SessionError::NotInProgress))
    }

    pub async fn navigate(&self, index: usize) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Signal::Navigate { index, reply })?;
        rx.await.unwrap_or(Err(SessionError::NotInProgress))
    }

    pub fn submit(&self) -> Result<(), SessionError> {
        self.send(Signal::Submit)
    }

    pub fn report_visibility(&self, visibility: Visibility) -> Result<(), SessionError> {
        self.send(Signal::Visibility(visibility))
    }

    pub fn report_fullscreen(&self, active: bool) -> Result<(), SessionError> {
        self.send(Signal::Fullscreen(active))
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Wait for the exam to be finalized and its result handed to the store.
    pub async fn finished(self) -> Result<SessionOutcome, SessionError> {
        let ExamHandle {
            outcome, abandon, ..
        } = self;
        let result = outcome.await;
        drop(abandon);
        match result {
            Ok(Some(outcome)) => Ok(outcome),
            Ok(None) => Err(SessionError::NotInProgress),
            Err(e) => {
                tracing::error!("Exam driver task failed: {}", e);
                Err(SessionError::NotInProgress)
            }
        }
    }

    fn send(&self, signal: Signal) -> Result<(), SessionError> {
        self.signals
            .send(signal)
            .map_err(|_| SessionError::NotInProgress)
    }
}

pub(crate) struct Driver {
    session: ExamSession,
    signals: mpsc::UnboundedReceiver<Signal>,
    status: watch::Sender<SessionStatus>,
    events: broadcast::Sender<SessionEvent>,
    poller: Option<FacePoller>,
    camera: Option<CameraGuard>,
    finalizer: Finalizer,
    tick: Duration,
}

impl Driver {
    /// Starts the face poller and the driver task for an admitted session.
    pub(crate) fn spawn(
        session: ExamSession,
        camera: CameraGuard,
        detector: Arc<dyn FaceDetector>,
        finalizer: Finalizer,
        events: broadcast::Sender<SessionEvent>,
        config: &SessionConfig,
    ) -> ExamHandle {
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(session.status());
        let (abandon, abandoned) = oneshot::channel();
        let poller = FacePoller::spawn(
            camera.stream(),
            detector,
            config.face_poll_interval,
            signal_tx.clone(),
        );

        let driver = Driver {
            session,
            signals,
            status,
            events: events.clone(),
            poller: Some(poller),
            camera: Some(camera),
            finalizer,
            tick: config.tick,
        };
        let outcome = tokio::spawn(driver.run(abandoned));

        ExamHandle {
            signals: signal_tx,
            status: status_rx,
            events,
            outcome,
            abandon,
        }
    }

    async fn run(mut self, mut abandoned: oneshot::Receiver<()>) -> Option<SessionOutcome> {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        // Late ticks are caught up so the countdown keeps pace with wall time.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let mut intake_open = true;

        let (trigger, result) = loop {
            let trigger = tokio::select! {
                biased;
                // Signals sent before the handle was dropped still count.
                signal = self.signals.recv(), if intake_open => match signal {
                    Some(signal) => self.dispatch(signal),
                    None => {
                        intake_open = false;
                        None
                    }
                },
                _ = &mut abandoned => {
                    self.teardown();
                    return None;
                }
                _ = ticker.tick() => self.on_tick(),
            };

            if let Some(trigger) = trigger {
                if let Some(result) = Finalizer::seal(&mut self.session, trigger) {
                    break (trigger, result);
                }
            }
            self.publish_status();
        };

        // The clock was stopped by `seal`; nothing else may reach the session.
        drop(ticker);
        self.detach_sources();
        self.publish_status();

        Some(self.finalizer.finish(trigger, result, self.camera.take()).await)
    }

    fn dispatch(&mut self, signal: Signal) -> Option<FinalizeTrigger> {
        match signal {
            Signal::Visibility(visibility) => match self.session.on_visibility(visibility) {
                VisibilityOutcome::Ignored => None,
                VisibilityOutcome::Warning { count, limit } => {
                    tracing::warn!("Tab switch {}/{} during exam", count, limit);
                    self.emit(SessionEvent::TabSwitchWarning { count, limit });
                    None
                }
                VisibilityOutcome::LimitReached { count } => {
                    tracing::warn!("Tab switch limit reached ({}), submitting exam", count);
                    Some(FinalizeTrigger::ViolationLimitExceeded)
                }
            },
            Signal::Fullscreen(active) => {
                match self.session.on_fullscreen(active) {
                    FullscreenOutcome::Lost => {
                        tracing::warn!("Fullscreen exited during exam");
                        self.emit(SessionEvent::FullscreenLost);
                    }
                    FullscreenOutcome::Restored => self.emit(SessionEvent::FullscreenRestored),
                    FullscreenOutcome::Unchanged => {}
                }
                None
            }
            Signal::FacePolled(result) => {
                if let Some(status) = self.session.on_face_poll(&result) {
                    tracing::debug!(%status, "face presence changed");
                    self.emit(SessionEvent::FacePresence { status });
                }
                None
            }
            Signal::Select {
                index,
                option,
                reply,
            } => {
                let _ = reply.send(self.session.select(index, option));
                None
            }
            Signal::Navigate { index, reply } => {
                let _ = reply.send(self.session.navigate(index));
                None
            }
            Signal::Submit => Some(FinalizeTrigger::ManualSubmit),
        }
    }

    fn on_tick(&mut self) -> Option<FinalizeTrigger> {
        match self.session.tick() {
            Tick::Expired => {
                tracing::info!("Exam time expired");
                Some(FinalizeTrigger::TimeExpired)
            }
            Tick::Remaining(_) | Tick::Idle => None,
        }
    }

    /// Stops the face poller and closes the signal queue.
    fn detach_sources(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
        self.signals.close();
    }

    fn teardown(&mut self) {
        tracing::info!(subject = self.session.subject(), "exam abandoned before submission");
        self.detach_sources();
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(self.session.status());
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
