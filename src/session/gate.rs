// src/session/gate.rs

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::SessionConfig;
use crate::models::question::QuestionSet;
use crate::session::device::{CameraGuard, Devices};
use crate::session::driver::{Driver, ExamHandle};
use crate::session::error::{Precondition, SessionError};
use crate::session::events::SessionEvent;
use crate::session::exam::ExamSession;
use crate::session::finalizer::Finalizer;
use crate::session::monitor::FacePresenceStatus;
use crate::session::store::ResultStore;

const EVENT_CAPACITY: usize = 64;

/// Holds an exam in `NotStarted` until camera, face and fullscreen checks
/// all pass.
///
/// Every check may be retried. A failed [`SessionGate::start`] leaves the
/// gate exactly as it was. Dropping the gate releases the camera if the exam
/// never started.
pub struct SessionGate {
    config: SessionConfig,
    questions: QuestionSet,
    devices: Devices,
    store: Arc<dyn ResultStore>,
    camera: Option<CameraGuard>,
    face: FacePresenceStatus,
    fullscreen: bool,
    started: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionGate {
    pub fn new(
        config: SessionConfig,
        questions: QuestionSet,
        devices: Devices,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            config,
            questions,
            devices,
            store,
            camera: None,
            face: FacePresenceStatus::Unknown,
            fullscreen: false,
            started: false,
            events,
        })
    }

    /// Events for this exam, including everything emitted after `start`.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn camera_granted(&self) -> bool {
        self.camera.is_some()
    }

    pub fn face(&self) -> FacePresenceStatus {
        self.face
    }

    pub fn fullscreen_confirmed(&self) -> bool {
        self.fullscreen
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    /// Ask for a video-only camera stream.
    pub async fn request_camera(&mut self) -> Result<(), SessionError> {
        self.ensure_not_started()?;
        if self.camera.is_some() {
            return Ok(());
        }
        match self.devices.camera.open_video().await {
            Ok(stream) => {
                tracing::info!(subject = %self.config.subject, "camera access granted");
                self.camera = Some(CameraGuard::new(stream));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Camera access denied: {}", e);
                Err(SessionError::PermissionDenied(e.to_string()))
            }
        }
    }

    /// Request fullscreen and report whether it is actually active.
    ///
    /// The request's own result is only logged; the viewport is read again
    /// after the settle delay and that observation is what counts.
    pub async fn request_fullscreen(&mut self) -> Result<bool, SessionError> {
        self.ensure_not_started()?;
        if let Err(e) = self.devices.viewport.request_fullscreen().await {
            tracing::warn!("Fullscreen request failed: {}", e);
        }
        tokio::time::sleep(self.config.fullscreen_settle).await;
        self.fullscreen = self.devices.viewport.is_fullscreen();
        Ok(self.fullscreen)
    }

    /// Run the face detector once on the current camera frame.
    pub async fn check_face(&mut self) -> Result<FacePresenceStatus, SessionError> {
        self.ensure_not_started()?;
        let camera = self
            .camera
            .as_ref()
            .ok_or(SessionError::PreconditionNotMet(Precondition::CameraGranted))?;

        let status = match camera.capture_frame() {
            Some(frame) => {
                let result = self.devices.detector.count_faces(&frame).await;
                if let Err(e) = &result {
                    tracing::warn!("Face detection failed: {}", e);
                }
                FacePresenceStatus::from_detection(&result)
            }
            None => FacePresenceStatus::Unknown,
        };

        if status != self.face {
            self.face = status;
            let _ = self.events.send(SessionEvent::FacePresence { status });
        }
        Ok(status)
    }

    /// Admit the candidate into the exam.
    ///
    /// Fails with `PreconditionNotMet` naming the first unmet condition and
    /// changes nothing in that case.
    pub fn start(&mut self) -> Result<ExamHandle, SessionError> {
        self.ensure_not_started()?;
        if self.camera.is_none() {
            return Err(SessionError::PreconditionNotMet(Precondition::CameraGranted));
        }
        if self.face != FacePresenceStatus::Present {
            return Err(SessionError::PreconditionNotMet(Precondition::SingleFace(
                self.face,
            )));
        }
        if !self.fullscreen || !self.devices.viewport.is_fullscreen() {
            return Err(SessionError::PreconditionNotMet(Precondition::Fullscreen));
        }

        let Some(camera) = self.camera.take() else {
            return Err(SessionError::PreconditionNotMet(Precondition::CameraGranted));
        };
        let face_captured = camera.capture_frame().is_some();
        self.started = true;

        let session = ExamSession::begin(&self.config, self.questions.clone(), self.face, face_captured);
        tracing::info!(
            subject = %self.config.subject,
            questions = self.questions.len(),
            duration_secs = self.config.duration_secs,
            face_captured,
            "exam started"
        );
        let _ = self.events.send(SessionEvent::Started {
            started_at: session.started_at(),
            duration_secs: self.config.duration_secs,
        });

        let finalizer = Finalizer::new(
            Arc::clone(&self.devices.viewport),
            Arc::clone(&self.store),
            self.events.clone(),
        );
        Ok(Driver::spawn(
            session,
            camera,
            Arc::clone(&self.devices.detector),
            finalizer,
            self.events.clone(),
            &self.config,
        ))
    }

    fn ensure_not_started(&self) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        Ok(())
    }
}
