// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proctor::config::SessionConfig;
use proctor::models::exam_record::{ExamResult, SaveResultResponse};
use proctor::models::question::{Question, QuestionSet};
use proctor::models::streak::StreakSnapshot;
use proctor::session::{
    Camera, DeviceError, Devices, FaceDetector, Frame, ResultStore, SessionGate, StoreError,
    VideoStream, Viewport,
};

#[derive(Default)]
pub struct FakeStream {
    pub stopped: AtomicBool,
}

impl VideoStream for FakeStream {
    fn capture_frame(&self) -> Option<Frame> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        Some(Frame {
            width: 640,
            height: 480,
            data: vec![0; 16],
        })
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeCamera {
    pub deny: AtomicBool,
    pub stream: Arc<FakeStream>,
}

#[async_trait]
impl Camera for FakeCamera {
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, DeviceError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied("NotAllowedError".into()));
        }
        let stream: Arc<dyn VideoStream> = self.stream.clone();
        Ok(stream)
    }
}

/// Enters fullscreen on request unless `ignore_requests` is set. With
/// `hang_exit` set, leaving fullscreen never completes.
#[derive(Default)]
pub struct FakeViewport {
    pub fullscreen: AtomicBool,
    pub ignore_requests: AtomicBool,
    pub fail_requests: AtomicBool,
    pub hang_exit: AtomicBool,
    pub exits: AtomicUsize,
}

#[async_trait]
impl Viewport for FakeViewport {
    async fn request_fullscreen(&self) -> Result<(), DeviceError> {
        if !self.ignore_requests.load(Ordering::SeqCst) {
            self.fullscreen.store(true, Ordering::SeqCst);
        }
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(DeviceError::Unavailable("request rejected".into()));
        }
        Ok(())
    }

    async fn exit_fullscreen(&self) -> Result<(), DeviceError> {
        self.exits.fetch_add(1, Ordering::SeqCst);
        if self.hang_exit.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.fullscreen.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }
}

/// Reports `faces` faces, or an error while `broken` is set.
pub struct FakeDetector {
    pub faces: AtomicUsize,
    pub broken: AtomicBool,
}

impl FakeDetector {
    pub fn with_faces(faces: usize) -> Self {
        Self {
            faces: AtomicUsize::new(faces),
            broken: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FaceDetector for FakeDetector {
    async fn count_faces(&self, _frame: &Frame) -> Result<usize, DeviceError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(DeviceError::Detection("model not loaded".into()));
        }
        Ok(self.faces.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub saved: Mutex<Vec<ExamResult>>,
    pub fail: AtomicBool,
}

impl MemoryStore {
    pub fn saved(&self) -> Vec<ExamResult> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn save_exam_result(&self, result: &ExamResult) -> Result<SaveResultResponse, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push(result.clone());
        Ok(SaveResultResponse {
            message: "Exam result saved successfully".into(),
            streak: StreakSnapshot {
                current: saved.len() as u32,
                longest: 7,
            },
        })
    }
}

/// A paper of `len` questions whose correct option is always "A".
pub fn paper(len: usize) -> QuestionSet {
    let questions = (0..len)
        .map(|i| Question {
            id: i as i64 + 1,
            subject: "physics".into(),
            content: format!("Question {}", i + 1),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            answer: "A".into(),
        })
        .collect();
    QuestionSet::new(questions)
}

pub struct Rig {
    pub camera: Arc<FakeCamera>,
    pub viewport: Arc<FakeViewport>,
    pub detector: Arc<FakeDetector>,
    pub store: Arc<MemoryStore>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            camera: Arc::new(FakeCamera::default()),
            viewport: Arc::new(FakeViewport::default()),
            detector: Arc::new(FakeDetector::with_faces(1)),
            store: Arc::new(MemoryStore::default()),
        }
    }

    pub fn devices(&self) -> Devices {
        Devices {
            camera: self.camera.clone(),
            viewport: self.viewport.clone(),
            detector: self.detector.clone(),
        }
    }

    pub fn gate(&self, config: SessionConfig, questions: QuestionSet) -> SessionGate {
        SessionGate::new(config, questions, self.devices(), self.store.clone()).unwrap()
    }

    /// A gate with every precondition satisfied, ready for `start`.
    pub async fn ready_gate(&self, config: SessionConfig, questions: QuestionSet) -> SessionGate {
        let mut gate = self.gate(config, questions);
        gate.request_camera().await.unwrap();
        gate.check_face().await.unwrap();
        assert!(gate.request_fullscreen().await.unwrap());
        gate
    }
}
