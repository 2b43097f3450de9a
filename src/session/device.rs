// src/session/device.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::session::error::DeviceError;

/// A single still image taken from the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Grants access to a video-only camera stream.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open_video(&self) -> Result<Arc<dyn VideoStream>, DeviceError>;
}

/// An open camera stream. `stop` must be idempotent.
pub trait VideoStream: Send + Sync {
    /// Latest frame, or `None` while the stream is not producing images yet.
    fn capture_frame(&self) -> Option<Frame>;
    fn stop(&self);
}

/// The root viewport the exam is rendered in.
#[async_trait]
pub trait Viewport: Send + Sync {
    /// Ask for fullscreen. Completion of the request does not guarantee the
    /// viewport is fullscreen yet; check [`Viewport::is_fullscreen`].
    async fn request_fullscreen(&self) -> Result<(), DeviceError>;
    async fn exit_fullscreen(&self) -> Result<(), DeviceError>;
    fn is_fullscreen(&self) -> bool;
}

/// Counts faces in a frame.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn count_faces(&self, frame: &Frame) -> Result<usize, DeviceError>;
}

/// The devices an exam session needs.
#[derive(Clone)]
pub struct Devices {
    pub camera: Arc<dyn Camera>,
    pub viewport: Arc<dyn Viewport>,
    pub detector: Arc<dyn FaceDetector>,
}

/// Exclusive owner of the camera stream. The stream is stopped when the guard
/// is released or dropped, whichever comes first.
pub struct CameraGuard {
    stream: Arc<dyn VideoStream>,
    released: bool,
}

impl CameraGuard {
    pub fn new(stream: Arc<dyn VideoStream>) -> Self {
        Self {
            stream,
            released: false,
        }
    }

    pub fn capture_frame(&self) -> Option<Frame> {
        self.stream.capture_frame()
    }

    /// A shared handle for the face poller. It never outlives the guard's
    /// release because the poller is aborted first.
    pub(crate) fn stream(&self) -> Arc<dyn VideoStream> {
        Arc::clone(&self.stream)
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.stream.stop();
            tracing::debug!("camera stream released");
        }
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraGuard")
            .field("released", &self.released)
            .finish()
    }
}
