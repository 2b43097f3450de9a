// src/session/mod.rs

// Proctored exam session controller.
//
// SessionGate admits a candidate once the camera, face and fullscreen
// checks pass and returns an ExamHandle. From then on a single driver
// task owns the ExamSession and processes every signal (clock ticks,
// visibility and fullscreen changes, face polls, answers, submit) one at a
// time until the Finalizer seals the result.

pub mod clock;
pub mod device;
pub mod driver;
pub mod error;
pub mod events;
pub mod exam;
pub mod finalizer;
pub mod gate;
pub mod ledger;
pub mod monitor;
pub mod store;

pub use device::{Camera, CameraGuard, Devices, FaceDetector, Frame, VideoStream, Viewport};
pub use driver::ExamHandle;
pub use error::{DeviceError, Precondition, SessionError, StoreError};
pub use events::{FinalizeTrigger, SessionEvent, SessionState, SessionStatus};
pub use exam::ExamSession;
pub use finalizer::{Finalizer, Persistence, SessionOutcome};
pub use gate::SessionGate;
pub use monitor::{FacePresenceStatus, Visibility};
pub use store::{HttpResultStore, ResultStore};
