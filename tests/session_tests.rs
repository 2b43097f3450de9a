// tests/session_tests.rs

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{Rig, paper};
use proctor::config::SessionConfig;
use proctor::session::{
    FacePresenceStatus, FinalizeTrigger, Persistence, Precondition, SessionError, SessionEvent,
    SessionGate, SessionState, Visibility,
};
use tokio::sync::broadcast;

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn count(events: &[SessionEvent], pred: impl Fn(&SessionEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[tokio::test(start_paused = true)]
async fn test_gate_requires_camera_face_and_fullscreen() {
    let rig = Rig::new();
    rig.detector.faces.store(0, Ordering::SeqCst);
    let mut gate = rig.gate(SessionConfig::exam("physics"), paper(40));

    assert_eq!(
        gate.start().err(),
        Some(SessionError::PreconditionNotMet(Precondition::CameraGranted))
    );
    assert_eq!(
        gate.check_face().await,
        Err(SessionError::PreconditionNotMet(Precondition::CameraGranted))
    );

    gate.request_camera().await.unwrap();
    assert_eq!(
        gate.start().err(),
        Some(SessionError::PreconditionNotMet(Precondition::SingleFace(
            FacePresenceStatus::Unknown
        )))
    );

    assert_eq!(gate.check_face().await, Ok(FacePresenceStatus::Absent));
    assert_eq!(
        gate.start().err(),
        Some(SessionError::PreconditionNotMet(Precondition::SingleFace(
            FacePresenceStatus::Absent
        )))
    );

    rig.detector.faces.store(2, Ordering::SeqCst);
    assert_eq!(gate.check_face().await, Ok(FacePresenceStatus::Multiple));

    rig.detector.faces.store(1, Ordering::SeqCst);
    assert_eq!(gate.check_face().await, Ok(FacePresenceStatus::Present));
    assert_eq!(
        gate.start().err(),
        Some(SessionError::PreconditionNotMet(Precondition::Fullscreen))
    );

    assert!(gate.request_fullscreen().await.unwrap());
    let handle = gate.start().unwrap();
    assert_eq!(handle.status().state, SessionState::InProgress);
    assert_eq!(handle.status().time_left_secs, 2700);

    assert_eq!(gate.start().err(), Some(SessionError::AlreadyStarted));
    assert_eq!(gate.request_camera().await, Err(SessionError::AlreadyStarted));
}

#[tokio::test(start_paused = true)]
async fn test_camera_denial_is_retryable() {
    let rig = Rig::new();
    rig.camera.deny.store(true, Ordering::SeqCst);
    let mut gate = rig.gate(SessionConfig::exam("physics"), paper(40));

    assert!(matches!(
        gate.request_camera().await,
        Err(SessionError::PermissionDenied(_))
    ));
    assert!(!gate.camera_granted());

    rig.camera.deny.store(false, Ordering::SeqCst);
    gate.request_camera().await.unwrap();
    assert!(gate.camera_granted());
}

#[tokio::test(start_paused = true)]
async fn test_fullscreen_uses_observed_state() {
    let rig = Rig::new();
    let mut gate = rig.gate(SessionConfig::exam("physics"), paper(40));

    rig.viewport.ignore_requests.store(true, Ordering::SeqCst);
    assert!(!gate.request_fullscreen().await.unwrap());

    // The request reports failure but the viewport did go fullscreen.
    rig.viewport.ignore_requests.store(false, Ordering::SeqCst);
    rig.viewport.fail_requests.store(true, Ordering::SeqCst);
    assert!(gate.request_fullscreen().await.unwrap());
    assert!(gate.fullscreen_confirmed());
}

#[tokio::test(start_paused = true)]
async fn test_leaving_fullscreen_before_start_blocks_entry() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;

    rig.viewport.fullscreen.store(false, Ordering::SeqCst);
    assert_eq!(
        gate.start().err(),
        Some(SessionError::PreconditionNotMet(Precondition::Fullscreen))
    );
    assert!(gate.camera_granted());
}

#[tokio::test]
async fn test_empty_paper_is_rejected() {
    let rig = Rig::new();
    let gate = SessionGate::new(
        SessionConfig::exam("physics"),
        paper(0),
        rig.devices(),
        rig.store.clone(),
    );
    assert!(matches!(gate, Err(SessionError::EmptyQuestionSet)));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_gate_releases_camera() {
    let rig = Rig::new();
    let mut gate = rig.gate(SessionConfig::exam("physics"), paper(40));
    gate.request_camera().await.unwrap();

    drop(gate);
    assert!(rig.camera.stream.stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_full_exam_scores_and_saves_once() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    for i in 0..40 {
        let option = if i < 38 { "A" } else { "C" };
        handle.select(i, option).await.unwrap();
    }
    handle.navigate(12).await.unwrap();
    assert_eq!(handle.status().answered, 40);
    assert_eq!(handle.status().cursor, 12);

    tokio::time::sleep(Duration::from_secs(2100)).await;
    let time_left = handle.status().time_left_secs;
    assert!((600..=601).contains(&time_left), "time left was {}", time_left);

    handle.submit().unwrap();
    let status = handle.watch_status();
    let outcome = handle.finished().await.unwrap();

    assert_eq!(outcome.trigger, FinalizeTrigger::ManualSubmit);
    assert_eq!(outcome.result.score, 38);
    assert_eq!(outcome.result.total_questions, 40);
    assert_eq!(outcome.result.user_answers.len(), 40);
    assert_eq!(outcome.result.correct_answers.len(), 40);
    assert_eq!(outcome.result.questions[0], "Question 1");
    assert!((2099..=2101).contains(&outcome.result.duration_seconds));
    assert_eq!(outcome.result.tab_switches, 0);
    assert_eq!(outcome.result.violations, 0);
    assert!(outcome.result.face_captured);
    assert!(matches!(outcome.persistence, Persistence::Saved { .. }));
    assert_eq!(status.borrow().state, SessionState::Completed);

    assert_eq!(rig.store.saved().len(), 1);
    assert_eq!(rig.store.saved()[0], outcome.result);
    assert!(rig.camera.stream.stopped.load(Ordering::SeqCst));
    assert_eq!(rig.viewport.exits.load(Ordering::SeqCst), 1);

    let events = drain(&mut events);
    assert!(matches!(events[0], SessionEvent::Started { duration_secs: 2700, .. }));
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::Finalized { .. })), 1);
    assert_eq!(
        count(&events, |e| matches!(e, SessionEvent::AssessmentCompleted { .. })),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_third_tab_switch_submits_before_next_tick() {
    let rig = Rig::new();
    let config = SessionConfig::exam("physics").with_duration_secs(100);
    let mut gate = rig.ready_gate(config, paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    handle.select(0, "A").await.unwrap();
    for _ in 0..3 {
        handle.report_visibility(Visibility::Hidden).unwrap();
        handle.report_visibility(Visibility::Visible).unwrap();
    }
    let status = handle.watch_status();
    let outcome = handle.finished().await.unwrap();

    assert_eq!(outcome.trigger, FinalizeTrigger::ViolationLimitExceeded);
    assert_eq!(outcome.result.tab_switches, 3);
    assert_eq!(outcome.result.violations, 3);
    assert_eq!(outcome.result.score, 1);
    assert_eq!(outcome.result.duration_seconds, 0);
    assert_eq!(status.borrow().time_left_secs, 100);
    assert_eq!(status.borrow().state, SessionState::Completed);

    let events = drain(&mut events);
    let warnings: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::TabSwitchWarning { count, limit } => Some((*count, *limit)),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec![(1, 3), (2, 3)]);
}

#[tokio::test(start_paused = true)]
async fn test_time_expiry_submits_unanswered_paper() {
    let rig = Rig::new();
    let config = SessionConfig::exam("physics").with_duration_secs(5);
    let mut gate = rig.ready_gate(config, paper(40)).await;
    let handle = gate.start().unwrap();

    let outcome = handle.finished().await.unwrap();

    assert_eq!(outcome.trigger, FinalizeTrigger::TimeExpired);
    assert_eq!(outcome.result.score, 0);
    assert_eq!(outcome.result.duration_seconds, 5);
    assert!(outcome.result.user_answers.iter().all(Option::is_none));
    assert_eq!(rig.store.saved().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_and_submit_in_same_tick_finalize_once() {
    let rig = Rig::new();
    let config = SessionConfig::exam("physics").with_duration_secs(3);
    let mut gate = rig.ready_gate(config, paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    let _ = handle.submit();
    let outcome = handle.finished().await.unwrap();

    assert!(matches!(
        outcome.trigger,
        FinalizeTrigger::TimeExpired | FinalizeTrigger::ManualSubmit
    ));
    assert_eq!(outcome.result.duration_seconds, 3);
    assert_eq!(rig.store.saved().len(), 1);

    let events = drain(&mut events);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::Finalized { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_keeps_local_score() {
    let rig = Rig::new();
    rig.store.fail.store(true, Ordering::SeqCst);
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    handle.select(3, "A").await.unwrap();
    handle.select(4, "B").await.unwrap();
    handle.submit().unwrap();
    let outcome = handle.finished().await.unwrap();

    assert_eq!(outcome.result.score, 1);
    assert!(matches!(outcome.persistence, Persistence::Failed { .. }));
    assert!(rig.camera.stream.stopped.load(Ordering::SeqCst));

    let events = drain(&mut events);
    assert_eq!(
        count(&events, |e| matches!(e, SessionEvent::PersistenceFailed { .. })),
        1
    );
    assert_eq!(
        count(&events, |e| matches!(e, SessionEvent::AssessmentCompleted { .. })),
        0
    );
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::Finalized { score: 1, .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fullscreen_exit_blocks_input_without_violation() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    handle.report_fullscreen(false).unwrap();
    assert_eq!(handle.select(0, "A").await, Err(SessionError::FullscreenRequired));
    assert_eq!(handle.navigate(1).await, Err(SessionError::FullscreenRequired));
    assert!(handle.status().needs_fullscreen);

    handle.report_fullscreen(true).unwrap();
    handle.select(0, "A").await.unwrap();
    handle.submit().unwrap();
    let outcome = handle.finished().await.unwrap();

    assert_eq!(outcome.trigger, FinalizeTrigger::ManualSubmit);
    assert_eq!(outcome.result.tab_switches, 0);
    assert_eq!(outcome.result.score, 1);

    let events = drain(&mut events);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::FullscreenLost)), 1);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::FullscreenRestored)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_face_polling_is_advisory() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let handle = gate.start().unwrap();
    assert_eq!(handle.status().face, FacePresenceStatus::Present);

    rig.detector.faces.store(2, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(handle.status().face, FacePresenceStatus::Multiple);
    assert_eq!(handle.status().state, SessionState::InProgress);

    rig.detector.broken.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.status().face, FacePresenceStatus::Error);
    assert_eq!(handle.status().state, SessionState::InProgress);

    rig.detector.faces.store(0, Ordering::SeqCst);
    rig.detector.broken.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.status().face, FacePresenceStatus::Absent);

    handle.submit().unwrap();
    let outcome = handle.finished().await.unwrap();
    assert_eq!(outcome.trigger, FinalizeTrigger::ManualSubmit);
}

#[tokio::test(start_paused = true)]
async fn test_commands_after_submit_are_rejected() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let handle = gate.start().unwrap();

    handle.submit().unwrap();
    assert_eq!(handle.select(0, "A").await, Err(SessionError::NotInProgress));

    let outcome = handle.finished().await.unwrap();
    assert!(outcome.result.user_answers.iter().all(Option::is_none));
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_answer_is_rejected() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let handle = gate.start().unwrap();

    assert_eq!(
        handle.select(40, "A").await,
        Err(SessionError::QuestionOutOfRange { index: 40, len: 40 })
    );
    assert_eq!(handle.status().state, SessionState::InProgress);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_exam_releases_camera_without_saving() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let handle = gate.start().unwrap();

    drop(handle);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(rig.camera.stream.stopped.load(Ordering::SeqCst));
    assert!(rig.store.saved().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stuck_fullscreen_exit_still_saves_result() {
    let rig = Rig::new();
    rig.viewport.hang_exit.store(true, Ordering::SeqCst);
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    handle.select(0, "A").await.unwrap();
    handle.submit().unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(60), handle.finished())
        .await
        .expect("finalize waited on the viewport")
        .unwrap();

    assert_eq!(outcome.result.score, 1);
    assert!(matches!(outcome.persistence, Persistence::Saved { .. }));
    assert_eq!(rig.viewport.exits.load(Ordering::SeqCst), 1);
    assert!(rig.camera.stream.stopped.load(Ordering::SeqCst));
    assert_eq!(rig.store.saved().len(), 1);

    let events = drain(&mut events);
    assert_eq!(count(&events, |e| matches!(e, SessionEvent::Finalized { .. })), 1);
    assert_eq!(
        count(&events, |e| matches!(e, SessionEvent::AssessmentCompleted { .. })),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_submit_then_drop_still_saves_result() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let handle = gate.start().unwrap();

    handle.select(0, "A").await.unwrap();
    handle.submit().unwrap();
    drop(handle);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let saved = rig.store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].score, 1);
    assert!(rig.camera.stream.stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_third_switch_then_drop_still_saves_result() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let handle = gate.start().unwrap();

    for _ in 0..3 {
        handle.report_visibility(Visibility::Hidden).unwrap();
        handle.report_visibility(Visibility::Visible).unwrap();
    }
    drop(handle);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let saved = rig.store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].tab_switches, 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_face_events_after_finalize() {
    let rig = Rig::new();
    let mut gate = rig.ready_gate(SessionConfig::exam("physics"), paper(40)).await;
    let mut events = gate.subscribe();
    let handle = gate.start().unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    handle.submit().unwrap();
    let status = handle.watch_status();
    handle.finished().await.unwrap();

    rig.detector.faces.store(2, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    rig.detector.broken.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let events = drain(&mut events);
    let finalized = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Finalized { .. }))
        .expect("no Finalized event");
    assert!(
        !events[finalized..]
            .iter()
            .any(|e| matches!(e, SessionEvent::FacePresence { .. })),
        "face event after finalize: {:?}",
        events
    );
    assert_eq!(status.borrow().face, FacePresenceStatus::Present);
    assert_eq!(status.borrow().state, SessionState::Completed);
}
