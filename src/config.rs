// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

/// Number of questions in a mock exam paper.
pub const EXAM_QUESTION_COUNT: i64 = 40;

/// Upper bound on the number of questions in a practice quiz.
pub const QUIZ_QUESTION_COUNT: i64 = 20;

/// Mock exams run for 45 minutes.
pub const EXAM_DURATION_SECS: u64 = 45 * 60;

/// Tab switches tolerated before the exam is submitted automatically.
pub const TAB_SWITCH_LIMIT: u32 = 3;

pub const CLOCK_TICK: Duration = Duration::from_secs(1);
pub const FACE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fullscreen activation is not reliably finished when the request resolves,
/// so the observed state is read again after this delay.
pub const FULLSCREEN_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Upper bound on waiting for the viewport to leave fullscreen after an exam.
pub const DEVICE_RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
        }
    }
}

/// Per-session tunables for the proctored exam controller.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub subject: String,
    pub duration_secs: u64,
    pub tab_switch_limit: u32,
    pub tick: Duration,
    pub face_poll_interval: Duration,
    pub fullscreen_settle: Duration,
}

impl SessionConfig {
    /// Standard 45-minute mock exam for `subject`.
    pub fn exam(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            duration_secs: EXAM_DURATION_SECS,
            tab_switch_limit: TAB_SWITCH_LIMIT,
            tick: CLOCK_TICK,
            face_poll_interval: FACE_POLL_INTERVAL,
            fullscreen_settle: FULLSCREEN_SETTLE_DELAY,
        }
    }

    pub fn with_duration_secs(mut self, duration_secs: u64) -> Self {
        self.duration_secs = duration_secs;
        self
    }
}
