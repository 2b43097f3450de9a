// src/session/clock.rs

/// Outcome of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Remaining(u64),
    /// Time ran out on this tick. Reported once per clock.
    Expired,
    /// The clock is stopped or already expired; nothing happened.
    Idle,
}

#[derive(Debug, Clone)]
pub struct ExamClock {
    configured_secs: u64,
    time_left_secs: u64,
    expired: bool,
    stopped: bool,
}

impl ExamClock {
    pub fn new(configured_secs: u64) -> Self {
        Self {
            configured_secs,
            time_left_secs: configured_secs,
            expired: false,
            stopped: false,
        }
    }

    pub fn configured_secs(&self) -> u64 {
        self.configured_secs
    }

    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    pub fn is_running(&self) -> bool {
        !self.stopped && !self.expired
    }

    /// Advance the countdown by one second. Never goes below zero.
    pub fn tick(&mut self) -> Tick {
        if !self.is_running() {
            return Tick::Idle;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        if self.time_left_secs == 0 {
            self.expired = true;
            Tick::Expired
        } else {
            Tick::Remaining(self.time_left_secs)
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}
