// src/models/streak.rs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user consecutive-day activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Keyed by calendar day. Callers may load only the days they touch.
    pub history: BTreeMap<NaiveDate, StreakDay>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakDay {
    pub streak_count: u32,
    pub quizzes_completed: u32,
}

/// Current and longest streak after an update, as returned to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSnapshot {
    pub current: u32,
    pub longest: u32,
}

/// Represents the 'user_streaks' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct StreakRow {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Represents the 'streak_history' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakHistoryEntry {
    #[serde(rename = "date")]
    pub day: NaiveDate,
    pub streak_count: i32,
    pub quizzes_completed: i32,
}

/// DTO for `GET /api/streak`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_quiz_date: Option<DateTime<Utc>>,
    /// Newest day first.
    pub streak_history: Vec<StreakHistoryEntry>,
    pub quiz_count: i64,
    pub exam_count: i64,
}

impl From<StreakHistoryEntry> for StreakDay {
    fn from(entry: StreakHistoryEntry) -> Self {
        Self {
            streak_count: entry.streak_count.max(0) as u32,
            quizzes_completed: entry.quizzes_completed.max(0) as u32,
        }
    }
}

impl StreakState {
    pub fn from_row(row: StreakRow) -> Self {
        Self {
            current_streak: row.current_streak.max(0) as u32,
            longest_streak: row.longest_streak.max(0) as u32,
            last_activity_at: row.last_activity_at,
            history: BTreeMap::new(),
        }
    }
}
