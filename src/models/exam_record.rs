// src/models/exam_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::models::streak::StreakSnapshot;

/// The scored outcome of one proctored exam session.
///
/// This is both what the session controller produces and the body accepted by
/// `POST /api/exam/save-result`, so field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_exam_result))]
pub struct ExamResult {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub score: u32,
    pub total_questions: u32,
    /// Question texts in the order they were presented.
    pub questions: Vec<String>,
    /// One entry per question; `None` for unanswered positions.
    pub user_answers: Vec<Option<String>>,
    pub correct_answers: Vec<String>,
    /// Seconds between exam start and finalize, clamped to the exam length.
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    pub tab_switches: u32,
    pub violations: u32,
    pub face_captured: bool,
    pub completed_at: DateTime<Utc>,
}

fn validate_exam_result(result: &ExamResult) -> Result<(), ValidationError> {
    validate_answer_sheet(
        result.score,
        result.total_questions,
        &result.user_answers,
        &result.correct_answers,
    )
}

/// Body of `POST /api/quiz/save-result`. Quizzes are not proctored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_quiz_result))]
pub struct QuizResult {
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    pub score: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub user_answers: Vec<Option<String>>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
}

fn validate_quiz_result(result: &QuizResult) -> Result<(), ValidationError> {
    if result.score > result.total_questions {
        return Err(ValidationError::new("score_exceeds_total"));
    }
    Ok(())
}

/// Shared consistency rules for a submitted answer sheet.
fn validate_answer_sheet(
    score: u32,
    total_questions: u32,
    user_answers: &[Option<String>],
    correct_answers: &[String],
) -> Result<(), ValidationError> {
    if score > total_questions {
        return Err(ValidationError::new("score_exceeds_total"));
    }
    let total = total_questions as usize;
    if user_answers.len() != total || correct_answers.len() != total {
        return Err(ValidationError::new("answers_not_aligned"));
    }
    Ok(())
}

/// Represents the 'exam_records' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: i64,
    pub subject: String,
    pub score: i32,
    pub total_questions: i32,
    #[sqlx(json)]
    pub questions: Vec<String>,
    #[sqlx(json)]
    pub user_answers: Vec<Option<String>>,
    #[sqlx(json)]
    pub correct_answers: Vec<String>,
    #[serde(rename = "duration")]
    pub duration_seconds: i64,
    pub tab_switches: i32,
    pub violations: i32,
    pub face_captured: bool,
    pub completed_at: DateTime<Utc>,
}

/// Acknowledgement returned by both save-result endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResultResponse {
    pub message: String,
    pub streak: StreakSnapshot,
}

/// DTO for the exam history listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamHistoryResponse {
    pub exam_history: Vec<ExamRecord>,
}
