// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::EXAM_QUESTION_COUNT,
    error::AppError,
    handlers::{fetch_questions, streak::record_activity},
    models::exam_record::{ExamHistoryResponse, ExamRecord, ExamResult, SaveResultResponse},
    utils::jwt::Claims,
};

/// Serves a mock exam paper: exactly 40 questions of the subject.
///
/// Returns 404 when the subject has no questions and 400 when it has fewer
/// than a full paper.
pub async fn get_exam_questions(
    State(pool): State<PgPool>,
    Path(subject): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let questions = fetch_questions(&pool, &subject, EXAM_QUESTION_COUNT).await?;

    if questions.is_empty() {
        return Err(AppError::NotFound(format!(
            "No exam questions found for {}",
            subject
        )));
    }

    if (questions.len() as i64) < EXAM_QUESTION_COUNT {
        return Err(AppError::BadRequest(format!(
            "Insufficient questions for {}. Found {}, required {}.",
            subject,
            questions.len(),
            EXAM_QUESTION_COUNT
        )));
    }

    tracing::info!("Serving {} exam questions for {}", questions.len(), subject);
    Ok(Json(questions))
}

/// Stores a finalized exam and advances the user's streak.
///
/// The record and the streak update commit together. The completion time is
/// the server's clock, not the client's.
pub async fn save_exam_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ExamResult>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let completed_at = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO exam_records (
            user_id, subject, score, total_questions, questions, user_answers,
            correct_answers, duration_seconds, tab_switches, violations,
            face_captured, completed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(user_id)
    .bind(&req.subject)
    .bind(req.score as i32)
    .bind(req.total_questions as i32)
    .bind(SqlJson(&req.questions))
    .bind(SqlJson(&req.user_answers))
    .bind(SqlJson(&req.correct_answers))
    .bind(req.duration_seconds as i64)
    .bind(req.tab_switches as i32)
    .bind(req.violations as i32)
    .bind(req.face_captured)
    .bind(completed_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert exam record: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let streak = record_activity(&mut tx, user_id, completed_at).await?;
    tx.commit().await?;

    tracing::info!(
        user_id,
        subject = %req.subject,
        score = req.score,
        total = req.total_questions,
        tab_switches = req.tab_switches,
        "exam result saved"
    );

    Ok(Json(SaveResultResponse {
        message: "Exam result saved successfully".to_string(),
        streak,
    }))
}

/// Lists the current user's exam attempts, newest first.
pub async fn get_exam_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let exam_history: Vec<ExamRecord> = sqlx::query_as(
        r#"
        SELECT
            id, subject, score, total_questions, questions, user_answers,
            correct_answers, duration_seconds, tab_switches, violations,
            face_captured, completed_at
        FROM exam_records
        WHERE user_id = $1
        ORDER BY completed_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exam history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(ExamHistoryResponse { exam_history }))
}
