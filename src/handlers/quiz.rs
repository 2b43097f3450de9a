// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::QUIZ_QUESTION_COUNT,
    error::AppError,
    handlers::{fetch_questions, streak::record_activity},
    models::exam_record::{QuizResult, SaveResultResponse},
    utils::jwt::Claims,
};

/// Serves a practice quiz of up to 20 questions of the subject.
pub async fn get_quiz_questions(
    State(pool): State<PgPool>,
    Path(subject): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let questions = fetch_questions(&pool, &subject, QUIZ_QUESTION_COUNT).await?;

    if questions.is_empty() {
        return Err(AppError::NotFound(format!(
            "No quiz questions found for {}",
            subject
        )));
    }

    tracing::info!("Serving {} quiz questions for {}", questions.len(), subject);
    Ok(Json(questions))
}

/// Stores a quiz attempt and advances the user's streak.
pub async fn save_quiz_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<QuizResult>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let completed_at = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO quiz_records (
            user_id, subject, score, total_questions, questions, user_answers,
            correct_answers, completed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user_id)
    .bind(&req.subject)
    .bind(req.score as i32)
    .bind(req.total_questions as i32)
    .bind(SqlJson(&req.questions))
    .bind(SqlJson(&req.user_answers))
    .bind(SqlJson(&req.correct_answers))
    .bind(completed_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert quiz record: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let streak = record_activity(&mut tx, user_id, completed_at).await?;
    tx.commit().await?;

    tracing::info!(user_id, subject = %req.subject, score = req.score, "quiz result saved");

    Ok(Json(SaveResultResponse {
        message: "Quiz result saved successfully".to_string(),
        streak,
    }))
}
