// src/handlers/mod.rs

use sqlx::PgPool;

use crate::{error::AppError, models::question::Question};

pub mod exam;
pub mod quiz;
pub mod streak;

/// Fetches up to `limit` questions of `subject` (case-insensitive) in the
/// database's random order.
pub(crate) async fn fetch_questions(
    pool: &PgPool,
    subject: &str,
    limit: i64,
) -> Result<Vec<Question>, AppError> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, subject, content, options, answer
        FROM questions
        WHERE LOWER(subject) = LOWER($1)
        ORDER BY RANDOM()
        LIMIT $2
        "#,
    )
    .bind(subject)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions for {}: {:?}", subject, e);
        AppError::InternalServerError(e.to_string())
    })
}
