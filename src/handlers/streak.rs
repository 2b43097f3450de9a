// src/handlers/streak.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Local, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::AppError,
    models::streak::{StreakHistoryEntry, StreakResponse, StreakRow, StreakSnapshot, StreakState},
    utils::{
        jwt::Claims,
        streak::{apply_streak_progress, effective_current_streak},
    },
};

/// Records one completed quiz or exam against the user's streak.
///
/// Runs inside the caller's transaction so the streak only moves when the
/// result itself is stored. The user's streak row is locked for the update.
pub(crate) async fn record_activity(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    at: DateTime<Utc>,
) -> Result<StreakSnapshot, AppError> {
    sqlx::query("INSERT INTO user_streaks (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    let row: StreakRow = sqlx::query_as(
        r#"
        SELECT current_streak, longest_streak, last_activity_at
        FROM user_streaks
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    let local = at.with_timezone(&Local);
    let day = local.date_naive();

    let mut state = StreakState::from_row(row);
    let existing: Option<StreakHistoryEntry> = sqlx::query_as(
        "SELECT day, streak_count, quizzes_completed FROM streak_history WHERE user_id = $1 AND day = $2",
    )
    .bind(user_id)
    .bind(day)
    .fetch_optional(&mut **tx)
    .await?;
    if let Some(entry) = existing {
        state.history.insert(entry.day, entry.into());
    }

    let snapshot = apply_streak_progress(&mut state, local, 1);
    let today = state.history.get(&day).copied().unwrap_or_default();

    sqlx::query(
        r#"
        UPDATE user_streaks
        SET current_streak = $2, longest_streak = $3, last_activity_at = $4
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(state.current_streak as i32)
    .bind(state.longest_streak as i32)
    .bind(state.last_activity_at)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO streak_history (user_id, day, streak_count, quizzes_completed)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, day) DO UPDATE SET
            streak_count = EXCLUDED.streak_count,
            quizzes_completed = EXCLUDED.quizzes_completed
        "#,
    )
    .bind(user_id)
    .bind(day)
    .bind(today.streak_count as i32)
    .bind(today.quizzes_completed as i32)
    .execute(&mut **tx)
    .await?;

    Ok(snapshot)
}

/// Returns the current user's streak, history and completion counts.
///
/// A streak whose last activity is older than yesterday is reset to 0 here,
/// so the stored value matches what is displayed.
pub async fn get_streak(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let row: Option<StreakRow> = sqlx::query_as(
        "SELECT current_streak, longest_streak, last_activity_at FROM user_streaks WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch streak: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut state = row.map(StreakState::from_row).unwrap_or_default();
    let current = effective_current_streak(&state, Local::now());
    if current != state.current_streak {
        tracing::info!(user_id, previous = state.current_streak, "streak broken, resetting to 0");
        sqlx::query("UPDATE user_streaks SET current_streak = 0 WHERE user_id = $1")
            .bind(user_id)
            .execute(&pool)
            .await?;
        state.current_streak = current;
    }

    let streak_history: Vec<StreakHistoryEntry> = sqlx::query_as(
        r#"
        SELECT day, streak_count, quizzes_completed
        FROM streak_history
        WHERE user_id = $1
        ORDER BY day DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let (quiz_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quiz_records WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await?;
    let (exam_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM exam_records WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(StreakResponse {
        current_streak: state.current_streak,
        longest_streak: state.longest_streak,
        last_quiz_date: state.last_activity_at,
        streak_history,
        quiz_count,
        exam_count,
    }))
}
