// src/utils/streak.rs

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::models::streak::{StreakDay, StreakSnapshot, StreakState};

/// Applies one completed quiz or exam to the user's streak.
///
/// Calendar days are taken in the time zone of `at`, so the caller decides
/// where midnight falls. `increment` is the number of completions recorded
/// against the day (normally 1).
///
/// * No prior activity: the streak starts at 1.
/// * Prior activity on the same day: the streak is unchanged.
/// * Prior activity on the previous day: the streak grows by one.
/// * Anything older: the streak restarts at 1.
pub fn apply_streak_progress<Tz: TimeZone>(
    state: &mut StreakState,
    at: DateTime<Tz>,
    increment: u32,
) -> StreakSnapshot {
    let day = at.date_naive();

    let current = match state.last_activity_at {
        None => 1,
        Some(last) => {
            let last_day = last.with_timezone(&at.timezone()).date_naive();
            match previous_day(day) {
                _ if last_day == day => state.current_streak,
                Some(yesterday) if last_day == yesterday => state.current_streak + 1,
                _ if last_day < day => 1,
                // Last activity lies after `at` (clock skew); leave it alone.
                _ => state.current_streak,
            }
        }
    };

    state.current_streak = current;
    state.longest_streak = state.longest_streak.max(current);
    state.last_activity_at = Some(at.with_timezone(&Utc));

    let entry = state.history.entry(day).or_insert(StreakDay {
        streak_count: current,
        quizzes_completed: 0,
    });
    entry.streak_count = current;
    entry.quizzes_completed += increment;

    tracing::debug!(%day, current, longest = state.longest_streak, "streak updated");

    StreakSnapshot {
        current,
        longest: state.longest_streak,
    }
}

/// The streak as it should be displayed on `today`.
///
/// A streak whose last activity is older than yesterday is already broken even
/// though nothing has been written since, so it reads as 0.
pub fn effective_current_streak<Tz: TimeZone>(state: &StreakState, today: DateTime<Tz>) -> u32 {
    let Some(last) = state.last_activity_at else {
        return state.current_streak;
    };
    let last_day = last.with_timezone(&today.timezone()).date_naive();
    match previous_day(today.date_naive()) {
        Some(yesterday) if last_day < yesterday => 0,
        _ => state.current_streak,
    }
}

fn previous_day(day: NaiveDate) -> Option<NaiveDate> {
    day.checked_sub_days(Days::new(1))
}
