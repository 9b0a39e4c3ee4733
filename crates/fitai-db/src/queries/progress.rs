//! Database query functions for the `progress` table.
//!
//! One row per `(user, week)`. Weeks accumulate; a repeated check-in for the
//! same week overwrites that week's row.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Difficulty, ProgressEntry};

/// Parameters for recording a weekly check-in.
#[derive(Debug, Clone)]
pub struct NewProgress<'a> {
    pub user_id: Uuid,
    pub week: i32,
    pub weight_kg: f64,
    pub difficulty: Difficulty,
    pub notes: Option<&'a str>,
}

/// Record the check-in for `entry.week`, replacing an earlier one for the
/// same week.
pub async fn record_progress(pool: &PgPool, entry: &NewProgress<'_>) -> Result<ProgressEntry> {
    let row = sqlx::query_as::<_, ProgressEntry>(
        "INSERT INTO progress (user_id, week, weight_kg, difficulty, notes) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, week) DO UPDATE \
         SET weight_kg = excluded.weight_kg, difficulty = excluded.difficulty, \
             notes = excluded.notes, recorded_at = now() \
         RETURNING *",
    )
    .bind(entry.user_id)
    .bind(entry.week)
    .bind(entry.weight_kg)
    .bind(entry.difficulty)
    .bind(entry.notes)
    .fetch_one(pool)
    .await
    .context("failed to record progress")?;

    Ok(row)
}

/// All check-ins for a user, oldest first.
pub async fn list_progress(pool: &PgPool, user_id: Uuid) -> Result<Vec<ProgressEntry>> {
    let rows = sqlx::query_as::<_, ProgressEntry>(
        "SELECT * FROM progress WHERE user_id = $1 ORDER BY week ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list progress")?;

    Ok(rows)
}
