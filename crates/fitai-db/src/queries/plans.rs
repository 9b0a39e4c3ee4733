//! Database query functions for the `plans` table.
//!
//! Plans are keyed by `(user_id, week)` with last-write-wins semantics.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Plan;

/// Insert the plan for `(user_id, week)`, replacing the body of any
/// existing plan for the same week.
pub async fn upsert_plan(pool: &PgPool, user_id: Uuid, week: i32, body: &str) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (user_id, week, body) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, week) DO UPDATE SET \
             body = excluded.body, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(user_id)
    .bind(week)
    .bind(body)
    .fetch_one(pool)
    .await
    .context("failed to upsert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// Fetch the plan a user has for a given week.
pub async fn get_plan_for_week(pool: &PgPool, user_id: Uuid, week: i32) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE user_id = $1 AND week = $2")
        .bind(user_id)
        .bind(week)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan for week")?;

    Ok(plan)
}

/// Fetch the plan with the highest week number for a user.
pub async fn latest_plan(pool: &PgPool, user_id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE user_id = $1 ORDER BY week DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch latest plan")?;

    Ok(plan)
}

/// All plans for a user, newest week first.
pub async fn list_plans_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Plan>> {
    let plans =
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE user_id = $1 ORDER BY week DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .context("failed to list plans for user")?;

    Ok(plans)
}

/// Delete a plan together with the progress check-in recorded for the same
/// `(user, week)`. Returns the deleted plan, or `None` if it did not exist.
pub async fn delete_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = sqlx::query_as::<_, Plan>("DELETE FROM plans WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("failed to delete plan")?;

    if let Some(ref p) = plan {
        sqlx::query("DELETE FROM progress WHERE user_id = $1 AND week = $2")
            .bind(p.user_id)
            .bind(p.week)
            .execute(&mut *tx)
            .await
            .context("failed to delete progress for plan week")?;
    }

    tx.commit().await.context("failed to commit plan deletion")?;
    Ok(plan)
}
