//! Database query functions for the `preferences` key/value table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

/// Set a preference value, replacing any previous value for the key.
pub async fn upsert_preference(pool: &PgPool, user_id: Uuid, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO preferences (user_id, key, value) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, key) DO UPDATE SET value = excluded.value",
    )
    .bind(user_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .context("failed to upsert preference")?;

    Ok(())
}

/// Fetch a single preference value.
pub async fn get_preference(pool: &PgPool, user_id: Uuid, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM preferences WHERE user_id = $1 AND key = $2")
            .bind(user_id)
            .bind(key)
            .fetch_optional(pool)
            .await
            .context("failed to fetch preference")?;

    Ok(value)
}

