//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

/// Insert a new user. Returns `None` when the username is already taken.
pub async fn insert_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    password_salt: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password_hash, password_salt) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (username) DO NOTHING \
         RETURNING *",
    )
    .bind(username)
    .bind(password_hash)
    .bind(password_salt)
    .fetch_optional(pool)
    .await
    .context("failed to insert user")?;

    Ok(user)
}

/// Fetch a user by ID.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Fetch a user by username.
pub async fn get_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by username")?;

    Ok(user)
}

/// List all users ordered by username.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(pool)
        .await
        .context("failed to list users")?;

    Ok(users)
}

/// Delete a user. Profiles, plans, progress, and preferences go with it
/// through `ON DELETE CASCADE`. Returns `false` if no such user existed.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}
