//! Database query functions for the `user_profiles` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DietType, Goal, Profile, WorkoutPlace};

/// Parameters for writing a profile.
#[derive(Debug, Clone)]
pub struct NewProfile<'a> {
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub state: &'a str,
    pub city: &'a str,
    pub goal: Goal,
    pub diet: DietType,
    pub workout_place: WorkoutPlace,
    pub weekly_budget: i32,
}

/// Insert or replace the profile for a user.
pub async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    profile: &NewProfile<'_>,
) -> Result<Profile> {
    let row = sqlx::query_as::<_, Profile>(
        "INSERT INTO user_profiles \
         (user_id, age, height_cm, weight_kg, state, city, goal, diet, workout_place, weekly_budget) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (user_id) DO UPDATE SET \
             age = excluded.age, \
             height_cm = excluded.height_cm, \
             weight_kg = excluded.weight_kg, \
             state = excluded.state, \
             city = excluded.city, \
             goal = excluded.goal, \
             diet = excluded.diet, \
             workout_place = excluded.workout_place, \
             weekly_budget = excluded.weekly_budget, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(user_id)
    .bind(profile.age)
    .bind(profile.height_cm)
    .bind(profile.weight_kg)
    .bind(profile.state)
    .bind(profile.city)
    .bind(profile.goal)
    .bind(profile.diet)
    .bind(profile.workout_place)
    .bind(profile.weekly_budget)
    .fetch_one(pool)
    .await
    .context("failed to upsert profile")?;

    Ok(row)
}

/// Fetch the profile for a user.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>> {
    let row = sqlx::query_as::<_, Profile>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch profile")?;

    Ok(row)
}

/// Record a new body weight on an existing profile.
pub async fn update_weight(pool: &PgPool, user_id: Uuid, weight_kg: f64) -> Result<()> {
    let result = sqlx::query(
        "UPDATE user_profiles SET weight_kg = $1, updated_at = now() WHERE user_id = $2",
    )
    .bind(weight_kg)
    .bind(user_id)
    .execute(pool)
    .await
    .context("failed to update profile weight")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("profile for user {user_id} not found");
    }

    Ok(())
}
