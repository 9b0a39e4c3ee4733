//! Integration tests for the user, profile, plan, progress, and preference
//! query modules.
//!
//! Each test creates an isolated temporary database on the shared test
//! server (see `fitai-test-utils`) and drops it on completion.

use sqlx::PgPool;
use uuid::Uuid;

use fitai_db::models::{Difficulty, DietType, Goal, User, WorkoutPlace};
use fitai_db::pool;
use fitai_db::queries::profiles::NewProfile;
use fitai_db::queries::progress::NewProgress;
use fitai_db::queries::{plans, preferences, profiles, progress, users};
use fitai_test_utils::{create_test_db, drop_test_db};

async fn insert_test_user(pool: &PgPool, username: &str) -> User {
    users::insert_user(pool, username, "hash", "salt")
        .await
        .expect("insert_user should succeed")
        .expect("username should be free")
}

fn sample_profile() -> NewProfile<'static> {
    NewProfile {
        age: 22,
        height_cm: 170.0,
        weight_kg: 68.5,
        state: "Karnataka",
        city: "Mysuru",
        goal: Goal::FatLoss,
        diet: DietType::Vegetarian,
        workout_place: WorkoutPlace::Home,
        weekly_budget: 500,
    }
}

// -----------------------------------------------------------------------
// Migrations
// -----------------------------------------------------------------------

#[tokio::test]
async fn migrations_create_all_tables() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool).await.unwrap();
    let names: Vec<&str> = counts.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, pool::TABLES);
    assert!(counts.iter().all(|(_, rows)| *rows == 0));

    // Running migrations twice is a no-op.
    pool::run_migrations(&pool).await.unwrap();

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[tokio::test]
async fn insert_user_rejects_duplicate_username() {
    let (pool, db_name) = create_test_db().await;

    insert_test_user(&pool, "ravi").await;
    let dup = users::insert_user(&pool, "ravi", "other", "other")
        .await
        .unwrap();
    assert!(dup.is_none(), "duplicate username should not insert");

    let all = users::list_users(&pool).await.unwrap();
    assert_eq!(all.len(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn get_user_by_username_and_id() {
    let (pool, db_name) = create_test_db().await;

    let user = insert_test_user(&pool, "meera").await;
    let by_name = users::get_user_by_username(&pool, "meera")
        .await
        .unwrap()
        .expect("user should exist");
    assert_eq!(by_name.id, user.id);

    assert!(users::get_user(&pool, Uuid::new_v4()).await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn delete_user_cascades() {
    let (pool, db_name) = create_test_db().await;

    let user = insert_test_user(&pool, "cascade").await;
    profiles::upsert_profile(&pool, user.id, &sample_profile())
        .await
        .unwrap();
    plans::upsert_plan(&pool, user.id, 1, "Day 1: rest").await.unwrap();
    preferences::upsert_preference(&pool, user.id, "user_preferences", "no burpees")
        .await
        .unwrap();

    assert!(users::delete_user(&pool, user.id).await.unwrap());
    assert!(!users::delete_user(&pool, user.id).await.unwrap());

    assert!(profiles::get_profile(&pool, user.id).await.unwrap().is_none());
    assert!(plans::list_plans_for_user(&pool, user.id).await.unwrap().is_empty());
    assert!(
        preferences::get_preference(&pool, user.id, "user_preferences")
            .await
            .unwrap()
            .is_none()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Profiles
// -----------------------------------------------------------------------

#[tokio::test]
async fn upsert_profile_replaces_existing() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "profiled").await;

    let first = profiles::upsert_profile(&pool, user.id, &sample_profile())
        .await
        .unwrap();
    assert_eq!(first.goal, Goal::FatLoss);

    let changed = NewProfile {
        goal: Goal::MuscleGain,
        workout_place: WorkoutPlace::Gym,
        ..sample_profile()
    };
    let second = profiles::upsert_profile(&pool, user.id, &changed)
        .await
        .unwrap();
    assert_eq!(second.goal, Goal::MuscleGain);
    assert_eq!(second.workout_place, WorkoutPlace::Gym);

    profiles::update_weight(&pool, user.id, 66.0).await.unwrap();
    let fetched = profiles::get_profile(&pool, user.id)
        .await
        .unwrap()
        .expect("profile should exist");
    assert_eq!(fetched.weight_kg, 66.0);
    assert_eq!(fetched.city, "Mysuru");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_weight_without_profile_fails() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "noprofile").await;

    let result = profiles::update_weight(&pool, user.id, 70.0).await;
    assert!(result.is_err());

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Plans
// -----------------------------------------------------------------------

#[tokio::test]
async fn upsert_plan_is_last_write_wins_per_week() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "planner").await;

    let first = plans::upsert_plan(&pool, user.id, 1, "first body").await.unwrap();
    let second = plans::upsert_plan(&pool, user.id, 1, "second body").await.unwrap();

    assert_eq!(first.id, second.id, "same week keeps the same row");
    assert_eq!(second.body, "second body");
    assert!(second.updated_at >= first.updated_at);

    let all = plans::list_plans_for_user(&pool, user.id).await.unwrap();
    assert_eq!(all.len(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn history_is_newest_week_first() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "history").await;

    assert!(plans::latest_plan(&pool, user.id).await.unwrap().is_none());

    for week in [1, 3, 2] {
        plans::upsert_plan(&pool, user.id, week, &format!("week {week}"))
            .await
            .unwrap();
    }

    let weeks: Vec<i32> = plans::list_plans_for_user(&pool, user.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.week)
        .collect();
    assert_eq!(weeks, vec![3, 2, 1]);

    let latest = plans::latest_plan(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(latest.body, "week 3");

    let week2 = plans::get_plan_for_week(&pool, user.id, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(week2.body, "week 2");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn delete_plan_removes_matching_progress() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "deleter").await;

    plans::upsert_plan(&pool, user.id, 1, "week 1").await.unwrap();
    let week2 = plans::upsert_plan(&pool, user.id, 2, "week 2").await.unwrap();
    for week in [2, 3] {
        progress::record_progress(
            &pool,
            &NewProgress {
                user_id: user.id,
                week,
                weight_kg: 70.0,
                difficulty: Difficulty::JustRight,
                notes: None,
            },
        )
        .await
        .unwrap();
    }

    let deleted = plans::delete_plan(&pool, week2.id).await.unwrap();
    assert_eq!(deleted.map(|p| p.week), Some(2));

    let remaining: Vec<i32> = progress::list_progress(&pool, user.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.week)
        .collect();
    assert_eq!(remaining, vec![3]);

    assert!(plans::delete_plan(&pool, week2.id).await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

// -----------------------------------------------------------------------
// Progress and preferences
// -----------------------------------------------------------------------

#[tokio::test]
async fn progress_accumulates_across_weeks_in_order() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "tracker").await;

    for (week, weight) in [(3, 66.0), (2, 67.5)] {
        progress::record_progress(
            &pool,
            &NewProgress {
                user_id: user.id,
                week,
                weight_kg: weight,
                difficulty: Difficulty::TooHard,
                notes: Some("knee pain"),
            },
        )
        .await
        .unwrap();
    }

    let rows = progress::list_progress(&pool, user.id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].week, 2);
    assert_eq!(rows[1].weight_kg, 66.0);
    assert_eq!(rows[0].notes.as_deref(), Some("knee pain"));
    assert_eq!(rows[0].difficulty, Difficulty::TooHard);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn repeated_check_in_replaces_that_weeks_row() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "rechecker").await;

    let first = progress::record_progress(
        &pool,
        &NewProgress {
            user_id: user.id,
            week: 2,
            weight_kg: 68.0,
            difficulty: Difficulty::TooEasy,
            notes: Some("first try"),
        },
    )
    .await
    .unwrap();
    let second = progress::record_progress(
        &pool,
        &NewProgress {
            user_id: user.id,
            week: 2,
            weight_kg: 67.2,
            difficulty: Difficulty::JustRight,
            notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(first.id, second.id);

    let rows = progress::list_progress(&pool, user.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].week, 2);
    assert_eq!(rows[0].weight_kg, 67.2);
    assert_eq!(rows[0].difficulty, Difficulty::JustRight);
    assert!(rows[0].notes.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn preferences_upsert_and_fetch() {
    let (pool, db_name) = create_test_db().await;
    let user = insert_test_user(&pool, "prefs").await;

    assert!(
        preferences::get_preference(&pool, user.id, "user_preferences")
            .await
            .unwrap()
            .is_none()
    );

    preferences::upsert_preference(&pool, user.id, "user_preferences", "I hate burpees")
        .await
        .unwrap();
    preferences::upsert_preference(&pool, user.id, "user_preferences", "South Indian breakfast")
        .await
        .unwrap();

    let value = preferences::get_preference(&pool, user.id, "user_preferences")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("South Indian breakfast"));

    pool.close().await;
    drop_test_db(&db_name).await;
}
