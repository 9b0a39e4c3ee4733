//! CLI handlers for `fitai profile` subcommands.

use anyhow::Result;
use sqlx::PgPool;

use fitai_core::profile::ProfileInput;
use fitai_core::service::PREFERENCES_KEY;
use fitai_db::models::Profile;
use fitai_db::queries::{preferences, profiles};

use crate::ProfileCommands;
use crate::user_cmds::find_user;

/// Dispatch a `ProfileCommands` variant to the appropriate handler.
pub async fn run_profile_command(command: ProfileCommands, pool: &PgPool) -> Result<()> {
    match command {
        ProfileCommands::Set {
            username,
            age,
            height_cm,
            weight_kg,
            state,
            city,
            goal,
            diet,
            workout_place,
            weekly_budget,
        } => {
            let input = ProfileInput {
                age,
                height_cm,
                weight_kg,
                state,
                city,
                goal,
                diet,
                workout_place,
                weekly_budget,
            };
            cmd_set(pool, &username, &input).await
        }
        ProfileCommands::Show { username } => cmd_show(pool, &username).await,
    }
}

async fn cmd_set(pool: &PgPool, username: &str, input: &ProfileInput) -> Result<()> {
    let user = find_user(pool, username).await?;
    input.validate()?;
    let profile = profiles::upsert_profile(pool, user.id, &input.as_new_profile()).await?;
    println!("Profile saved for {}.", user.username);
    println!();
    print_profile(&profile);
    Ok(())
}

async fn cmd_show(pool: &PgPool, username: &str) -> Result<()> {
    let user = find_user(pool, username).await?;
    let Some(profile) = profiles::get_profile(pool, user.id).await? else {
        println!("{} has no profile yet. Set one with `fitai profile set`.", user.username);
        return Ok(());
    };
    print_profile(&profile);

    if let Some(text) = preferences::get_preference(pool, user.id, PREFERENCES_KEY).await? {
        println!("  Preferences:   {text}");
    }
    Ok(())
}

fn print_profile(profile: &Profile) {
    println!("  Age:           {}", profile.age);
    println!("  Height:        {:.1} cm", profile.height_cm);
    println!("  Weight:        {:.1} kg", profile.weight_kg);
    println!("  Location:      {}, {}", profile.city, profile.state);
    println!("  Goal:          {}", profile.goal.label());
    println!("  Diet:          {}", profile.diet.label());
    println!("  Workout place: {}", profile.workout_place.label());
    println!("  Weekly budget: \u{20B9}{}", profile.weekly_budget);
}
