//! CLI handlers for `fitai user` subcommands.
//!
//! Implements:
//! - `fitai user add <username> --password <pw>` -- create an account
//! - `fitai user list`                           -- list accounts
//! - `fitai user delete <username>`              -- remove an account and its data

use anyhow::{Context, Result};
use sqlx::PgPool;

use fitai_core::account;
use fitai_db::models::User;
use fitai_db::queries::users;

use crate::UserCommands;

/// Dispatch a `UserCommands` variant to the appropriate handler.
pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Add { username, password } => cmd_add(pool, &username, &password).await,
        UserCommands::List => cmd_list(pool).await,
        UserCommands::Delete { username } => cmd_delete(pool, &username).await,
    }
}

/// Look up an account by name, failing with a readable message.
pub async fn find_user(pool: &PgPool, username: &str) -> Result<User> {
    users::get_user_by_username(pool, username.trim())
        .await?
        .with_context(|| format!("no user named {username:?}; create one with `fitai user add`"))
}

async fn cmd_add(pool: &PgPool, username: &str, password: &str) -> Result<()> {
    let user = account::signup(pool, username, password).await?;
    println!("User created.");
    println!("  ID:       {}", user.id);
    println!("  Username: {}", user.username);
    Ok(())
}

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let all = account::list_users(pool).await?;
    if all.is_empty() {
        println!("No users.");
        return Ok(());
    }

    println!("{:<36}  {:<24}  CREATED", "ID", "USERNAME");
    for user in &all {
        println!(
            "{:<36}  {:<24}  {}",
            user.id,
            user.username,
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_delete(pool: &PgPool, username: &str) -> Result<()> {
    let user = find_user(pool, username).await?;
    account::delete_user(pool, user.id).await?;
    println!("Deleted user {} and all of their plans.", user.username);
    Ok(())
}
