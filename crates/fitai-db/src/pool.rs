use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/fitai-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables owned by the FitAI schema, parents before children.
pub const TABLES: [&str; 5] = ["users", "user_profiles", "plans", "progress", "preferences"];

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a pool on `config.database_url`.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Apply pending migrations. Already-applied ones are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(count = MIGRATOR.iter().count(), "migrations applied");
    Ok(())
}

/// Issue `CREATE DATABASE name` on a pool connected to another database on
/// the same server.
pub async fn create_database(maintenance: &PgPool, name: &str) -> Result<()> {
    // CREATE DATABASE takes no bind parameters.
    if !is_plain_identifier(name) {
        bail!("database name {name:?} must be lowercase letters, digits, and underscores");
    }
    maintenance
        .execute(format!("CREATE DATABASE {name}").as_str())
        .await
        .with_context(|| format!("failed to create database {name}"))?;
    Ok(())
}

/// Create the configured database if the server does not have it yet.
///
/// Returns `true` when the database was created by this call.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<bool> {
    let name = config
        .database_name()
        .context("could not determine database name from URL")?;
    let maintenance = create_pool(&DbConfig::new(config.maintenance_url())).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&maintenance)
            .await
            .context("failed to query pg_database")?;

    let result = if exists {
        Ok(false)
    } else {
        create_database(&maintenance, name).await.map(|()| true)
    };
    maintenance.close().await;

    if let Ok(created) = result {
        info!(db = name, created, "database ready");
    }
    result
}

/// Row count of every table in [`TABLES`], in that order.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table, count));
    }
    Ok(counts)
}

fn is_plain_identifier(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
