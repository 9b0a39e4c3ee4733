mod config;
mod plan_cmds;
mod profile_cmds;
mod serve_cmd;
mod user_cmds;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use fitai_core::generation::{GeminiClient, GenerationClient};
use fitai_db::models::{DietType, Difficulty, Goal, WorkoutPlace};
use fitai_db::pool;

use config::FitaiConfig;

#[derive(Parser)]
#[command(name = "fitai", about = "Weekly fitness and diet plans from a hosted language model")]
struct Cli {
    /// Database URL (overrides FITAI_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fitai config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/fitai")]
        db_url: String,
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Model name to store in the config file
        #[arg(long)]
        model: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the fitai database
    DbInit,
    /// Account management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Fitness profile management
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Generate, modify, and browse weekly plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show the weight trend recorded at each check-in
    Progress {
        /// Account name
        username: String,
    },
    /// Run the JSON HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create an account
    Add {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// List accounts
    List,
    /// Delete an account with its profile, plans, and progress
    Delete { username: String },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create or replace a user's fitness profile
    Set {
        username: String,
        /// Age in years (16-40)
        #[arg(long)]
        age: i32,
        /// Height in cm (130-220)
        #[arg(long = "height")]
        height_cm: f64,
        /// Weight in kg (30-200)
        #[arg(long = "weight")]
        weight_kg: f64,
        #[arg(long)]
        state: String,
        #[arg(long)]
        city: String,
        /// fat_loss, muscle_gain, or maintenance
        #[arg(long)]
        goal: Goal,
        /// vegetarian, eggetarian, or non_vegetarian
        #[arg(long)]
        diet: DietType,
        /// home or gym
        #[arg(long = "place")]
        workout_place: WorkoutPlace,
        /// Weekly food budget in rupees (100-1000)
        #[arg(long = "budget")]
        weekly_budget: i32,
    },
    /// Print a user's profile and stored preferences
    Show { username: String },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate the week 1 plan from the stored profile
    Generate {
        username: String,
        /// Free-form preferences (max 300 characters); replaces stored ones
        #[arg(long)]
        preferences: Option<String>,
    },
    /// Record a weekly check-in and generate the next week's plan
    Next {
        username: String,
        /// Current weight in kg
        #[arg(long = "weight")]
        weight_kg: f64,
        /// too_easy, just_right, or too_hard
        #[arg(long)]
        difficulty: Difficulty,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Apply a change request to a plan
    Modify {
        username: String,
        /// What to change, in plain words
        request: String,
        /// Week to modify (defaults to the latest)
        #[arg(long)]
        week: Option<i32>,
    },
    /// List a user's plans, newest first
    History { username: String },
    /// Print a plan (defaults to the latest week)
    Show { username: String, week: Option<i32> },
    /// Write a plan as Markdown
    Export {
        username: String,
        /// Week to export (defaults to the latest)
        #[arg(long)]
        week: Option<i32>,
        /// Output file or directory
        #[arg(long, default_value = ".")]
        output: String,
    },
    /// Delete one plan by ID
    Delete { username: String, plan_id: String },
}

/// Execute the `fitai init` command: write config file.
fn cmd_init(
    db_url: &str,
    api_key: Option<String>,
    model: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let token_secret = config::generate_token_secret();
    let has_api_key = api_key.is_some();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            token_secret: token_secret.clone(),
        },
        generation: config::GenerationSection {
            api_key,
            model,
            base_url: None,
            max_fallback_attempts: None,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  auth.token_secret = {}...{}", &token_secret[..8], &token_secret[56..]);
    if !has_api_key {
        println!("  generation.api_key not set; export GEMINI_API_KEY before generating plans");
    }
    println!();
    println!("Next: run `fitai db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `fitai db-init` command: create the database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = FitaiConfig::resolve(cli_db_url)?;

    println!("Initializing fitai database...");

    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("fitai db-init complete.");
    Ok(())
}

async fn cmd_serve(cli_db_url: Option<&str>, bind: &str, port: u16) -> anyhow::Result<()> {
    let resolved = FitaiConfig::resolve(cli_db_url)?;
    let tokens = resolved.require_token_config()?.clone();
    let client: Arc<dyn GenerationClient> =
        Arc::new(GeminiClient::new(resolved.generation.gemini_config()?)?);

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let state = serve_cmd::AppState {
        pool: db_pool.clone(),
        client,
        tokens: Arc::new(tokens),
        policy: resolved.generation.retry_policy(),
    };
    let result = serve_cmd::run_serve(state, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            model,
            force,
        } => {
            cmd_init(&db_url, api_key, model, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::User { command } => {
            let resolved = FitaiConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = user_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Profile { command } => {
            let resolved = FitaiConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = profile_cmds::run_profile_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = FitaiConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                plan_cmds::run_plan_command(command, &db_pool, &resolved.generation).await;
            db_pool.close().await;
            result?;
        }
        Commands::Progress { username } => {
            let resolved = FitaiConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_progress(&db_pool, &username).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            cmd_serve(cli.database_url.as_deref(), &bind, port).await?;
        }
    }

    Ok(())
}
