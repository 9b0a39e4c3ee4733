//! CLI handlers for `fitai plan` subcommands and `fitai progress`.
//!
//! Implements:
//! - `fitai plan generate <user>`       -- first plan from the stored profile
//! - `fitai plan next <user>`           -- record a check-in, plan the next week
//! - `fitai plan modify <user> <text>`  -- apply a change request to a plan
//! - `fitai plan history <user>`        -- list stored plans
//! - `fitai plan show <user> [week]`    -- print a plan
//! - `fitai plan export <user>`         -- write a plan as Markdown
//! - `fitai plan delete <user> <id>`    -- delete a plan
//! - `fitai progress <user>`            -- weight trend from check-ins

use std::path::Path;

use anyhow::{Context, Result, bail};
use sqlx::PgPool;
use uuid::Uuid;

use fitai_core::export;
use fitai_core::generation::GeminiClient;
use fitai_core::profile::CheckIn;
use fitai_core::service::{self, ActionOutcome, ActionStatus, PlanService};
use fitai_db::models::{Plan, User};
use fitai_db::queries::plans as plan_queries;

use crate::PlanCommands;
use crate::config::GenerationSettings;
use crate::user_cmds::find_user;

// -----------------------------------------------------------------------
// Public entry points
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
///
/// The Gemini client is only built for commands that generate.
pub async fn run_plan_command(
    command: PlanCommands,
    pool: &PgPool,
    settings: &GenerationSettings,
) -> Result<()> {
    match command {
        PlanCommands::Generate {
            username,
            preferences,
        } => {
            let client = GeminiClient::new(settings.gemini_config()?)?;
            let service = PlanService::new(pool, &client).with_policy(settings.retry_policy());
            let user = find_user(pool, &username).await?;
            let session = service.resume_session(&user).await?;
            println!("Generating your week 1 plan with {}...", client.model());
            let outcome = service
                .generate_initial_plan(session, preferences.as_deref())
                .await?;
            report_outcome(&outcome)
        }
        PlanCommands::Next {
            username,
            weight_kg,
            difficulty,
            notes,
        } => {
            let client = GeminiClient::new(settings.gemini_config()?)?;
            let service = PlanService::new(pool, &client).with_policy(settings.retry_policy());
            let user = find_user(pool, &username).await?;
            let session = service.resume_session(&user).await?;
            let check_in = CheckIn {
                weight_kg,
                difficulty,
                notes,
            };
            println!("Recording check-in and generating next week's plan...");
            let outcome = service.generate_next_week(session, &check_in).await?;
            report_outcome(&outcome)
        }
        PlanCommands::Modify {
            username,
            request,
            week,
        } => {
            let client = GeminiClient::new(settings.gemini_config()?)?;
            let service = PlanService::new(pool, &client).with_policy(settings.retry_policy());
            let user = find_user(pool, &username).await?;
            let mut session = service.resume_session(&user).await?;
            if let Some(week) = week {
                let plan = find_plan(pool, &user, Some(week)).await?;
                session = session.show_plan(plan.week, plan.body);
            }
            println!("Updating your week {} plan...", session.current_week);
            let outcome = service.modify_plan(session, &request).await?;
            report_outcome(&outcome)
        }
        PlanCommands::History { username } => cmd_history(pool, &username).await,
        PlanCommands::Show { username, week } => {
            let user = find_user(pool, &username).await?;
            let plan = find_plan(pool, &user, week).await?;
            println!("{}", export::render_markdown(plan.week, &plan.body));
            Ok(())
        }
        PlanCommands::Export {
            username,
            week,
            output,
        } => cmd_export(pool, &username, week, &output).await,
        PlanCommands::Delete { username, plan_id } => cmd_delete(pool, &username, &plan_id).await,
    }
}

/// Print the weight trend recorded at each check-in.
pub async fn run_progress(pool: &PgPool, username: &str) -> Result<()> {
    let user = find_user(pool, username).await?;
    let points = service::progress_series(pool, user.id).await?;
    if points.is_empty() {
        println!("No check-ins yet. Record one with `fitai plan next`.");
        return Ok(());
    }

    println!("{:<6}  {:>8}  {:<12}  NOTES", "WEEK", "WEIGHT", "DIFFICULTY");
    for point in &points {
        println!(
            "{:<6}  {:>6.1}kg  {:<12}  {}",
            point.week,
            point.weight_kg,
            point.difficulty.label(),
            point.notes.as_deref().unwrap_or("-")
        );
    }

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        println!();
        println!(
            "Change since week {}: {:+.1} kg",
            first.week,
            last.weight_kg - first.weight_kg
        );
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

/// Print an accepted plan, or turn a rejection into a command error.
fn report_outcome(outcome: &ActionOutcome) -> Result<()> {
    match &outcome.status {
        ActionStatus::Accepted { week, attempts } => {
            println!("Week {week} plan saved ({attempts} model call(s)).");
            println!();
            if let Some(body) = &outcome.session.displayed_plan {
                println!("{}", export::render_markdown(*week, body));
            }
            Ok(())
        }
        ActionStatus::Rejected { error, attempts } => {
            bail!("{error} ({attempts} model call(s))")
        }
    }
}

/// The plan for `week`, or the latest plan when no week is given.
async fn find_plan(pool: &PgPool, user: &User, week: Option<i32>) -> Result<Plan> {
    let plan = match week {
        Some(week) => plan_queries::get_plan_for_week(pool, user.id, week).await?,
        None => plan_queries::latest_plan(pool, user.id).await?,
    };
    match (plan, week) {
        (Some(plan), _) => Ok(plan),
        (None, Some(week)) => bail!("{} has no plan for week {week}", user.username),
        (None, None) => bail!(
            "{} has no plans yet; run `fitai plan generate` first",
            user.username
        ),
    }
}

async fn cmd_history(pool: &PgPool, username: &str) -> Result<()> {
    let user = find_user(pool, username).await?;
    let all = service::plan_history(pool, user.id).await?;
    if all.is_empty() {
        println!("No plans yet.");
        return Ok(());
    }

    println!("{:<6}  {:<36}  {:>6}  UPDATED", "WEEK", "ID", "CHARS");
    for plan in &all {
        println!(
            "{:<6}  {:<36}  {:>6}  {}",
            plan.week,
            plan.id,
            plan.body.chars().count(),
            plan.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn cmd_export(pool: &PgPool, username: &str, week: Option<i32>, output: &str) -> Result<()> {
    let user = find_user(pool, username).await?;
    let plan = find_plan(pool, &user, week).await?;
    let written = export::write_markdown(&plan, Path::new(output))?;
    println!("Week {} plan written to {}", plan.week, written.display());
    Ok(())
}

async fn cmd_delete(pool: &PgPool, username: &str, plan_id: &str) -> Result<()> {
    let user = find_user(pool, username).await?;
    let id = Uuid::parse_str(plan_id).with_context(|| format!("invalid plan ID: {plan_id}"))?;
    match service::delete_plan(pool, user.id, id).await? {
        Some(plan) => {
            println!("Deleted week {} plan {id}.", plan.week);
            Ok(())
        }
        None => bail!("{} has no plan {id}", user.username),
    }
}
