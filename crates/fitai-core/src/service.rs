//! Plan service: runs the generate / validate / persist pipeline for each
//! user action.
//!
//! A plan row is written only when the final verdict is
//! [`ValidationVerdict::Accepted`]. Any other outcome leaves the stored
//! plans and the caller's session exactly as they were.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use fitai_db::models::{Difficulty, Plan, Profile, User};
use fitai_db::queries::progress::NewProgress;
use fitai_db::queries::preferences as prefs_db;
use fitai_db::queries::{plans, profiles, progress};

use crate::generation::{FailureCategory, GenerationClient};
use crate::profile::{CheckIn, ProfileError, ProfileInput, validate_preferences};
use crate::prompt;
use crate::retry::{GenerationOutcome, RetryPolicy, generate_with_retry};
use crate::session::SessionContext;
use crate::validate::{Criteria, ValidationVerdict};

/// Preference key holding the free-form preferences text.
pub const PREFERENCES_KEY: &str = "user_preferences";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a generation action produced no new plan.
///
/// Display text is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanError {
    /// Quota, overload, or other transient service failure.
    #[error("{}", .category.user_message())]
    UpstreamUnavailable { category: FailureCategory },

    #[error("Request is too large. Please try a shorter message.")]
    RequestTooLarge,

    #[error("AI access issue. Please contact the administrator.")]
    AccessDenied,

    #[error("Failed to generate a complete plan. Existing plan kept safe.")]
    StructurallyIncomplete { missing_days: Vec<u8> },

    #[error("Response looks incomplete. Existing plan kept safe.")]
    Regression {
        actual_length: usize,
        previous_length: usize,
    },
}

impl From<&ValidationVerdict> for PlanError {
    fn from(verdict: &ValidationVerdict) -> Self {
        match verdict {
            ValidationVerdict::ErrorEcho { category } => match category {
                FailureCategory::RequestTooLarge => Self::RequestTooLarge,
                FailureCategory::AccessDenied => Self::AccessDenied,
                other => Self::UpstreamUnavailable { category: *other },
            },
            ValidationVerdict::Incomplete { missing_days } => Self::StructurallyIncomplete {
                missing_days: missing_days.clone(),
            },
            ValidationVerdict::TooShort {
                actual_length,
                previous_length,
            } => Self::Regression {
                actual_length: *actual_length,
                previous_length: *previous_length,
            },
            // An accepted verdict without text never leaves the retry loop.
            ValidationVerdict::Accepted => Self::StructurallyIncomplete {
                missing_days: Vec::new(),
            },
        }
    }
}

/// Failure to start or finish an action, as opposed to a rejected plan.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no fitness profile saved; set your profile first")]
    MissingProfile,

    #[error("no plan yet; generate your first plan")]
    NoPlan,

    #[error("modification request is empty")]
    EmptyRequest,

    #[error(transparent)]
    InvalidInput(#[from] ProfileError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Whether the action replaced the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionStatus {
    Accepted { week: i32, attempts: u32 },
    Rejected { error: PlanError, attempts: u32 },
}

/// Status plus the session after the action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub status: ActionStatus,
    pub session: SessionContext,
}

impl ActionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, ActionStatus::Accepted { .. })
    }
}

/// One point of the weight trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub week: i32,
    pub weight_kg: f64,
    pub difficulty: Difficulty,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// PlanService
// ---------------------------------------------------------------------------

/// Plan actions for one request, backed by a pool and a generation client.
pub struct PlanService<'a> {
    pool: &'a PgPool,
    client: &'a dyn GenerationClient,
    policy: RetryPolicy,
}

impl<'a> PlanService<'a> {
    pub fn new(pool: &'a PgPool, client: &'a dyn GenerationClient) -> Self {
        Self {
            pool,
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate and store a user's profile.
    pub async fn save_profile(
        &self,
        user_id: Uuid,
        input: &ProfileInput,
    ) -> Result<Profile, ServiceError> {
        input.validate()?;
        let profile = profiles::upsert_profile(self.pool, user_id, &input.as_new_profile()).await?;
        info!(user_id = %user_id, "profile saved");
        Ok(profile)
    }

    /// Generate the week 1 plan from the stored profile.
    ///
    /// Non-blank `preferences` replace the stored preferences text before
    /// generation; otherwise the stored text is used.
    pub async fn generate_initial_plan(
        &self,
        session: SessionContext,
        preferences: Option<&str>,
    ) -> Result<ActionOutcome, ServiceError> {
        let preferences = validate_preferences(preferences)?;
        let profile = self.require_profile(session.user_id).await?;

        let stored;
        let preferences = match preferences {
            Some(text) => {
                prefs_db::upsert_preference(self.pool, session.user_id, PREFERENCES_KEY, text)
                    .await?;
                Some(text)
            }
            None => {
                stored =
                    prefs_db::get_preference(self.pool, session.user_id, PREFERENCES_KEY)
                        .await?;
                stored.as_deref()
            }
        };

        let prompts = prompt::initial_plan(&profile, preferences);
        let outcome =
            generate_with_retry(self.client, &self.policy, &prompts, &Criteria::initial()).await;

        self.finish(session, 1, outcome).await
    }

    /// Record a check-in and generate the following week's plan.
    ///
    /// The progress row and the new weight are stored before generation and
    /// are kept even if the plan is rejected. Retrying after a rejection
    /// targets the same week again, so its progress row is overwritten
    /// rather than duplicated.
    pub async fn generate_next_week(
        &self,
        session: SessionContext,
        check_in: &CheckIn,
    ) -> Result<ActionOutcome, ServiceError> {
        check_in.validate()?;
        self.require_profile(session.user_id).await?;

        let previous = plans::latest_plan(self.pool, session.user_id)
            .await?
            .ok_or(ServiceError::NoPlan)?;
        let week = previous.week + 1;

        progress::record_progress(
            self.pool,
            &NewProgress {
                user_id: session.user_id,
                week,
                weight_kg: check_in.weight_kg,
                difficulty: check_in.difficulty,
                notes: check_in.trimmed_notes(),
            },
        )
        .await?;
        profiles::update_weight(self.pool, session.user_id, check_in.weight_kg).await?;

        // Reload so the prompt sees the new weight.
        let profile = self.require_profile(session.user_id).await?;
        let stored_preferences =
            prefs_db::get_preference(self.pool, session.user_id, PREFERENCES_KEY).await?;

        let prompts = prompt::next_week_plan(
            &profile,
            check_in,
            week,
            &previous.body,
            stored_preferences.as_deref(),
        );
        let outcome = generate_with_retry(
            self.client,
            &self.policy,
            &prompts,
            &Criteria::anchors_only(),
        )
        .await;

        self.finish(session, week, outcome).await
    }

    /// Apply a change request to the displayed plan.
    pub async fn modify_plan(
        &self,
        session: SessionContext,
        request: &str,
    ) -> Result<ActionOutcome, ServiceError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(ServiceError::EmptyRequest);
        }
        let current = session.displayed_plan.clone().ok_or(ServiceError::NoPlan)?;
        let profile = self.require_profile(session.user_id).await?;

        let prompts = prompt::modify_plan(&profile, &current, request);
        let outcome = generate_with_retry(
            self.client,
            &self.policy,
            &prompts,
            &Criteria::replacing(&current),
        )
        .await;

        let week = session.current_week;
        self.finish(session, week, outcome).await
    }

    /// Rebuild a session showing the user's latest plan.
    pub async fn resume_session(&self, user: &User) -> Result<SessionContext> {
        let session = SessionContext::new(user.id, &user.username);
        let latest = plans::latest_plan(self.pool, user.id)
            .await
            .with_context(|| format!("failed to resume session for {}", user.username))?;
        Ok(match latest {
            Some(plan) => session.show_plan(plan.week, plan.body),
            None => session,
        })
    }

    async fn require_profile(&self, user_id: Uuid) -> Result<Profile, ServiceError> {
        profiles::get_profile(self.pool, user_id)
            .await?
            .ok_or(ServiceError::MissingProfile)
    }

    /// Persist an accepted outcome for `week`, or report the rejection and
    /// hand back the session untouched.
    async fn finish(
        &self,
        session: SessionContext,
        week: i32,
        outcome: GenerationOutcome,
    ) -> Result<ActionOutcome, ServiceError> {
        let GenerationOutcome {
            text,
            verdict,
            attempts,
        } = outcome;

        match (verdict, text) {
            (ValidationVerdict::Accepted, Some(text)) => {
                plans::upsert_plan(self.pool, session.user_id, week, &text).await?;
                info!(user_id = %session.user_id, week, attempts, "plan accepted");
                Ok(ActionOutcome {
                    status: ActionStatus::Accepted { week, attempts },
                    session: session.show_plan(week, text),
                })
            }
            (verdict, _) => {
                let error = PlanError::from(&verdict);
                warn!(user_id = %session.user_id, week, attempts, %error, "plan rejected, keeping previous plan");
                Ok(ActionOutcome {
                    status: ActionStatus::Rejected { error, attempts },
                    session,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Read and delete actions (no generation client)
// ---------------------------------------------------------------------------

/// All stored plans, newest week first.
pub async fn plan_history(pool: &PgPool, user_id: Uuid) -> Result<Vec<Plan>> {
    plans::list_plans_for_user(pool, user_id).await
}

/// Weight trend from the recorded check-ins, ordered by week.
pub async fn progress_series(pool: &PgPool, user_id: Uuid) -> Result<Vec<ProgressPoint>> {
    let rows = progress::list_progress(pool, user_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| ProgressPoint {
            week: row.week,
            weight_kg: row.weight_kg,
            difficulty: row.difficulty,
            notes: row.notes,
        })
        .collect())
}

/// Delete one of the user's plans. Returns `None` if the plan does not
/// exist or belongs to someone else.
pub async fn delete_plan(pool: &PgPool, user_id: Uuid, plan_id: Uuid) -> Result<Option<Plan>> {
    match plans::get_plan(pool, plan_id).await? {
        Some(plan) if plan.user_id == user_id => plans::delete_plan(pool, plan_id).await,
        _ => Ok(None),
    }
}
