use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use fitai_core::account::{self, AuthError};
use fitai_core::generation::GenerationClient;
use fitai_core::profile::{CheckIn, ProfileError, ProfileInput};
use fitai_core::retry::RetryPolicy;
use fitai_core::service::{
    self, ActionOutcome, ActionStatus, PlanError, PlanService, ServiceError,
};
use fitai_core::token::{self, TokenConfig, TokenError};
use fitai_db::models::User;
use fitai_db::queries::{plans as plan_db, profiles as profile_db, users as user_db};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            AuthError::UsernameTaken(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            AuthError::UserNotFound(_) | AuthError::InvalidPassword => {
                Self::unauthorized(err.to_string())
            }
            AuthError::CorruptCredentials(_) => Self::internal(anyhow::Error::new(err)),
            AuthError::Store(inner) => Self::internal(inner),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingSecret => Self::internal(anyhow::Error::new(err)),
            other => Self::unauthorized(other.to_string()),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MissingProfile | ServiceError::NoPlan => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            ServiceError::EmptyRequest => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            ServiceError::InvalidInput(inner) => inner.into(),
            ServiceError::Store(inner) => Self::internal(inner),
        }
    }
}

// ---------------------------------------------------------------------------
// State and payloads
// ---------------------------------------------------------------------------

/// Shared handler state. Sessions are rebuilt from the store per request.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub client: Arc<dyn GenerationClient>,
    pub tokens: Arc<TokenConfig>,
    pub policy: RetryPolicy,
}

impl AppState {
    fn service(&self) -> PlanService<'_> {
        PlanService::new(&self.pool, self.client.as_ref()).with_policy(self.policy)
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InitialPlanRequest {
    #[serde(default)]
    pub preferences: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModifyPlanRequest {
    pub request: String,
    /// Plan to modify; defaults to the latest week.
    #[serde(default)]
    pub week: Option<i32>,
}

/// Result of a generation action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    #[serde(flatten)]
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub current_week: i32,
    pub plan: Option<String>,
}

impl From<ActionOutcome> for ActionResponse {
    fn from(outcome: ActionOutcome) -> Self {
        let message = match &outcome.status {
            ActionStatus::Accepted { .. } => None,
            ActionStatus::Rejected { error, .. } => Some(error.to_string()),
        };
        Self {
            status: outcome.status,
            message,
            current_week: outcome.session.current_week,
            plan: outcome.session.displayed_plan,
        }
    }
}

fn rejection_status(error: &PlanError) -> StatusCode {
    match error {
        PlanError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PlanError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        PlanError::AccessDenied => StatusCode::BAD_GATEWAY,
        PlanError::StructurallyIncomplete { .. } | PlanError::Regression { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn action_response(outcome: ActionOutcome) -> Response {
    let status = match &outcome.status {
        ActionStatus::Accepted { .. } => StatusCode::OK,
        ActionStatus::Rejected { error, .. } => rejection_status(error),
    };
    (status, Json(ActionResponse::from(outcome))).into_response()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/plans", get(list_plans))
        .route("/api/plans/initial", post(generate_initial))
        .route("/api/plans/next", post(generate_next))
        .route("/api/plans/modify", post(modify_plan))
        // GET takes a week number, DELETE a plan id.
        .route("/api/plans/{key}", get(get_plan_for_week).delete(delete_plan))
        .route("/api/progress", get(progress))
        .route("/api/account", delete(delete_account))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let model = state.client.name().to_string();
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%addr, client = %model, "fitai serve listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("fitai serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

/// Resolve the bearer token to a live account.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

    let claims = token::validate_token(&state.tokens, token.trim())?;

    user_db::get_user(&state.pool, claims.user_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::unauthorized("account no longer exists"))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn signup(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Response, AppError> {
    let user = account::signup(&state.pool, &creds.username, &creds.password).await?;
    let token = token::issue_token(&state.tokens, user.id);
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })).into_response())
}

async fn login(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> Result<Response, AppError> {
    let user = account::login(&state.pool, &creds.username, &creds.password).await?;
    let token = token::issue_token(&state.tokens, user.id);
    tracing::info!(user_id = %user.id, "login");
    Ok(Json(AuthResponse { user, token }).into_response())
}

async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let profile = profile_db::get_profile(&state.pool, user.id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found("no profile saved"))?;
    Ok(Json(profile).into_response())
}

async fn put_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let profile = state.service().save_profile(user.id, &input).await?;
    Ok(Json(profile).into_response())
}

async fn generate_initial(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<InitialPlanRequest>,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let service = state.service();
    let session = service
        .resume_session(&user)
        .await
        .map_err(AppError::internal)?;
    let outcome = service
        .generate_initial_plan(session, body.preferences.as_deref())
        .await?;
    Ok(action_response(outcome))
}

async fn generate_next(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(check_in): Json<CheckIn>,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let service = state.service();
    let session = service
        .resume_session(&user)
        .await
        .map_err(AppError::internal)?;
    let outcome = service.generate_next_week(session, &check_in).await?;
    Ok(action_response(outcome))
}

async fn modify_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ModifyPlanRequest>,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let service = state.service();
    let mut session = service
        .resume_session(&user)
        .await
        .map_err(AppError::internal)?;

    if let Some(week) = body.week {
        let plan = plan_db::get_plan_for_week(&state.pool, user.id, week)
            .await
            .map_err(AppError::internal)?
            .ok_or_else(|| AppError::not_found(format!("no plan for week {week}")))?;
        session = session.show_plan(plan.week, plan.body);
    }

    let outcome = service.modify_plan(session, &body.request).await?;
    Ok(action_response(outcome))
}

async fn list_plans(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let plans = service::plan_history(&state.pool, user.id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(plans).into_response())
}

async fn get_plan_for_week(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(week): Path<i32>,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let plan = plan_db::get_plan_for_week(&state.pool, user.id, week)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("no plan for week {week}")))?;
    Ok(Json(plan).into_response())
}

async fn delete_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    service::delete_plan(&state.pool, user.id, id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    let points = service::progress_series(&state.pool, user.id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(points).into_response())
}

async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &headers).await?;
    account::delete_user(&state.pool, user.id)
        .await
        .map_err(AppError::internal)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
