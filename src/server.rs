//! HTTP surface over the workflow runner.
//!
//! Transport only: request validation, business resolution and JSON
//! shaping. All interpretation happens in the pipeline.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::business::{BusinessSnapshot, InMemoryDirectory, OpeningHour, Service};
use crate::config::AssistantConfig;
use crate::error::{self, DirectoryError};
use crate::ledger::{AirtableLedger, CustomerLedger, UnconfiguredLedger};
use crate::pipeline::{
    Channel, Intent, LogEvent, RelativeDateParser, RunResult, RunStatus, WorkflowRunner,
};

pub const INVALID_CHANNEL: &str = "Invalid channel. Must be web, email, or sms";
pub const MESSAGE_REQUIRED: &str = "Message is required";
pub const NO_BUSINESS: &str = "No business configured";
pub const BUSINESS_NAME_REQUIRED: &str = "Business name is required";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<WorkflowRunner>,
    /// Business to run against (None = first in the directory).
    pub business_id: Option<String>,
}

/// Load the business directory, pick the ledger and build the router.
pub async fn build_app(config: &AssistantConfig) -> error::Result<Router> {
    let directory = InMemoryDirectory::load_file(&config.business_file).await?;
    if directory.is_empty().await {
        warn!("No business configured; workflow requests will be rejected");
    }

    let ledger: Arc<dyn CustomerLedger> = match &config.ledger {
        Some(ledger_config) => Arc::new(AirtableLedger::new(ledger_config.clone())),
        None => {
            warn!("Airtable not configured; leads and bookings will not be recorded");
            Arc::new(UnconfiguredLedger)
        }
    };
    info!(ledger = ledger.name(), "Customer ledger ready");

    let runner = WorkflowRunner::new(
        Arc::new(directory),
        Arc::new(RelativeDateParser::new()),
        ledger,
    );
    Ok(workflow_routes(Arc::new(runner), config.business_id.clone()))
}

/// Build the Axum router with health, business and workflow routes.
pub fn workflow_routes(runner: Arc<WorkflowRunner>, business_id: Option<String>) -> Router {
    let state = AppState {
        runner,
        business_id,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/business", get(get_business).post(save_business))
        .route("/api/workflow", post(run_workflow))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "booking-assist"
    }))
}

// ── Business ────────────────────────────────────────────────────────────

impl AppState {
    async fn current_business(&self) -> Result<Option<BusinessSnapshot>, DirectoryError> {
        let directory = self.runner.directory();
        match &self.business_id {
            Some(id) => directory.fetch(id).await,
            None => directory.first().await,
        }
    }
}

async fn get_business(State(state): State<AppState>) -> Response {
    match state.current_business().await {
        Ok(business) => Json(business).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load business");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct BusinessRequest {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    services: Vec<Service>,
    #[serde(default)]
    opening_hours: Vec<OpeningHour>,
}

/// Create or replace the business configuration. In memory only; a restart
/// reloads the business file.
async fn save_business(
    State(state): State<AppState>,
    body: Result<Json<BusinessRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let Some(name) = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, BUSINESS_NAME_REQUIRED);
    };

    // Without an explicit id the current business is updated in place.
    let id = match body.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => match state.current_business().await {
            Ok(Some(existing)) => existing.id,
            Ok(None) => state
                .business_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            Err(e) => {
                warn!(error = %e, "Failed to load business");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
            }
        },
    };

    let snapshot = BusinessSnapshot {
        id,
        name: name.to_string(),
        timezone: body.timezone,
        services: body.services,
        opening_hours: body.opening_hours,
    };
    match state.runner.directory().upsert(snapshot).await {
        Ok(stored) => {
            info!(business_id = %stored.id, services = stored.services.len(), "Business saved");
            Json(serde_json::json!({ "success": true, "business": stored })).into_response()
        }
        Err(e @ DirectoryError::InvalidSnapshot(_)) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => {
            warn!(error = %e, "Failed to save business");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

// ── Workflow ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WorkflowRequest {
    channel: Option<String>,
    message: Option<String>,
}

/// Body returned by `POST /api/workflow`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub success: bool,
    pub workflow_run_id: Uuid,
    pub status: RunStatus,
    pub result: WorkflowSummary,
    pub log_events: Vec<LogEvent>,
}

/// Caller-facing view of the final run context.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub intent: Option<Intent>,
    pub customer_name: Option<String>,
    pub requested_date_time: Option<NaiveDateTime>,
    pub requested_service: Option<String>,
    pub validation_errors: Vec<String>,
    pub response_message: Option<String>,
    pub actions_taken: Vec<String>,
}

impl WorkflowResponse {
    fn from_run(run: RunResult) -> Self {
        let status = run.status();
        let ctx = run.context;
        Self {
            success: true,
            workflow_run_id: Uuid::new_v4(),
            status,
            result: WorkflowSummary {
                intent: ctx.intent,
                customer_name: ctx.customer_name,
                requested_date_time: ctx.requested_date_time,
                requested_service: ctx.requested_service,
                validation_errors: ctx.validation_errors,
                response_message: ctx.response_message,
                actions_taken: ctx.actions_taken,
            },
            log_events: run.events.into_events(),
        }
    }
}

async fn run_workflow(
    State(state): State<AppState>,
    body: Result<Json<WorkflowRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let Some(channel) = body.channel.as_deref().and_then(|c| c.parse::<Channel>().ok()) else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_CHANNEL);
    };
    let message = body.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MESSAGE_REQUIRED);
    }

    // A configured id is passed through even if unknown: the runner
    // reports it as a failed run.
    let business_id = match &state.business_id {
        Some(id) => id.clone(),
        None => match state.runner.directory().first().await {
            Ok(Some(business)) => business.id,
            Ok(None) => return error_response(StatusCode::BAD_REQUEST, NO_BUSINESS),
            Err(e) => {
                warn!(error = %e, "Failed to resolve default business");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
            }
        },
    };

    let run = state.runner.run(&business_id, channel, message).await;
    let response = WorkflowResponse::from_run(run);
    info!(
        run_id = %response.workflow_run_id,
        status = %response.status,
        "Workflow run complete"
    );

    (StatusCode::OK, Json(response)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Body-extraction failures keep axum's status but use the JSON error shape.
fn rejection_response(rejection: JsonRejection) -> Response {
    warn!(error = %rejection, "Rejected request body");
    error_response(rejection.status(), &rejection.body_text())
}
