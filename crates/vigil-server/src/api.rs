//! Unary HTTP routes for peer services.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use vigil_capabilities::{AppListVerdict, CapabilityError};
use vigil_core::{ActionCommand, ActionKind, ActivityRecord, UrlCategory};

use crate::server::AppState;

/// Intensity of commands issued from an app-list verdict.
pub const VERDICT_INTENSITY: u8 = 5;

/// Route errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A capability call failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    /// The request made no sense.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Capability(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Ack {
            success: false,
            error: Some(self.to_string()),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the request was carried out.
    pub success: bool,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
}

/// `POST /api/v1/commands` response.
#[derive(Debug, Serialize)]
pub struct CommandAck {
    success: bool,
    route: &'static str,
}

/// `POST /api/v1/activity` response.
#[derive(Debug, Serialize)]
pub struct ActivityAck {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked: Option<String>,
}

/// `POST /api/v1/solution` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRequest {
    client_id: String,
    #[serde(default)]
    markdown: String,
}

/// `POST /api/v1/analysis` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    client_id: String,
    #[serde(default)]
    error_log: String,
    #[serde(default)]
    scream_text: String,
}

/// `POST /api/v1/analysis` response.
#[derive(Debug, Serialize)]
pub struct AnalysisAck {
    success: bool,
    delivered: bool,
}

/// `POST /api/v1/apps` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppsRequest {
    client_id: String,
    apps_json: String,
}

/// `POST /api/v1/apps` response.
#[derive(Debug, Serialize)]
pub struct AppsAck {
    success: bool,
    verdict: AppListVerdict,
    dispatched: bool,
}

/// `POST /api/v1/classify` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    client_id: String,
    url: String,
    #[serde(default)]
    title: String,
}

/// `POST /api/v1/classify` response.
#[derive(Debug, Serialize)]
pub struct ClassifyAck {
    category: UrlCategory,
}

/// Routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/activity", post(submit_activity))
        .route("/api/v1/commands", post(submit_command))
        .route("/api/v1/solution", post(submit_solution))
        .route("/api/v1/analysis", post(submit_analysis))
        .route("/api/v1/apps", post(submit_apps))
        .route("/api/v1/classify", post(classify_url))
}

/// Activity events posted by client agents go through the reflex path only;
/// they do not touch session scoring.
async fn submit_activity(
    State(state): State<AppState>,
    Json(record): Json<ActivityRecord>,
) -> Result<Json<ActivityAck>, ApiError> {
    if record.client_id().is_empty() {
        return Err(ApiError::BadRequest("clientId is required".into()));
    }
    debug!(client_id = record.client_id(), kind = ?record.activity_type(), "activity received");
    let outcome = state.reflex.handle(record).await;
    Ok(Json(ActivityAck {
        success: true,
        blocked: outcome.blocked.map(|kind| kind.as_str().to_owned()),
    }))
}

async fn submit_command(
    State(state): State<AppState>,
    Json(command): Json<ActionCommand>,
) -> Result<Json<CommandAck>, ApiError> {
    if command.client_id.is_empty() {
        return Err(ApiError::BadRequest("clientId is required".into()));
    }
    let route = state.commands.dispatch(&command).await?;
    Ok(Json(CommandAck {
        success: true,
        route: route.as_str(),
    }))
}

async fn submit_solution(
    State(state): State<AppState>,
    Json(req): Json<SolutionRequest>,
) -> Result<Json<Ack>, ApiError> {
    state.solutions.route(&req.client_id, &req.markdown).await?;
    Ok(Json(Ack::ok()))
}

/// Emergency protocol: have the error log analysed and, when a fix comes
/// back, put it on the client's screen.
async fn submit_analysis(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisAck>, ApiError> {
    info!(client_id = %req.client_id, log_len = req.error_log.len(), "emergency analysis requested");
    let markdown = state
        .intelligence
        .analyze_log(&req.client_id, &req.error_log, &req.scream_text)
        .await?;

    let delivered = match markdown {
        Some(markdown) if !markdown.trim().is_empty() => {
            state.solutions.route(&req.client_id, &markdown).await?;
            true
        }
        _ => false,
    };
    Ok(Json(AnalysisAck {
        success: true,
        delivered,
    }))
}

async fn submit_apps(
    State(state): State<AppState>,
    Json(req): Json<AppsRequest>,
) -> Result<Json<AppsAck>, ApiError> {
    let verdict = state.intelligence.submit_app_list(&req.apps_json).await?;

    let mut dispatched = false;
    if verdict.has_command() {
        let command = ActionCommand::new(
            req.client_id.as_str(),
            ActionKind::parse(verdict.command.trim()),
            VERDICT_INTENSITY,
            verdict.message.as_str(),
        );
        // the verdict is returned even when the follow-up fails
        match state.commands.dispatch(&command).await {
            Ok(route) => {
                info!(client_id = %req.client_id, route = route.as_str(), "verdict command dispatched");
                dispatched = true;
            }
            Err(error) => warn!(client_id = %req.client_id, %error, "verdict command not dispatched"),
        }
    }

    Ok(Json(AppsAck {
        success: true,
        verdict,
        dispatched,
    }))
}

async fn classify_url(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyAck>, ApiError> {
    let category = state
        .intelligence
        .classify_url(&req.client_id, &req.url, &req.title)
        .await?;
    Ok(Json(ClassifyAck { category }))
}
