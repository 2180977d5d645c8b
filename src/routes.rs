//! HTTP handlers.
//!
//! `POST /api/generate-report` runs the pipeline and maps its outcome to a
//! status code: 200 for model success and for the missing-credentials
//! fallback, 500 (with a complete fallback report body) when generation
//! hard-fails. The UI always has a displayable report object.
//! `GET /api/session-chats` serves the stored history.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::pipeline::{GenerationStatus, ReportPipeline};
use crate::report::Stamp;
use crate::storage::{SessionRecord, SessionStore};

/// History page size for the session listing
const SESSION_LIST_LIMIT: usize = 20;

fn default_doctor() -> String {
    "General Physician".to_string()
}

fn default_user() -> String {
    "Anonymous".to_string()
}

/// Request body for report generation. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateReportRequest {
    #[serde(default)]
    pub conversation: Vec<String>,
    #[serde(default = "default_doctor")]
    pub doctor: String,
    #[serde(default = "default_user")]
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionChatsQuery {
    #[serde(default = "default_user")]
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
}

/// Shared handler state, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
    pub store: Arc<dyn SessionStore>,
    pub stamp: Arc<dyn Stamp>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/generate-report
pub async fn generate_report(
    State(state): State<AppState>,
    payload: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!(
        "generate-report called: {} turns, doctor={:?}, user={:?}",
        request.conversation.len(),
        request.doctor,
        request.user
    );

    let (report, status) = state
        .pipeline
        .generate(&request.conversation, &request.doctor, &request.user)
        .await;

    // Only successful model generations are persisted, and never on the
    // request path: the response below is already fixed.
    if status == GenerationStatus::Generated {
        let record = SessionRecord {
            session_id: report.session_id.clone(),
            notes: String::new(),
            conversation: serde_json::json!(request.conversation),
            report: serde_json::to_value(&report).unwrap_or_default(),
            // The normalized label, not the raw request value: an empty
            // user must file under "Anonymous", same as the report itself.
            created_by: report.user.clone(),
            created_at: state.stamp.timestamp(),
        };
        let store = state.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.save(&record).await {
                warn!("failed to persist session record (non-fatal): {}", e);
            }
        });
    }

    let http_status = match status {
        GenerationStatus::Generated | GenerationStatus::MissingCredentials => StatusCode::OK,
        GenerationStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((http_status, Json(report)).into_response())
}

/// GET /api/session-chats?user=<label>
pub async fn session_chats(
    State(state): State<AppState>,
    Query(query): Query<SessionChatsQuery>,
) -> Result<Json<Vec<SessionRecord>>, ApiError> {
    let records = state
        .store
        .recent_for_user(&query.user, SESSION_LIST_LIMIT)
        .await?;
    Ok(Json(records))
}
