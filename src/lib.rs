//! Voice consultation report service.
//!
//! HTTP API that turns a finished voice-consultation transcript into a
//! structured medical report via an LLM call, with a bounded retry on
//! malformed output and a deterministic fallback when no model is
//! reachable. Generated reports and their transcripts are archived to a
//! local session store.

pub mod config;
pub mod error;
pub mod llm_client;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod routes;
pub mod storage;


use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

pub use routes::AppState;

/// Request bodies above this size are rejected outright.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the service router around the given state.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/generate-report", post(routes::generate_report))
        .route("/api/session-chats", get(routes::session_chats))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
