//! Health Check API Handlers
//!
//! Liveness endpoints for monitoring.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

/// GET /
/// Connectivity check used by the frontend
pub async fn root() -> Json<Value> {
    Json(json!({ "status": "connect success" }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
