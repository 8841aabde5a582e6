// ============================================================================
// NexusChain API - Health Handler
// File: crates/nexus-api/src/handlers/health.rs
// ============================================================================
//! Liveness endpoint

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub environment: String,
    pub version: &'static str,
}

/// Health handler - GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        environment: state.config.app.env.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
