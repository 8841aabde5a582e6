// ============================================================================
// NexusChain API - Checkpoint Handlers
// File: crates/nexus-api/src/handlers/checkpoints.rs
// ============================================================================
//! Checkpoint HTTP handlers: recording scans, trail reads, edits,
//! deletes, and the temperature alert scan.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use nexus_core::domain::{CheckpointDetail, CheckpointWithHandler};
use nexus_core::services::{AddCheckpointRequest, CheckpointPatch, TemperatureAlertReport};
use nexus_core::DomainError;

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckpointBody<T: Serialize> {
    pub checkpoint: T,
}

#[derive(Debug, Serialize)]
pub struct CheckpointsBody {
    pub checkpoints: Vec<CheckpointWithHandler>,
    pub count: i64,
}

/// Checkpoint creation handler - POST /api/checkpoints
pub async fn add_checkpoint(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(req): Json<AddCheckpointRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckpointBody<CheckpointWithHandler>>>), ApiError> {
    let checkpoint = state.checkpoint_service.add(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "Checkpoint added successfully",
            CheckpointBody { checkpoint },
        )),
    ))
}

/// Product trail handler - GET /api/checkpoints/product/{productId}
pub async fn list_by_product(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<CheckpointsBody>>, ApiError> {
    let product_id = Uuid::parse_str(&product_id).map_err(|_| DomainError::ProductNotFound)?;
    let checkpoints = state.checkpoint_service.list_by_product(&product_id).await?;
    let count = checkpoints.len() as i64;
    Ok(Json(ApiResponse::success(CheckpointsBody {
        checkpoints,
        count,
    })))
}

/// Temperature alert handler - GET /api/checkpoints/product/{productId}/alerts
pub async fn temperature_alerts(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<TemperatureAlertReport>>, ApiError> {
    let product_id = Uuid::parse_str(&product_id).map_err(|_| DomainError::ProductNotFound)?;
    let report = state
        .checkpoint_service
        .temperature_alerts(&product_id)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Checkpoint detail handler - GET /api/checkpoints/{id}
pub async fn get_checkpoint(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CheckpointBody<CheckpointDetail>>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::CheckpointNotFound)?;
    let checkpoint = state.checkpoint_service.get(&id).await?;
    Ok(Json(ApiResponse::success(CheckpointBody { checkpoint })))
}

/// Checkpoint update handler - PUT /api/checkpoints/{id}
pub async fn update_checkpoint(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<CheckpointPatch>,
) -> Result<Json<ApiResponse<CheckpointBody<CheckpointWithHandler>>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::CheckpointNotFound)?;
    let checkpoint = state.checkpoint_service.update(&actor, &id, patch).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Checkpoint updated successfully",
        CheckpointBody { checkpoint },
    )))
}

/// Checkpoint delete handler - DELETE /api/checkpoints/{id}
pub async fn delete_checkpoint(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| DomainError::CheckpointNotFound)?;
    state.checkpoint_service.delete(&actor, &id).await?;
    Ok(Json(ApiResponse::message_only(
        "Checkpoint deleted successfully",
    )))
}
