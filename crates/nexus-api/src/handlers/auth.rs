// ============================================================================
// NexusChain API - Auth Handlers
// File: crates/nexus-api/src/handlers/auth.rs
// ============================================================================
//! Authentication HTTP handlers (register, login, profile, password)

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use nexus_core::domain::User;
use nexus_core::services::{ChangePasswordRequest, LoginRequest, RegisterRequest, UserPatch};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Authenticated user plus their bearer token.
#[derive(Debug, Serialize)]
pub struct AuthBody {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: User,
}

/// Register handler - POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthBody>>), ApiError> {
    let payload = state.auth_service.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            "User registered successfully",
            AuthBody {
                user: payload.user,
                token: payload.token,
            },
        )),
    ))
}

/// Login handler - POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthBody>>, ApiError> {
    let payload = state.auth_service.login(req).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Login successful",
        AuthBody {
            user: payload.user,
            token: payload.token,
        },
    )))
}

/// Current user handler - GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Json<ApiResponse<UserBody>> {
    Json(ApiResponse::success(UserBody { user }))
}

/// Profile update handler - PUT /api/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(patch): Json<UserPatch>,
) -> Result<Json<ApiResponse<UserBody>>, ApiError> {
    let user = state.auth_service.update_profile(&actor.id, patch).await?;
    Ok(Json(ApiResponse::success_with_message(
        "User updated successfully",
        UserBody { user },
    )))
}

/// Password change handler - PUT /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.auth_service.change_password(&actor.id, req).await?;
    Ok(Json(ApiResponse::message_only(
        "Password changed successfully",
    )))
}
