//! Request extractors

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use uuid::Uuid;

use nexus_core::domain::User;
use nexus_core::DomainError;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, extracted from the `Authorization` bearer header.
///
/// A valid token alone is not enough: the subject must still exist and be
/// active at request time, so every authenticated request re-reads the
/// user row.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::MissingToken)?;
        let claims = state.jwt_service.validate_token(token)?;
        let user_id: Uuid = claims.sub.parse().map_err(|_| ApiError::InvalidToken)?;

        let user = state
            .user_repository
            .find_by_id(&user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        if !user.is_active {
            return Err(DomainError::AccountDeactivated.into());
        }

        Ok(AuthUser(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}
