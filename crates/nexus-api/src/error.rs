//! HTTP error mapping
//!
//! Domain and token errors are translated here into status codes plus the
//! shared failure envelope. Internal failures are logged with their detail
//! and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use nexus_core::DomainError;
use nexus_security::JwtError;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access token required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => ApiError::TokenExpired,
            JwtError::CreationError(_) | JwtError::ValidationError(_) => ApiError::InvalidToken,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingToken => {
                tracing::warn!("Request rejected: no access token");
                (StatusCode::UNAUTHORIZED, "Access token required".to_string())
            }
            ApiError::InvalidToken => {
                tracing::warn!("Request rejected: invalid token");
                (StatusCode::FORBIDDEN, "Invalid token".to_string())
            }
            ApiError::TokenExpired => {
                tracing::warn!("Request rejected: expired token");
                (StatusCode::FORBIDDEN, "Token expired".to_string())
            }
            ApiError::Domain(err) => domain_error_response(err),
        };

        (status, Json(ApiResponse::failure(&message))).into_response()
    }
}

fn domain_error_response(err: DomainError) -> (StatusCode, String) {
    match err {
        DomainError::ValidationError(msg) => {
            tracing::warn!("Validation failed: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        DomainError::Forbidden(msg) => {
            tracing::warn!("Forbidden: {}", msg);
            (StatusCode::FORBIDDEN, msg)
        }
        err @ (DomainError::UserNotFound
        | DomainError::InvalidCredentials
        | DomainError::CurrentPasswordIncorrect) => {
            tracing::warn!("Authentication rejected: {}", err);
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        err @ DomainError::AccountDeactivated => {
            tracing::warn!("Authentication rejected: {}", err);
            (StatusCode::FORBIDDEN, err.to_string())
        }
        err @ (DomainError::ProductNotFound | DomainError::CheckpointNotFound) => {
            tracing::warn!("Lookup failed: {}", err);
            (StatusCode::NOT_FOUND, err.to_string())
        }
        err @ (DomainError::EmailAlreadyExists(_)
        | DomainError::WalletAddressAlreadyExists(_)
        | DomainError::ProductIdAlreadyExists(_)) => {
            tracing::warn!("Conflict: {}", err);
            (StatusCode::CONFLICT, err.to_string())
        }
        err @ (DomainError::PasswordHashError(_)
        | DomainError::TokenGenerationError(_)
        | DomainError::DatabaseError(_)
        | DomainError::InternalError(_)) => {
            tracing::error!("Internal failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_their_message() {
        let (status, message) =
            domain_error_response(DomainError::ValidationError("Please provide email".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Please provide email");
    }

    #[test]
    fn conflicts_map_to_409() {
        let (status, message) =
            domain_error_response(DomainError::EmailAlreadyExists("a@b.com".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "User with this email already exists");
    }

    #[test]
    fn internal_details_never_reach_the_client() {
        let (status, message) =
            domain_error_response(DomainError::DatabaseError("connection reset".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn expired_tokens_are_distinguished_from_invalid_ones() {
        assert!(matches!(
            ApiError::from(JwtError::TokenExpired),
            ApiError::TokenExpired
        ));
        assert!(matches!(
            ApiError::from(JwtError::ValidationError("bad signature".into())),
            ApiError::InvalidToken
        ));
    }
}
