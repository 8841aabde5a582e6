//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Token expired")]
    TokenExpired,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtService {
    secret: String,
    token_expiry: i64,
}

impl JwtService {
    pub fn new(secret: String, token_expiry: i64) -> Self {
        Self { secret, token_expiry }
    }

    pub fn generate_token(&self, user_id: &Uuid) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_expiry)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        // No clock leeway; tokens expire exactly at `exp`.
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::ValidationError(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret".into(), 3600)
    }

    #[test]
    fn token_round_trip_preserves_subject() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc.generate_token(&user_id).unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let other = JwtService::new("other-secret".into(), 3600);
        let token = other.generate_token(&Uuid::new_v4()).unwrap();
        assert!(matches!(
            service().validate_token(&token),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let expired = JwtService::new("test-secret".into(), -60);
        let token = expired.generate_token(&Uuid::new_v4()).unwrap();
        assert!(matches!(
            service().validate_token(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().validate_token("not-a-token").is_err());
    }
}
