//! Domain errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found")]
    UserNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Checkpoint not found")]
    CheckpointNotFound,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("User with this email already exists")]
    EmailAlreadyExists(String),

    #[error("Wallet address already registered")]
    WalletAddressAlreadyExists(String),

    #[error("Product with this ID already exists")]
    ProductIdAlreadyExists(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
