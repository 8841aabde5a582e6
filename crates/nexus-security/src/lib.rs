//! # NexusChain Security
//!
//! Security utilities: JWT issuance and validation, password hashing.

pub mod jwt;
pub mod password;

pub use jwt::{JwtError, JwtService};
pub use password::PasswordService;
