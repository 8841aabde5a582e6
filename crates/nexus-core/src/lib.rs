//! # NexusChain Core
//!
//! Domain entities, lifecycle derivation, services, and repository traits
//! for the NexusChain supply-chain backend.

pub mod domain;
pub mod derive;
pub mod authz;
pub mod events;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::DomainError;
