//! # NexusChain API
//!
//! HTTP and WebSocket surface of the platform. Handlers stay thin: they
//! decode the request, call into `nexus-core` services and translate the
//! outcome into the shared response envelope.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod realtime;
pub mod response;
pub mod state;

pub use error::ApiError;
pub use response::ApiResponse;
pub use state::AppState;
