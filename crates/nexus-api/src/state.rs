//! Application state
//!
//! One `AppState` is built at startup and cloned into every handler via
//! the axum `State` extractor. Services are shared behind `Arc`, so the
//! clone is cheap.

use std::sync::Arc;

use nexus_core::repositories::UserRepository;
use nexus_core::services::{AuthService, CheckpointService, ProductService};
use nexus_security::JwtService;
use nexus_shared::AppConfig;

use crate::realtime::RealtimeHub;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_service: Arc<AuthService>,
    pub product_service: Arc<ProductService>,
    pub checkpoint_service: Arc<CheckpointService>,
    pub jwt_service: Arc<JwtService>,
    pub user_repository: Arc<dyn UserRepository>,
    pub hub: Arc<RealtimeHub>,
}
