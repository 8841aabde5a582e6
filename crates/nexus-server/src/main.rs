use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode, Uri,
    },
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use nexus_api::{
    handlers,
    realtime::{ws_handler, RealtimeHub},
    AppState,
};
use nexus_core::events::Notifier;
use nexus_core::repositories::{CheckpointRepository, ProductRepository, UserRepository};
use nexus_core::services::{AuthService, CheckpointService, ProductService};
use nexus_infrastructure::{
    create_pool, run_migrations, PgCheckpointRepository, PgProductRepository, PgUserRepository,
};
use nexus_security::JwtService;
use nexus_shared::config::AppConfig;
use nexus_shared::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_telemetry();

    info!("🚀 Starting NexusChain Backend Server...");

    let config = AppConfig::load()?;
    info!("✅ Configuration loaded ({})", config.app.env);

    let pool = create_pool(&config.database.url, config.database.max_connections).await?;
    info!("✅ Database connection established");

    run_migrations(&pool).await?;
    info!("✅ Migrations applied");

    let user_repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let product_repo: Arc<dyn ProductRepository> = Arc::new(PgProductRepository::new(pool.clone()));
    let checkpoint_repo: Arc<dyn CheckpointRepository> =
        Arc::new(PgCheckpointRepository::new(pool.clone()));

    let hub = Arc::new(RealtimeHub::new(config.realtime.channel_capacity));
    let notifier = Notifier::new(hub.clone());
    let jwt_service = Arc::new(JwtService::new(
        config.jwt.secret.clone(),
        config.jwt.token_expiry,
    ));

    let auth_service = Arc::new(AuthService::new(user_repo.clone(), jwt_service.clone()));
    let product_service = Arc::new(ProductService::new(
        product_repo.clone(),
        user_repo.clone(),
        checkpoint_repo.clone(),
        notifier.clone(),
    ));
    let checkpoint_service = Arc::new(CheckpointService::new(
        checkpoint_repo,
        product_repo,
        user_repo.clone(),
        notifier,
    ));

    let cors_origin = config
        .cors
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", config.cors.allowed_origin, e))?;

    let state = AppState {
        config: Arc::new(config.clone()),
        auth_service,
        product_service,
        checkpoint_service,
        jwt_service,
        user_repository: user_repo,
        hub,
    };

    let app = build_router(state, cors_origin);

    let addr = SocketAddr::from((config.app.host.parse::<IpAddr>()?, config.app.port));
    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server closed");
    Ok(())
}

fn build_router(state: AppState, cors_origin: HeaderValue) -> Router {
    // Authentication itself is enforced inside the handlers through the
    // AuthUser extractor; the split below just keeps the route table
    // readable.
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/products/verify/{productId}",
            get(handlers::products::verify_product),
        )
        .route("/ws", get(ws_handler));

    let protected_routes = Router::new()
        .route(
            "/api/auth/me",
            get(handlers::auth::me).put(handlers::auth::update_me),
        )
        .route(
            "/api/auth/change-password",
            put(handlers::auth::change_password),
        )
        .route(
            "/api/products",
            post(handlers::products::register_product).get(handlers::products::list_products),
        )
        .route(
            "/api/products/{id}",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route(
            "/api/products/{id}/blockchain",
            put(handlers::products::update_blockchain),
        )
        .route(
            "/api/checkpoints",
            post(handlers::checkpoints::add_checkpoint),
        )
        .route(
            "/api/checkpoints/product/{productId}",
            get(handlers::checkpoints::list_by_product),
        )
        .route(
            "/api/checkpoints/product/{productId}/alerts",
            get(handlers::checkpoints::temperature_alerts),
        )
        .route(
            "/api/checkpoints/{id}",
            get(handlers::checkpoints::get_checkpoint)
                .put(handlers::checkpoints::update_checkpoint)
                .delete(handlers::checkpoints::delete_checkpoint),
        );

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received: closing HTTP server");
}
