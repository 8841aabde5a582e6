//! Telemetry setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// Emits JSON logs when `APP_ENV=production`, compact human-readable
/// output otherwise. Filtering is controlled through `RUST_LOG` and
/// defaults to `info`.
pub fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let production = std::env::var("APP_ENV")
        .map(|e| e == "production")
        .unwrap_or(false);

    if production {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
