//! Template matcher service: binary entrypoint.
//! Boots the Axum HTTP server, wiring configuration, the response engine and metrics.

use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use template_matcher::{app, metrics::Metrics, start_hot_reload_thread, ResponderConfig};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - RESPONDER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("RESPONDER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("responder=info,template_matcher=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = ResponderConfig::from_env()?;
    let patterns_path = cfg.patterns.path.clone();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    let (router, handle) = app(cfg, metrics.as_ref());
    info!(patterns = handle.pattern_count(), "response engine ready");

    // If hot reload is enabled, spawn background watcher
    start_hot_reload_thread(handle, patterns_path);

    Ok(router.into())
}
