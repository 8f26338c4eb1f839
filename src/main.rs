//! Synergy Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use f1_synergy_analyzer::api::{create_router, AppState};
use f1_synergy_analyzer::ingest::providers::openf1::OpenF1Source;
use f1_synergy_analyzer::service::SynergyService;
use f1_synergy_analyzer::telemetry::Telemetry;
use f1_synergy_analyzer::weights;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - SYNERGY_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("SYNERGY_DEV_LOG")
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

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("synergy=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // Enables SYNERGY_WEIGHTS_PATH / OPENF1_BASE_URL overrides from .env.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let telemetry = Telemetry::init();

    let initial = weights::load_weights_default().expect("Failed to load synergy weights");
    let source = Arc::new(OpenF1Source::from_env());
    let service = Arc::new(SynergyService::new(source, initial));

    let router = create_router(AppState { service }).merge(telemetry.router());

    Ok(router.into())
}
