//! IT help desk server

use std::sync::Arc;

use itdesk_api::config::{LoadError, ServiceConfig, DEFAULT_CONFIG_PATH};
use itdesk_api::{bootstrap, build_router, in_memory_deps, ApiState};
use itdesk_common::{SharedClock, SystemClock};
use itdesk_support::{SlaEvaluator, SlaScheduler, TracingNotifier};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("IT desk v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("ITDESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = match ServiceConfig::load(&config_path) {
        Ok(config) => config,
        Err(LoadError::Missing(path)) => {
            tracing::warn!(%path, "config not found, using defaults");
            ServiceConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    if config.auth.uses_dev_secret() {
        tracing::warn!("auth.secret is the built-in development secret; set it before exposing this server");
    }

    let clock: SharedClock = Arc::new(SystemClock);
    let deps = in_memory_deps(Arc::new(TracingNotifier), clock.clone());
    let state = ApiState::new(&deps, &config);

    if let Some(seed) = &config.bootstrap {
        let admin = bootstrap(&deps, seed).await?;
        let token = state.tokens.issue(admin.id, clock.now())?;
        tracing::info!(user_id = %admin.id, token = %token.token, "bootstrap admin token");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let evaluator = SlaEvaluator::new(Arc::new(config.sla.table.clone()));
    let sweeper = Arc::new(deps.sweeper(evaluator).with_shutdown(shutdown_rx.clone()));
    let scheduler = SlaScheduler::spawn(sweeper, config.sla.sweep_interval(), shutdown_rx);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("shutting down");
    shutdown_tx.send(true)?;
    scheduler.await?;
    Ok(())
}
