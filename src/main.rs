//! CampusPhoto binary entry point

use campusphoto::{AppState, config};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (heat recalculation, write-behind flush)
/// 6. Serve until Ctrl-C or SIGTERM, then flush pending writes
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG overrides the configured level
    let default_filter = format!("campusphoto={},tower_http=debug", config.logging.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting CampusPhoto...");
    campusphoto::metrics::init_metrics();
    tracing::info!(
        address = %config.bind_address(),
        strategy = %config.cache.default_strategy.as_str(),
        "Configuration loaded"
    );

    // 3. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 4. Build Axum router
    let app = campusphoto::build_router(state.clone());

    // 5. Start background tasks
    if config.ranking.recalculate_interval_seconds > 0 {
        spawn_heat_task(state.clone());
    } else {
        tracing::info!("Periodic heat recalculation disabled");
    }
    spawn_write_behind_task(state.clone());

    // 6. Start HTTP server
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let flushed = state.engine.flush_write_behind().await;
    tracing::info!(flushed, "Pending writes flushed; shutting down");

    Ok(())
}

/// Spawn background heat-score recalculation task
fn spawn_heat_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.ranking.recalculate_interval_seconds;
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        // First tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.rankings.recalculate_all().await {
                Ok(updated) => {
                    state.engine.invalidate_rankings().await;
                    tracing::debug!(updated, "Scheduled heat recalculation completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scheduled heat recalculation failed");
                }
            }
        }
    });

    tracing::info!("Heat recalculation task spawned");
}

/// Spawn background write-behind flush task
fn spawn_write_behind_task(state: AppState) {
    tokio::spawn(async move {
        let interval_ms = state.config.cache.write_behind_flush_ms;
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if state.engine.pending_writes() == 0 {
                continue;
            }
            let flushed = state.engine.flush_write_behind().await;
            tracing::debug!(flushed, "Write-behind flush completed");
        }
    });

    tracing::info!("Write-behind flush task spawned");
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
