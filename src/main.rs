// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitTrack API Server
//!
//! Serves the workout tracker API and the static browser frontend.

use fittrack::{config::Config, db::Stores, services::seed_demo_data, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// How often expired sessions are swept from memory.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment
    let config = Config::from_env()?;

    init_logging(config.is_production());
    tracing::info!(
        port = config.port,
        environment = ?config.environment,
        "Starting FitTrack API"
    );

    // Open storage; Firestore connects on first use
    let stores = Stores::open(&config.database);

    let state = Arc::new(AppState::new(config.clone(), stores));

    if config.seed_demo_data {
        seed_demo_data(&state.stores(), &state.hasher).await?;
    }

    spawn_session_purger(state.clone());

    // Build router
    let app = fittrack::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop expired sessions so abandoned logins do not pile up.
fn spawn_session_purger(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = state.sessions.purge_expired();
            if purged > 0 {
                tracing::info!(purged, active = state.sessions.len(), "Purged expired sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize logging: structured JSON in production, compact text otherwise.
fn init_logging(json: bool) {
    let format = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().boxed()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fittrack=debug,info"));

    tracing_subscriber::registry()
        .with(format)
        .with(filter)
        .init();
}
