// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coach-Sync API Server
//!
//! Connects coaches' and athletes' Garmin Connect accounts and lets coaches
//! share workouts that athletes import with one click.

use coach_sync::{
    config::Config,
    db::{FirestoreDb, MemoryDb, Store},
    services::GarminConnectClient,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Coach-Sync API");

    // Firestore when a project is configured, otherwise in-memory
    let store: Arc<dyn Store> = match &config.gcp_project_id {
        Some(project_id) => {
            tracing::info!(project = %project_id, "Using Firestore store");
            Arc::new(FirestoreDb::new(project_id).await?)
        }
        None => {
            tracing::warn!("GCP_PROJECT_ID not set; using in-memory store (data is lost on restart)");
            Arc::new(MemoryDb::new())
        }
    };

    let garmin = Arc::new(GarminConnectClient::new(
        config.garmin_sso_url.clone(),
        config.garmin_api_url.clone(),
        config.garmin_timeout,
    )?);
    tracing::info!(
        timeout_secs = config.garmin_timeout.as_secs(),
        "Garmin Connect client initialized"
    );

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::build(config, store, garmin)?);

    // Build router
    let app = coach_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coach_sync=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
