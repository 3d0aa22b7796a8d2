// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garden Drops API Server
//!
//! Accepts challenge submissions, lets admins verify them, and ranks
//! learners by the drops they have earned.

use garden_drops::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb},
    seed,
    services::LocalBlobStore,
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
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Garden Drops API"
    );

    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    let blobs = Arc::new(LocalBlobStore::new(config.uploads_dir.clone()));
    tracing::info!(dir = %config.uploads_dir.display(), "Upload storage ready");

    let state = match config.store_backend {
        StoreBackend::Firestore => {
            let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);
            if config.seed_demo_leaderboard {
                seed_leaderboard(db.as_ref()).await;
            }
            AppState::new(config.clone(), db, blobs)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let db = Arc::new(MemoryDb::new());
            if config.seed_demo_leaderboard {
                seed_leaderboard(db.as_ref()).await;
            }
            AppState::new(config.clone(), db, blobs)
        }
    };

    // Build router
    let app = garden_drops::routes::create_router(Arc::new(state));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Seeding is a convenience; a failure must not stop the server.
async fn seed_leaderboard(store: &dyn garden_drops::db::LeaderboardStore) {
    match seed::ensure_demo_leaderboard(store).await {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "Demo leaderboard seeded"),
        Err(e) => tracing::warn!(error = %e, "Demo leaderboard seed failed"),
    }
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
                .add_directive("garden_drops=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .try_init()?;

    Ok(())
}
