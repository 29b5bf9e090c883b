pub mod api;
pub mod auth;
pub mod collab;
pub mod config;
pub mod database;
pub mod docs;
pub mod error;
pub mod mail;
pub mod notifications;
pub mod realtime;

use std::sync::Arc;

use anyhow::Context;

use api::AppState;
use config::Config;
use database::Database;
use docs::TrashSweeper;

/// Open storage, start the trash sweeper and serve until the listener fails
pub async fn run(config: Config) -> anyhow::Result<()> {
    // Initialize database
    let db = Database::new(&config.database_path)
        .with_context(|| format!("failed to open database at {}", config.database_path.display()))?;
    let db = Arc::new(db);

    // Background hard-delete of expired trash
    TrashSweeper::new(db.clone(), config.trash_retention, config.sweep_interval).spawn();

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(db, config));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(addr = %bind_addr, "EtherXWord server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
