//! Purse billing server
//!
//! Serves the wallet API and runs one consumer per request topic. On
//! SIGINT/SIGTERM the listener drains, the consumers finish their in-flight
//! unit, and the pool is closed.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use purse_api::{AppState, create_router, init_tracing, shutdown_signal};
use purse_core::consumer::{ConsumerSettings, RequestConsumer};
use purse_core::escrow::EscrowEngine;
use purse_core::queue::Topic;
use purse_db::{PgQueue, PgStore, connect};
use purse_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(config.app.env);

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let store = PgStore::new(db.clone());
    let queue = Arc::new(PgQueue::new(db.clone(), config.queue.lease()));
    let engine = Arc::new(EscrowEngine::new(store.clone()));
    let settings = ConsumerSettings::from(&config.queue);

    let shutdown = CancellationToken::new();
    let consumers = TaskTracker::new();
    for topic in Topic::ALL {
        let consumer =
            RequestConsumer::new(topic, Arc::clone(&queue), Arc::clone(&engine), settings);
        consumers.spawn(consumer.run(shutdown.clone()));
    }
    consumers.close();

    let app = create_router(AppState { store, queue });

    let addr = config.server.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(drain_on_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    consumers.wait().await;
    db.close().await?;
    info!("Shutdown complete");

    Ok(())
}

/// Resolves on SIGINT, SIGTERM or an external cancellation.
async fn drain_on_signal(shutdown: CancellationToken) {
    tokio::select! {
        () = shutdown_signal() => {}
        () = shutdown.cancelled() => {}
    }
    info!("Draining");
}
