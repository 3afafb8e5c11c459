//! Purse gateway
//!
//! Public edge of the billing system. Invoice and withdraw requests are
//! validated and queued; wallet creation and reads are proxied to the
//! billing server.

mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use purse_api::{init_tracing, shutdown_signal};
use purse_db::{PgQueue, connect};
use purse_shared::AppConfig;

use routes::{GatewayState, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(config.app.env);

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.gateway.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;
    let queue = Arc::new(PgQueue::new(db.clone(), config.queue.lease()));
    let state = GatewayState::new(queue, client, &config.gateway.billing_url);
    info!(billing_url = %state.billing_url, "Proxying reads to billing");

    let app = create_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await?;
    info!("Shutdown complete");

    Ok(())
}
