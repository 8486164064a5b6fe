//! Inkstream - Realtime Whiteboard Relay
//!
//! Entry point for the relay server.

#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkstream_canvas::SessionManager;

mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkstream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Inkstream relay v{}", env!("CARGO_PKG_VERSION"));

    let bind = std::env::var("INKSTREAM_RELAY_BIND").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let app = server::build_router(Arc::new(SessionManager::new()));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(%bind, "relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
