//! Conversion server binary

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convert_web::{app, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::parse();

    let filter = if config.verbose {
        EnvFilter::new("convert_web=debug,convert_core=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("convert_web=info,convert_core=info,tower_http=debug"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing conversion service...");
    let state = Arc::new(AppState::new(&config).await?);
    let router = app(state, config.body_limit());

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Upload limit: {} MiB", config.max_upload_mb);

    axum::serve(listener, router).await?;

    Ok(())
}
