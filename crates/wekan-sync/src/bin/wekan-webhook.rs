//! Webhook receiver binary.
//!
//! Standalone HTTP service bridging GitHub webhooks to Wekan boards.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wekan_sync::{
    board::BoardCreator, client::WekanClient, config::Config, server, templates::TemplateManager,
    WekanAuthManager,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("wekan_sync=info".parse()?))
        .init();

    info!("Starting GitHub webhook receiver...");

    let config = Config::default();

    let templates = match &config.templates_dir {
        Some(dir) => TemplateManager::with_templates_dir(Path::new(dir)),
        None => TemplateManager::new(),
    };

    let wekan = if config.standalone {
        info!("Mode: standalone (no Wekan connection required)");
        None
    } else {
        let username = config
            .wekan_username
            .as_deref()
            .context("WEKAN_USERNAME is required outside standalone mode")?;
        let password = config
            .wekan_password
            .as_deref()
            .context("WEKAN_PASSWORD is required outside standalone mode")?;

        // Authentication is eager; rejected credentials are fatal here
        let auth = WekanAuthManager::connect(&config.wekan_url, username, password)
            .await
            .context("Failed to authenticate with Wekan")?;
        info!(wekan_url = %config.wekan_url, "Connected to Wekan");

        let client = WekanClient::new(Arc::new(auth));
        Some(BoardCreator::new(client, templates))
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "Webhook endpoint: /github-webhook");
    info!("Health check endpoint: /health");

    let router = server::build_router(server::AppState { config, wekan });

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, router).await.context("Server error")?;

    Ok(())
}
