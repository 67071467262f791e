//! Mailkit Web Server - Resend webhook receiver and double opt-in endpoint.
//!
//! This binary:
//! - Sends one-off emails through the Resend API
//! - Verifies svix-signed webhook deliveries
//! - Runs the double opt-in flow (subscribe, then confirm on `email.clicked`)
//!
//! Every failure is answered with a JSON error; none stops the server.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailkit::config::load_dotenv;
use mailkit::web::router;
use mailkit::{AppState, Config, ResendClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    load_dotenv();
    let config = Config::from_env();
    info!(
        port = config.port,
        api_base_url = %config.api_base_url,
        webhook_secret_configured = config.webhook_secret.is_some(),
        audience_configured = config.audience_id.is_some(),
        webhook_tolerance_secs = config.webhook_tolerance_secs,
        "config_loaded"
    );

    if config.webhook_secret.is_none() {
        warn!("webhook_secret_not_configured");
    }

    let client = ResendClient::with_base_url(
        config.require_api_key()?,
        &config.api_base_url,
        config.request_timeout(),
    )
    .context("Failed to create Resend client")?;

    let port = config.port;
    let app = router(AppState::new(config, client));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
