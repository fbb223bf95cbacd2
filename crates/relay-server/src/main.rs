//! Relay Server
//!
//! Reliable pub/sub broadcast endpoint. One task owns the broadcast
//! socket; producers publish through the in-process control channel;
//! subscribers receive a welcome message on connect and heartbeats at a
//! fixed interval.
//!
//! # Startup Flow
//!
//! 1. Initialize tracing from the environment
//! 2. Load configuration from environment variables
//! 3. Bind the broadcast socket and start the event loop
//! 4. Wait for shutdown signal
//! 5. Shut down with a bounded deadline

#![warn(clippy::pedantic)]

use std::time::Duration;

use anyhow::Context;
use relay_server::config::Config;
use relay_server::server::RelayServer;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Deadline for the event loop to exit after the shutdown command.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting relay server");

    let config = Config::from_env();
    info!(
        bind_address = %config.bind_address,
        heartbeat_interval = ?config.heartbeat_interval,
        "Configuration loaded"
    );

    let server = RelayServer::bind(&config)
        .await
        .context("failed to start relay server")?;
    info!(addr = %server.local_addr(), "Relay server running - press Ctrl+C to shutdown");

    shutdown_signal().await;

    info!("Shutdown signal received, stopping event loop...");
    server
        .shutdown(SHUTDOWN_DEADLINE)
        .await
        .context("shutdown did not complete cleanly")?;

    info!("Relay server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable
/// because without signal handlers, we cannot gracefully shut down.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
