//! Cache Test POC API entry point.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::{fmt, fmt::writer::MakeWriterExt, prelude::*, EnvFilter};

use cache_test_poc::api::{create_router, AppState};
use cache_test_poc::config::Config;
use cache_test_poc::metrics;
use cache_test_poc::server::Server;
use cache_test_poc::utils::{iso_timestamp, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started_at = Instant::now();

    // Initialize logging: warnings and errors on stderr, the rest on stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    let port = config.port;
    let environment = config.node_env.clone();
    let app_state = AppState::new(config, started_at);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = Server::bind(addr, create_router(app_state))
        .await
        .context("failed to start server")?;

    info!("Server running on port {}", server.port()?);
    info!("Environment: {}", environment);
    info!("Started at: {}", iso_timestamp());

    let outcome = server.run(shutdown_signal()).await;
    std::process::exit(outcome.exit_code())
}
