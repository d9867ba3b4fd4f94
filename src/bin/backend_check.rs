// ABOUTME: Backend connectivity check for the chat store
// ABOUTME: Pings, round-trips a sentinel key, and prints the backend health report
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Backend connectivity checker.
//!
//! Usage:
//! ```bash
//! cargo run --bin backend-check
//! cargo run --bin backend-check -- --redis-url redis://127.0.0.1:6379
//! ```

use anyhow::{bail, Context, Result};
use chat_store::backend::BackendConnection;
use chat_store::config::BackendConfig;
use chat_store::connection::ConnectionManager;
use chat_store::health::check_backend;
use chat_store::logging::LoggingConfig;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

const SENTINEL_KEY: &str = "test:connection";
const SENTINEL_VALUE: &[u8] = b"Hello from chat-store!";
const SENTINEL_TTL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "backend-check",
    about = "Chat Store Backend Connectivity Check",
    long_about = "Verify the configured backend accepts connections, writes, reads, and deletes"
)]
struct CheckArgs {
    /// Backend URL override
    #[arg(long)]
    redis_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CheckArgs::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    LoggingConfig::for_cli(log_level).init()?;

    dotenvy::dotenv().ok();
    let backend = match args.redis_url {
        Some(url) => BackendConfig::new(url),
        None => BackendConfig::from_env().context("Set REDIS_URL or pass --redis-url")?,
    };

    info!("Connecting to backend at: {}", backend.redacted_url());
    let connections = ConnectionManager::open(backend).await?;

    let result = run_checks(&connections).await;
    connections.close().await;
    result
}

async fn run_checks(connections: &ConnectionManager) -> Result<()> {
    info!("Testing connection...");
    let mut conn = connections
        .acquire()
        .await
        .context("Backend connection failed")?;
    info!("Connected and answered PING");

    info!("Testing write operation...");
    conn.set_with_expiry(SENTINEL_KEY, SENTINEL_VALUE, SENTINEL_TTL).await?;
    info!("Wrote sentinel key '{}'", SENTINEL_KEY);

    info!("Testing read operation...");
    let value = conn.get(SENTINEL_KEY).await?;
    if value.as_deref() != Some(SENTINEL_VALUE) {
        error!("Sentinel key read back {:?}", value.as_deref().map(String::from_utf8_lossy));
        bail!("Sentinel value mismatch");
    }
    info!("Read sentinel key back: {}", String::from_utf8_lossy(SENTINEL_VALUE));

    conn.delete(SENTINEL_KEY).await?;
    drop(conn);

    let health = check_backend(connections).await;
    println!("{}", serde_json::to_string_pretty(&health)?);
    if !health.is_healthy() {
        bail!(
            "Backend reported unhealthy: {}",
            health.error.unwrap_or_default()
        );
    }

    info!("Backend check completed successfully");
    Ok(())
}
