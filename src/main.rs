//! Rotor - Entry Point
//!
//! Seeds the proxy pools from a list file, runs the health monitor until a
//! shutdown signal arrives, and reports aggregate statistics on exit.

use std::collections::HashMap;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod manager;
mod models;
mod monitor;
mod pool;
mod rotation;

use config::Config;
use manager::ProxyRotationManager;

#[tokio::main]
async fn main() -> error::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rotor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rotor");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");

    let manager = ProxyRotationManager::new(&config);

    // Seed pools from the proxy list file, if one is given. Each line is
    // `<pool_type> <proxy_url>`; blank lines and #-comments are skipped.
    if let Ok(path) = std::env::var("ROTOR_PROXY_FILE") {
        let contents = std::fs::read_to_string(&path)?;
        let mut batches: HashMap<String, Vec<String>> = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once(char::is_whitespace) {
                Some((pool_type, url)) => batches
                    .entry(pool_type.to_string())
                    .or_default()
                    .push(url.trim().to_string()),
                None => warn!("Skipping malformed proxy list line: {}", line),
            }
        }

        for (pool_type, candidates) in batches {
            match manager.add_pool(&candidates, &pool_type).await {
                Ok(admitted) => info!(
                    "Seeded {} pool with {}/{} proxies",
                    pool_type,
                    admitted,
                    candidates.len()
                ),
                Err(e) => warn!("Skipping {} batch: {}", pool_type, e),
            }
        }
    } else {
        info!("ROTOR_PROXY_FILE not set, starting with empty pools");
    }

    info!("{} proxies registered", manager.proxy_count());

    // Start background health monitoring
    manager.initialize();

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    manager.shutdown().await;

    let stats = manager.statistics();
    info!(
        "Final statistics: {} proxies ({} healthy), success rate {:.2}, avg response {:.3}s",
        stats.total_proxies, stats.healthy_proxies, stats.success_rate, stats.avg_response_time
    );

    info!("Rotor stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
