//! FlashCache - An In-Memory, Memcached-Compatible Cache Server
//!
//! This is the main entry point for the FlashCache server.
//! It parses flags, sets up logging and the store, and runs the server
//! until Ctrl+C.

use clap::Parser;
use flashcache::storage::{ExpiryConfig, ExpirySweeper, MemoryStore};
use flashcache::{Config, Server};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_banner(config: &Config) {
    println!(
        r#"
FlashCache v{} - In-Memory Memcached-Compatible Cache
──────────────────────────────────────────────────────
Listening on {}
Max item size: {} bytes

Use Ctrl+C to shutdown gracefully.
"#,
        flashcache::VERSION,
        config.bind_address(),
        config.max_item_size,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    print_banner(&config);

    // Shared across all connections
    let store = Arc::new(MemoryStore::new());

    let _sweeper = config.sweep_interval().map(|interval| {
        ExpirySweeper::start(Arc::clone(&store), ExpiryConfig::with_interval(interval))
    });

    let server = Server::new(config, store.clone());
    let stats = server.stats();

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        result = server.run() => result?,
        _ = shutdown => {}
    }

    let store_stats = store.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        bytes_read = stats.bytes_read.load(Ordering::Relaxed),
        bytes_written = stats.bytes_written.load(Ordering::Relaxed),
        items = store_stats.items,
        get_hits = store_stats.get_hits,
        get_misses = store_stats.get_misses,
        expired = store_stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}
