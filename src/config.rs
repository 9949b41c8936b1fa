//! Server Configuration
//!
//! Command-line flags for the server. Flag names follow memcached where an
//! equivalent exists (`-l`, `-p`, `-I`).

use crate::connection::ConnectionConfig;
use clap::Parser;
use std::time::Duration;

/// FlashCache - an in-memory, memcached-compatible cache server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "flashcache")]
#[command(version)]
pub struct Config {
    /// Interface to listen on
    #[arg(short = 'l', long = "listen", default_value = crate::DEFAULT_HOST)]
    pub host: String,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Largest accepted item payload, in bytes
    #[arg(short = 'I', long, default_value_t = crate::protocol::DEFAULT_MAX_PAYLOAD)]
    pub max_item_size: usize,

    /// Close connections idle for this many seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub idle_timeout: u64,

    /// Background expiry sweep interval in milliseconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub sweep_interval_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            max_item_size: crate::protocol::DEFAULT_MAX_PAYLOAD,
            idle_timeout: 0,
            sweep_interval_ms: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }

    /// The per-connection part of the configuration.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            max_item_size: self.max_item_size,
            idle_timeout: self.idle_timeout(),
            ..ConnectionConfig::default()
        }
    }
}
