//! # FlashCache - An In-Memory, Memcached-Compatible Cache Server
//!
//! FlashCache speaks the memcached text protocol over TCP and keeps every
//! item in memory. It demonstrates systems programming concepts like
//! stream framing, concurrent data structures and async networking.
//!
//! ## Features
//!
//! - **Memcached-Compatible**: `set`, `add`, `replace`, `get` and `delete`
//!   with flags, expiry and `noreply`
//! - **Binary-Safe**: data blocks are framed by byte count, never scanned
//! - **Concurrent**: sharded storage with RwLocks, one Tokio task per client
//! - **Lazy Expiry**: expired items are treated as absent and purged on access
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             FlashCache                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐   ┌──────────────────────────────┐  │
//! │                     │  Command    │   │  MemoryStore (CacheStore)    │  │
//! │                     │  Framer     │   │  ┌────────┐ ┌────────┐       │  │
//! │                     └─────────────┘   │  │Shard 0 │ │...N    │       │  │
//! │                                       │  │RwLock  │ │shards  │       │  │
//! │                                       │  └────────┘ └────────┘       │  │
//! │                                       └──────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use flashcache::{Config, MemoryStore, Server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     Server::new(Config::default(), store).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: command framing and reply serialization
//! - [`commands`]: command validation and dispatch
//! - [`storage`]: the concurrent item store
//! - [`connection`]: per-client connection loop
//! - [`server`]: listener and accept loop
//! - [`config`]: command-line configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionConfig, ConnectionStats};
pub use protocol::{CommandFramer, Frame, FrameError, Reply};
pub use server::{Server, ServerError};
pub use storage::{CacheStore, ExpiryConfig, ExpirySweeper, Item, MemoryStore};

/// The default port FlashCache listens on (same as memcached)
pub const DEFAULT_PORT: u16 = 11211;

/// The default interface FlashCache binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of FlashCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
