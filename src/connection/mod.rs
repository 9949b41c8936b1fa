//! Connection Handler Module
//!
//! This module manages individual client connections to FlashCache.
//! Each client connection is handled by its own async task; connections
//! share nothing but the store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Frame line  │───>│ Execute cmd │───>│ Send reply  │     │
//! │  │ (+ data)    │    │             │    │             │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use flashcache::connection::{handle_connection, ConnectionConfig, ConnectionStats};
//! use flashcache::commands::CommandHandler;
//! use flashcache::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(store);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, ConnectionConfig::default(), stats));
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionConfig, ConnectionError, ConnectionHandler, ConnectionStats,
};
