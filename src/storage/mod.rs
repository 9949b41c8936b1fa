//! Storage Module
//!
//! This module provides the item store behind the protocol layer: a
//! thread-safe, sharded map of memcached items with lazy expiry, plus an
//! optional background sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │           CacheStore (trait used by the commands)           │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼──────────────────────────────┐
//! │                        MemoryStore                          │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ (optional)
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use flashcache::storage::{CacheStore, Item, MemoryStore};
//! use bytes::Bytes;
//!
//! let store = MemoryStore::new();
//!
//! assert!(store.add(Bytes::from("session"), Item::new(Bytes::from("token123"), 0, 3600)));
//! assert!(!store.add(Bytes::from("session"), Item::new(Bytes::from("other"), 0, 0)));
//! assert!(store.delete(b"session"));
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{CacheStore, Item, MemoryStore, StoreStats};
pub use expiry::{ExpiryConfig, ExpirySweeper};
