//! Command Module
//!
//! Turns framed requests into store operations.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ CommandFramer   │  (protocol module)
//! └────────┬────────┘
//!          │ Frame
//!          ▼
//! ┌─────────────────┐
//! │ Command         │  validate arity, flags, exptime, noreply
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  execute, pick the reply
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CacheStore      │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `set <key> <flags> <exptime> <bytes> [noreply]`
//! - `add <key> <flags> <exptime> <bytes> [noreply]`
//! - `replace <key> <flags> <exptime> <bytes> [noreply]`
//! - `get <key>`
//! - `delete <key> [noreply]`

pub mod command;
pub mod handler;

pub use command::{Command, CommandError, StorageCommand};
pub use handler::CommandHandler;
