//! Command Handler
//!
//! Executes validated commands against a [`CacheStore`] and decides which
//! reply, if any, goes back to the client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   Frame     │───>│  Command    │───>│  execute()  │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                        dyn CacheStore       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::command::{Command, StorageCommand};
use crate::protocol::{Frame, Reply};
use crate::storage::CacheStore;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Dispatches commands to the store. Cheap to clone, one per connection.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<dyn CacheStore>,
}

impl CommandHandler {
    /// Creates a new command handler over the given store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Validates and executes a framed command.
    ///
    /// Returns `None` when nothing must be written back: `noreply` commands
    /// and malformed commands that are dropped silently.
    pub fn handle_frame(&self, frame: Frame) -> Option<Reply> {
        match Command::try_from(frame) {
            Ok(command) => self.execute(command),
            Err(e) => {
                debug!(error = %e, "Rejected command");
                e.reply()
            }
        }
    }

    /// Executes a command and returns the reply to send, if any.
    pub fn execute(&self, command: Command) -> Option<Reply> {
        match command {
            Command::Get { key } => Some(self.cmd_get(key)),
            Command::Set(cmd) => self.cmd_set(cmd),
            Command::Add(cmd) => self.cmd_add(cmd),
            Command::Replace(cmd) => self.cmd_replace(cmd),
            Command::Delete { key, noreply } => self.cmd_delete(&key, noreply),
        }
    }

    /// get <key>
    fn cmd_get(&self, key: Bytes) -> Reply {
        match self.store.get(&key) {
            Some(item) => Reply::Value {
                key,
                flags: item.flags,
                data: item.value,
            },
            None => Reply::End,
        }
    }

    /// set <key> <flags> <exptime> <bytes> [noreply]
    fn cmd_set(&self, cmd: StorageCommand) -> Option<Reply> {
        let noreply = cmd.noreply;
        let (key, item) = cmd.into_item();
        self.store.set(key, item);
        reply_unless(noreply, Reply::Stored)
    }

    /// add <key> <flags> <exptime> <bytes> [noreply]
    fn cmd_add(&self, cmd: StorageCommand) -> Option<Reply> {
        let noreply = cmd.noreply;
        let (key, item) = cmd.into_item();
        let reply = if self.store.add(key, item) {
            Reply::Stored
        } else {
            Reply::NotStored
        };
        reply_unless(noreply, reply)
    }

    /// replace <key> <flags> <exptime> <bytes> [noreply]
    fn cmd_replace(&self, cmd: StorageCommand) -> Option<Reply> {
        let noreply = cmd.noreply;
        let (key, item) = cmd.into_item();
        let reply = if self.store.replace(key, item) {
            Reply::Stored
        } else {
            Reply::NotStored
        };
        reply_unless(noreply, reply)
    }

    /// delete <key> [noreply]
    fn cmd_delete(&self, key: &[u8], noreply: bool) -> Option<Reply> {
        let reply = if self.store.delete(key) {
            Reply::Deleted
        } else {
            Reply::NotFound
        };
        reply_unless(noreply, reply)
    }
}

#[inline]
fn reply_unless(noreply: bool, reply: Reply) -> Option<Reply> {
    (!noreply).then_some(reply)
}
