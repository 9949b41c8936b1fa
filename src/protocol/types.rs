//! Memcached Text Protocol Types
//!
//! This module defines what travels over the wire: the frames the server
//! reads and the replies it writes.
//!
//! ## Protocol Format
//!
//! Commands are single lines of space-separated tokens. Storage commands are
//! followed by a data block of exactly `<bytes>` bytes and a line terminator:
//!
//! ```text
//! set <key> <flags> <exptime> <bytes> [noreply]\r\n
//! <data block>\r\n
//! ```
//!
//! Replies are CRLF-terminated status words, or for `get` a value block:
//!
//! ```text
//! VALUE <key> <flags> <bytes>\r\n
//! <data block>\r\n
//! END\r\n
//! ```

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used for every reply line
pub const CRLF: &[u8] = b"\r\n";

/// Command verbs, lowercase as the framer normalizes them.
pub mod verb {
    pub const GET: &str = "get";
    pub const SET: &str = "set";
    pub const ADD: &str = "add";
    pub const REPLACE: &str = "replace";
    pub const DELETE: &str = "delete";

    /// Returns true for verbs followed by a data block.
    pub fn is_storage(verb: &str) -> bool {
        matches!(verb, SET | ADD | REPLACE)
    }
}

/// One command as read off the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// First token, lowercased
    pub verb: String,
    /// Remaining tokens, raw bytes exactly as received
    pub args: Vec<Bytes>,
    /// Data block for storage commands whose byte count could be read
    pub payload: Option<Bytes>,
}

/// A reply sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `STORED`
    Stored,
    /// `NOT_STORED`
    NotStored,
    /// `DELETED`
    Deleted,
    /// `NOT_FOUND`
    NotFound,
    /// `ERROR`
    Error,
    /// A hit: the `VALUE` line, the data block, then `END`
    Value { key: Bytes, flags: u16, data: Bytes },
    /// A miss: `END` alone
    End,
}

impl Reply {
    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Stored => buf.extend_from_slice(b"STORED"),
            Reply::NotStored => buf.extend_from_slice(b"NOT_STORED"),
            Reply::Deleted => buf.extend_from_slice(b"DELETED"),
            Reply::NotFound => buf.extend_from_slice(b"NOT_FOUND"),
            Reply::Error => buf.extend_from_slice(b"ERROR"),
            Reply::Value { key, flags, data } => {
                buf.reserve(key.len() + data.len() + 32);
                buf.extend_from_slice(b"VALUE ");
                buf.extend_from_slice(key);
                buf.extend_from_slice(format!(" {} {}", flags, data.len()).as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(b"END");
            }
            Reply::End => buf.extend_from_slice(b"END"),
        }
        buf.extend_from_slice(CRLF);
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Stored => write!(f, "STORED"),
            Reply::NotStored => write!(f, "NOT_STORED"),
            Reply::Deleted => write!(f, "DELETED"),
            Reply::NotFound => write!(f, "NOT_FOUND"),
            Reply::Error => write!(f, "ERROR"),
            Reply::Value { key, flags, data } => {
                write!(f, "VALUE {} {} {}", key.escape_ascii(), flags, data.len())
            }
            Reply::End => write!(f, "END"),
        }
    }
}
