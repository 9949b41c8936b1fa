//! Memcached Text Protocol Implementation
//!
//! This module frames memcached text commands off a byte stream and
//! serializes the replies.
//!
//! ## Modules
//!
//! - `types`: `Frame` and `Reply`, and reply serialization
//! - `parser`: the `CommandFramer` that reads frames from a buffered reader
//!
//! ## Example
//!
//! ```ignore
//! use flashcache::protocol::{CommandFramer, Reply};
//!
//! // Framing incoming data
//! let mut framer = CommandFramer::new(&b"set name 0 0 4\r\nAriz\r\n"[..]);
//! let frame = framer.read_frame().await?.unwrap();
//!
//! // Creating replies
//! let bytes = Reply::Stored.serialize();
//! ```

pub mod parser;
pub mod types;

pub use parser::{CommandFramer, FrameError, DEFAULT_MAX_LINE, DEFAULT_MAX_PAYLOAD};
pub use types::{verb, Frame, Reply};
