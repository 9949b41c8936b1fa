//! Typed Commands
//!
//! Converts a [`Frame`] into a [`Command`], validating arity and numeric
//! fields. Validation failures are [`CommandError`]s; only some of them are
//! reported to the client (see [`CommandError::reply`]).

use crate::protocol::{verb, Frame, Reply};
use crate::storage::Item;
use bytes::Bytes;
use std::str::FromStr;
use thiserror::Error;

/// The `noreply` modifier token
pub const NOREPLY: &str = "noreply";

/// Arguments shared by `set`, `add` and `replace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCommand {
    pub key: Bytes,
    pub flags: u16,
    /// Relative expiry in seconds, `<= 0` for never
    pub exptime: i64,
    pub data: Bytes,
    pub noreply: bool,
}

impl StorageCommand {
    /// Splits the command into the key and the item to store.
    pub fn into_item(self) -> (Bytes, Item) {
        let item = Item::new(self.data, self.flags, self.exptime);
        (self.key, item)
    }
}

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: Bytes },
    Set(StorageCommand),
    Add(StorageCommand),
    Replace(StorageCommand),
    Delete { key: Bytes, noreply: bool },
}

/// Why a frame could not become a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{0}' requires a key")]
    MissingKey(&'static str),

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    #[error("invalid flags: {0}")]
    InvalidFlags(String),

    #[error("invalid exptime: {0}")]
    InvalidExptime(String),

    #[error("invalid byte count: {0}")]
    InvalidByteCount(String),
}

impl CommandError {
    /// The reply the client gets for this error, if any.
    ///
    /// Unknown verbs and a key-less `get` answer `ERROR`; every other
    /// malformed command is dropped without a reply.
    pub fn reply(&self) -> Option<Reply> {
        match self {
            CommandError::UnknownCommand(_) | CommandError::MissingKey(_) => Some(Reply::Error),
            _ => None,
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let Frame {
            verb,
            args,
            payload,
        } = frame;

        match verb.as_str() {
            verb::GET => match args.into_iter().next() {
                Some(key) => Ok(Command::Get { key }),
                None => Err(CommandError::MissingKey(verb::GET)),
            },
            verb::SET => parse_storage(verb::SET, args, payload).map(Command::Set),
            verb::ADD => parse_storage(verb::ADD, args, payload).map(Command::Add),
            verb::REPLACE => parse_storage(verb::REPLACE, args, payload).map(Command::Replace),
            verb::DELETE => {
                let noreply = args.len() == 2 && args[1] == NOREPLY;
                match args.into_iter().next() {
                    Some(key) => Ok(Command::Delete { key, noreply }),
                    None => Err(CommandError::WrongArity(verb::DELETE)),
                }
            }
            _ => Err(CommandError::UnknownCommand(verb)),
        }
    }
}

/// `<key> <flags> <exptime> <bytes> [noreply]`
fn parse_storage(
    name: &'static str,
    args: Vec<Bytes>,
    payload: Option<Bytes>,
) -> Result<StorageCommand, CommandError> {
    if args.len() < 4 {
        return Err(CommandError::WrongArity(name));
    }

    // Digits only: `+5` is not a valid flags field
    let flags = Some(&args[1])
        .filter(|arg| arg.iter().all(u8::is_ascii_digit))
        .and_then(|arg| parse_number::<u16>(arg))
        .ok_or_else(|| CommandError::InvalidFlags(lossy(&args[1])))?;
    let exptime = parse_number::<i64>(&args[2])
        .ok_or_else(|| CommandError::InvalidExptime(lossy(&args[2])))?;
    // The framer attaches a payload exactly when the byte count parses
    let data = payload.ok_or_else(|| CommandError::InvalidByteCount(lossy(&args[3])))?;
    let noreply = args.len() == 5 && args[4] == NOREPLY;

    let key = args.into_iter().next().unwrap_or_default();
    Ok(StorageCommand {
        key,
        flags,
        exptime,
        data,
        noreply,
    })
}

fn parse_number<T: FromStr>(arg: &[u8]) -> Option<T> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

fn lossy(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).into_owned()
}
