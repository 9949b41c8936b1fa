//! Command Framer
//!
//! Reads memcached text commands off a buffered byte stream.
//!
//! ## How Framing Works
//!
//! 1. Read one line up to `\n` and trim surrounding whitespace, so both CRLF
//!    and bare LF terminators are accepted. Blank lines are skipped.
//! 2. Split on single spaces. The first token, lowercased, is the verb. The
//!    other tokens are kept as raw bytes, so keys are never re-encoded.
//! 3. For `set`/`add`/`replace` with a readable byte count (5th token), read
//!    exactly that many bytes, whatever they contain, then consume the line
//!    terminator that follows the data block.
//!
//! A storage line that is too short or whose byte count does not parse has
//! no payload attached. The command layer drops such a frame without reading
//! anything further, so the next line is still interpreted as a command.
//!
//! Any failure to read a whole line, data block or terminator ends the
//! connection; there is no recovery in the middle of a command. Lines longer
//! than the line limit and data blocks larger than the payload limit end it
//! too, so a client can never make the framer buffer without bound.

use crate::protocol::types::{verb, Frame};
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::trace;

/// Errors that end framing on a connection.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a command
    #[error("unexpected end of stream while reading {0}")]
    UnexpectedEof(&'static str),

    /// The announced data block exceeds the configured item size
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No line terminator within the line limit
    #[error("line too long (max: {max} bytes)")]
    LineTooLong { max: usize },
}

/// Default maximum data block size (1 MiB, as memcached)
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Default maximum length of a line, terminator included (64 KB)
pub const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// Reads [`Frame`]s from a buffered reader.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use flashcache::protocol::CommandFramer;
///
/// let mut framer = CommandFramer::new(&b"set k 0 0 2\r\nhi\r\nget k\r\n"[..]);
///
/// let set = framer.read_frame().await.unwrap().unwrap();
/// assert_eq!(set.verb, "set");
/// assert_eq!(set.payload.as_deref(), Some(&b"hi"[..]));
///
/// let get = framer.read_frame().await.unwrap().unwrap();
/// assert_eq!(get.args[0], "k");
/// # });
/// ```
#[derive(Debug)]
pub struct CommandFramer<R> {
    reader: R,
    max_payload: usize,
    max_line: usize,
    /// Total bytes consumed from the reader
    bytes_read: u64,
    /// Reused line buffer
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> CommandFramer<R> {
    /// Creates a framer with the default payload limit.
    pub fn new(reader: R) -> Self {
        Self::with_max_payload(reader, DEFAULT_MAX_PAYLOAD)
    }

    /// Creates a framer that rejects data blocks larger than `max_payload`.
    pub fn with_max_payload(reader: R, max_payload: usize) -> Self {
        Self {
            reader,
            max_payload,
            max_line: DEFAULT_MAX_LINE,
            bytes_read: 0,
            line: Vec::with_capacity(256),
        }
    }

    /// Sets the longest accepted line, terminator included.
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Returns the number of bytes consumed from the reader so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Reads the next command.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(frame))` - A complete command (and its data block, if any)
    /// - `Ok(None)` - The stream ended cleanly between commands
    /// - `Err(e)` - The connection can no longer be framed
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        loop {
            if !self.read_line("command line").await? {
                return Ok(None);
            }

            let line = self.line.trim_ascii();
            if line.is_empty() {
                trace!("Skipping blank line");
                continue;
            }

            let mut tokens = line.split(|&b| b == b' ');
            let verb = tokens
                .next()
                .map(|t| String::from_utf8_lossy(t).to_ascii_lowercase())
                .unwrap_or_default();
            let args: Vec<Bytes> = tokens.map(Bytes::copy_from_slice).collect();

            let payload = match payload_len(&verb, &args) {
                Some(len) => Some(self.read_payload(len).await?),
                None => None,
            };

            trace!(verb = %verb, args = args.len(), "Framed command");
            return Ok(Some(Frame {
                verb,
                args,
                payload,
            }));
        }
    }

    /// Reads through the next `\n` into the line buffer.
    ///
    /// Returns `Ok(false)` on a clean EOF before any byte of the line. At
    /// most `max_line + 1` bytes are buffered before giving up on the line.
    async fn read_line(&mut self, what: &'static str) -> Result<bool, FrameError> {
        self.line.clear();
        let limit = self.max_line as u64 + 1;
        let n = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.line)
            .await?;
        self.bytes_read += n as u64;

        if n == 0 {
            return Ok(false);
        }
        if self.line.len() > self.max_line {
            return Err(FrameError::LineTooLong { max: self.max_line });
        }
        if self.line.last() != Some(&b'\n') {
            return Err(FrameError::UnexpectedEof(what));
        }
        Ok(true)
    }

    async fn read_payload(&mut self, len: usize) -> Result<Bytes, FrameError> {
        if len > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.max_payload,
            });
        }

        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FrameError::UnexpectedEof("data block")
            } else {
                FrameError::Io(e)
            }
        })?;
        self.bytes_read += len as u64;

        if !self.read_line("data block terminator").await? {
            return Err(FrameError::UnexpectedEof("data block terminator"));
        }

        Ok(Bytes::from(data))
    }
}

/// Returns the data block length announced by a storage command line.
fn payload_len(verb: &str, args: &[Bytes]) -> Option<usize> {
    if !verb::is_storage(verb) {
        return None;
    }
    let count = std::str::from_utf8(args.get(3)?).ok()?;
    count.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    fn args(list: &[&str]) -> Vec<Bytes> {
        list.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
    }

    #[tokio::test]
    async fn test_frame_get() {
        let mut framer = CommandFramer::new(&b"get name\r\n"[..]);

        let frame = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.verb, "get");
        assert_eq!(frame.args, args(&["name"]));
        assert_eq!(frame.payload, None);

        assert!(framer.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_set_with_payload() {
        let mut framer = CommandFramer::new(&b"set name 5 0 4 noreply\r\nAriz\r\n"[..]);

        let frame = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.verb, "set");
        assert_eq!(frame.args, args(&["name", "5", "0", "4", "noreply"]));
        assert_eq!(frame.payload, Some(Bytes::from("Ariz")));
    }

    #[tokio::test]
    async fn test_verb_is_case_insensitive() {
        let mut framer = CommandFramer::new(&b"SeT k 0 0 1\r\nx\r\nDELETE k\r\n"[..]);

        assert_eq!(framer.read_frame().await.unwrap().unwrap().verb, "set");
        let delete = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(delete.verb, "delete");
        assert_eq!(delete.args, args(&["k"]));
    }

    #[tokio::test]
    async fn test_lf_only_terminators() {
        let mut framer = CommandFramer::new(&b"add k 1 0 3\nabc\nget k\n"[..]);

        let add = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(add.payload, Some(Bytes::from("abc")));
        assert_eq!(framer.read_frame().await.unwrap().unwrap().verb, "get");
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let mut framer = CommandFramer::new(&b"\r\n   \r\n\nget k\r\n"[..]);

        let frame = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.verb, "get");
    }

    #[tokio::test]
    async fn test_payload_is_binary_safe() {
        let mut framer = CommandFramer::new(&b"set k 0 0 6\r\na\r\nb\nc\r\nget k\r\n"[..]);

        let frame = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.payload, Some(Bytes::from_static(b"a\r\nb\nc")));
        assert_eq!(framer.read_frame().await.unwrap().unwrap().verb, "get");
    }

    #[tokio::test]
    async fn test_payload_split_across_reads() {
        let mock = Builder::new()
            .read(b"replace k 0 0 10\r\nhel")
            .read(b"lo wor")
            .read(b"ld\r")
            .read(b"\n")
            .build();
        let mut framer = CommandFramer::new(BufReader::new(mock));

        let frame = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.verb, "replace");
        assert_eq!(frame.payload, Some(Bytes::from("hello worl")));
    }

    #[tokio::test]
    async fn test_short_storage_line_has_no_payload() {
        let mut framer = CommandFramer::new(&b"set key\r\nget key\r\n"[..]);

        let set = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(set.args, args(&["key"]));
        assert_eq!(set.payload, None);

        // The next line is still a command, not data
        assert_eq!(framer.read_frame().await.unwrap().unwrap().verb, "get");
    }

    #[tokio::test]
    async fn test_unparseable_byte_count_has_no_payload() {
        let mut framer = CommandFramer::new(&b"set k 0 0 abc\r\nget k\r\n"[..]);

        assert_eq!(framer.read_frame().await.unwrap().unwrap().payload, None);
        assert_eq!(framer.read_frame().await.unwrap().unwrap().verb, "get");
    }

    #[tokio::test]
    async fn test_single_space_split_keeps_empty_tokens() {
        let mut framer = CommandFramer::new(&b"get  k\r\n"[..]);

        let frame = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.args, args(&["", "k"]));
    }

    #[tokio::test]
    async fn test_eof_inside_payload() {
        let mut framer = CommandFramer::new(&b"set k 0 0 10\r\nshort"[..]);

        let result = framer.read_frame().await;
        assert!(matches!(result, Err(FrameError::UnexpectedEof("data block"))));
    }

    #[tokio::test]
    async fn test_eof_before_terminator() {
        let mut framer = CommandFramer::new(&b"set k 0 0 3\r\nabc"[..]);

        let result = framer.read_frame().await;
        assert!(matches!(
            result,
            Err(FrameError::UnexpectedEof("data block terminator"))
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_command_line() {
        let mut framer = CommandFramer::new(&b"get k"[..]);

        let result = framer.read_frame().await;
        assert!(matches!(result, Err(FrameError::UnexpectedEof("command line"))));
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let mut framer = CommandFramer::with_max_payload(&b"set k 0 0 11\r\n"[..], 10);

        let result = framer.read_frame().await;
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 11, max: 10 })
        ));
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let mock = Builder::new()
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        let mut framer = CommandFramer::new(BufReader::new(mock));

        assert!(matches!(framer.read_frame().await, Err(FrameError::Io(_))));
    }

    #[tokio::test]
    async fn test_keys_keep_raw_bytes() {
        let mut framer =
            CommandFramer::new(&b"set \xff 0 0 1\r\na\r\nget \xfe\r\nget caf\xc3\xa9\r\n"[..]);

        let set = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(set.args[0], Bytes::from_static(b"\xff"));

        let get = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(get.args[0], Bytes::from_static(b"\xfe"));
        assert_ne!(set.args[0], get.args[0]);

        let get = framer.read_frame().await.unwrap().unwrap();
        assert_eq!(get.args[0], "caf\u{e9}");
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let mut input = b"get ".to_vec();
        input.extend(std::iter::repeat(b'a').take(1024));
        input.extend_from_slice(b"\r\n");
        let mut framer = CommandFramer::new(&input[..]).with_max_line(64);

        let result = framer.read_frame().await;
        assert!(matches!(result, Err(FrameError::LineTooLong { max: 64 })));
        // Gave up after the limit instead of buffering the whole line
        assert_eq!(framer.bytes_read(), 65);
    }

    #[tokio::test]
    async fn test_line_at_limit_is_accepted() {
        // The second line is exactly 10 bytes including CRLF
        let mut framer = CommandFramer::new(&b"get abc\r\nget abcd\r\n"[..]).with_max_line(10);

        assert_eq!(framer.read_frame().await.unwrap().unwrap().args, args(&["abc"]));
        assert_eq!(framer.read_frame().await.unwrap().unwrap().args, args(&["abcd"]));
        assert!(framer.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminator_line_is_bounded() {
        let mut input = b"set k 0 0 1\r\nx".to_vec();
        input.extend(std::iter::repeat(b'y').take(256));
        let mut framer = CommandFramer::new(&input[..]).with_max_line(32);

        let result = framer.read_frame().await;
        assert!(matches!(result, Err(FrameError::LineTooLong { max: 32 })));
    }

    #[tokio::test]
    async fn test_bytes_read_counts_lines_and_payloads() {
        let input = b"set k 0 0 3\r\nabc\r\n\r\nget k\r\n";
        let mut framer = CommandFramer::new(&input[..]);

        framer.read_frame().await.unwrap().unwrap();
        assert_eq!(framer.bytes_read(), 18);
        framer.read_frame().await.unwrap().unwrap();
        assert_eq!(framer.bytes_read(), input.len() as u64);
    }
}
