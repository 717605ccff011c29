//! Newline-delimited framing over async byte streams
//!
//! `BufReader::read_line()` allocates until it finds a newline, so a peer
//! that never sends one can exhaust memory. [`FrameReader`] reads through
//! `fill_buf()` with a byte limit and drains oversized lines instead.
//!
//! All partial state lives in the reader itself and is only mutated between
//! await points, so [`FrameReader::next_frame`] is cancel-safe: it can sit in
//! `tokio::select!` or under `tokio::time::timeout` without losing bytes.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::message::Message;
use crate::types::McpResult;

/// Default maximum frame size (10 MiB)
pub const MAX_MESSAGE_BYTES: usize = 10 * 1024 * 1024;

/// Longest line terminator (`\r\n`), not counted against the limit
const TERMINATOR_BYTES: usize = 2;

/// One unit read from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line without its terminator
    Line(String),
    /// A line above the limit was drained and discarded; carries its raw size
    Oversized(usize),
    /// A complete line that is not valid UTF-8
    Invalid(String),
    /// The peer closed the stream
    Eof,
}

/// Bounded line reader
pub struct FrameReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
    discarded: usize,
    draining: bool,
    max_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_bytes: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            pending: Vec::new(),
            discarded: 0,
            draining: false,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Read the next frame.
    ///
    /// The limit applies to the payload; a trailing `\n` or `\r\n` is not
    /// counted. A trailing partial line at EOF is dropped.
    pub async fn next_frame(&mut self) -> io::Result<Frame> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                self.pending.clear();
                self.discarded = 0;
                self.draining = false;
                return Ok(Frame::Eof);
            }

            let (end, found_newline) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            };

            let raw_limit = self.max_bytes.saturating_add(TERMINATOR_BYTES);
            if !self.draining && self.pending.len() + end > raw_limit {
                // Switch to draining: everything up to the next newline is dropped
                self.discarded = self.pending.len();
                self.pending.clear();
                self.draining = true;
            }

            if self.draining {
                self.discarded += end;
                self.inner.consume(end);
                if found_newline {
                    self.draining = false;
                    let size = std::mem::take(&mut self.discarded);
                    return Ok(Frame::Oversized(size));
                }
                continue;
            }

            self.pending.extend_from_slice(&available[..end]);
            self.inner.consume(end);

            if found_newline {
                let mut raw = std::mem::take(&mut self.pending);
                let size = raw.len();
                raw.pop();
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                if raw.len() > self.max_bytes {
                    return Ok(Frame::Oversized(size));
                }
                return Ok(match String::from_utf8(raw) {
                    Ok(line) => Frame::Line(line),
                    Err(e) => Frame::Invalid(format!("Invalid UTF-8 in message: {}", e.utf8_error())),
                });
            }
        }
    }
}

/// Write one message as a line and flush
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) -> McpResult<()> {
    let line = message.encode()?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
