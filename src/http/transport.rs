//! Buffered, line-oriented byte stream over one accepted connection.
//!
//! The transport is generic over the underlying stream so the same code runs
//! on a plain `TcpStream`, on a `tokio_rustls` server stream (after the
//! handshake has completed), or on an in-memory duplex pipe in tests.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on the length of a single line handed out by [`Transport::read_line`].
pub const MAX_LINE_LEN: usize = 1024;

const READ_CHUNK: usize = 4096;

/// One line read from the connection.
///
/// The raw bytes keep their terminator so callers that persist them (uploads)
/// reproduce the stream exactly. An empty line means the peer closed the
/// connection and nothing was buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    raw: Bytes,
    truncated: bool,
}

impl Line {
    pub(crate) fn new(raw: Bytes, truncated: bool) -> Self {
        Self { raw, truncated }
    }

    /// Bytes consumed from the stream, terminator included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The line hit the length cap before a terminator was seen.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_terminated(&self) -> bool {
        self.raw.last() == Some(&b'\n')
    }

    /// A bare `\n` or `\r\n`.
    pub fn is_blank(&self) -> bool {
        self.is_terminated() && self.content().is_empty()
    }

    /// The line with its `\r\n` or `\n` terminator stripped.
    pub fn content(&self) -> &[u8] {
        let mut end = self.raw.len();
        if self.is_terminated() {
            end -= 1;
            if end > 0 && self.raw[end - 1] == b'\r' {
                end -= 1;
            }
        }
        &self.raw[..end]
    }
}

pub struct Transport<S> {
    stream: S,
    buffer: BytesMut,
    eof: bool,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Reads the next line, returning at most `min(limit, MAX_LINE_LEN)` bytes.
    ///
    /// Longer lines come back truncated; the rest stays buffered and is
    /// returned by the next call. A `\r` is never split from its `\n`.
    pub async fn read_line(&mut self, limit: usize) -> std::io::Result<Line> {
        let limit = limit.min(MAX_LINE_LEN);
        if limit == 0 {
            return Ok(Line::new(Bytes::new(), false));
        }

        loop {
            let window = self.buffer.len().min(limit);
            if let Some(pos) = self.buffer[..window].iter().position(|&b| b == b'\n') {
                let raw = self.buffer.split_to(pos + 1).freeze();
                return Ok(Line::new(raw, false));
            }

            if self.buffer.len() >= limit {
                let mut cut = limit;
                if cut > 1 && self.buffer[cut - 1] == b'\r' {
                    cut -= 1;
                }
                let raw = self.buffer.split_to(cut).freeze();
                return Ok(Line::new(raw, true));
            }

            if self.eof || self.fill().await? == 0 {
                let raw = self.buffer.split().freeze();
                return Ok(Line::new(raw, false));
            }
        }
    }

    /// Drops up to `n` bytes from the stream. Returns how many were dropped.
    pub async fn discard(&mut self, n: u64) -> std::io::Result<u64> {
        let mut dropped = 0u64;
        while dropped < n {
            if self.buffer.is_empty() && (self.eof || self.fill().await? == 0) {
                break;
            }
            let take = (n - dropped).min(self.buffer.len() as u64) as usize;
            self.buffer.advance(take);
            dropped += take as u64;
        }
        Ok(dropped)
    }

    /// Writes every byte, retrying partial writes.
    pub async fn write_all(&mut self, mut data: &[u8]) -> std::io::Result<()> {
        while !data.is_empty() {
            let n = self.stream.write(data).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }
            data = &data[n..];
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush().await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    async fn fill(&mut self) -> std::io::Result<usize> {
        self.buffer.reserve(READ_CHUNK);
        let n = self.stream.read_buf(&mut self.buffer).await?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }
}
