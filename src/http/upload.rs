//! POST: multipart upload ingestion.
//!
//! The body is read line by line and fed through [`UploadState`], which
//! tracks where in the multipart framing the stream is:
//!
//! ```text
//!   AwaitingStart ──start boundary──▶ InHeaders ──blank line──▶ InBody
//!                                                                 │
//!                                  start boundary: dropped, stays │
//!                                                                 ▼
//!   any phase ──────────────────────end boundary──────────────▶ Done
//! ```
//!
//! Once the first part's headers end, every line up to the end boundary is
//! stored except lines that are exactly the start boundary. A later part's
//! header block therefore lands in the file as is. Every read is capped at the
//! bytes still owed by `Content-Length`, so the ingestor never eats into a
//! following request on the same connection.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::request::RequestHeaders;
use crate::http::transport::{Line, MAX_LINE_LEN, Transport};

/// Consecutive empty reads tolerated before giving up on a client that
/// declared more body than it sends.
pub const MAX_IDLE_READS: u32 = 10;

#[derive(Debug)]
pub enum UploadError {
    /// `Content-Length` missing or zero
    MissingLength,
    /// No multipart boundary in `Content-Type`
    MissingBoundary,
    /// Destination could not be created
    Create(std::io::Error),
    /// Writing to the destination failed
    Write(std::io::Error),
    /// Reading the body failed
    Transport(std::io::Error),
    /// The body stopped arriving before it was complete
    Stalled { bytes_consumed: u64 },
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::MissingLength => f.write_str("missing or zero Content-Length"),
            UploadError::MissingBoundary => f.write_str("missing multipart boundary"),
            UploadError::Create(e) => write!(f, "cannot create destination: {e}"),
            UploadError::Write(e) => write!(f, "cannot write destination: {e}"),
            UploadError::Transport(e) => write!(f, "reading body failed: {e}"),
            UploadError::Stalled { bytes_consumed } => {
                write!(f, "body stalled after {bytes_consumed} bytes")
            }
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Create(e) | UploadError::Write(e) | UploadError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingStart,
    InHeaders,
    InBody,
    Done,
}

/// What to do with the line just fed to [`UploadState::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ignore,
    Write,
    Finish,
}

#[derive(Debug, Clone)]
pub struct UploadState {
    content_length: u64,
    bytes_consumed: u64,
    phase: Phase,
    start_marker: Vec<u8>,
    end_marker: Vec<u8>,
    /// The previous line hit the length cap, so this one is its tail
    continuation: bool,
}

impl UploadState {
    pub fn new(boundary: &str, content_length: u64) -> Self {
        let start_marker = format!("--{boundary}").into_bytes();
        let mut end_marker = start_marker.clone();
        end_marker.extend_from_slice(b"--");

        Self {
            content_length,
            bytes_consumed: 0,
            phase: Phase::AwaitingStart,
            start_marker,
            end_marker,
            continuation: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Body bytes still owed by the declared length.
    pub fn remaining(&self) -> u64 {
        self.content_length.saturating_sub(self.bytes_consumed)
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn advance(&mut self, line: &Line) -> Step {
        self.bytes_consumed += line.len() as u64;

        let continuation = self.continuation;
        self.continuation = line.is_truncated();

        if self.phase == Phase::InBody && continuation {
            return Step::Write;
        }
        if continuation {
            return Step::Ignore;
        }

        let content = line.content();
        if content == self.end_marker.as_slice() {
            self.phase = Phase::Done;
            return Step::Finish;
        }
        if content == self.start_marker.as_slice() {
            if self.phase == Phase::AwaitingStart {
                self.phase = Phase::InHeaders;
            }
            return Step::Ignore;
        }

        match self.phase {
            Phase::InHeaders if line.is_blank() => {
                self.phase = Phase::InBody;
                Step::Ignore
            }
            Phase::InHeaders => {
                tracing::debug!(
                    header = %String::from_utf8_lossy(content),
                    "Upload part header"
                );
                Step::Ignore
            }
            Phase::InBody => Step::Write,
            Phase::AwaitingStart | Phase::Done => Step::Ignore,
        }
    }
}

/// Outcome of a finished upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReport {
    pub bytes_consumed: u64,
    pub bytes_written: u64,
    /// The closing boundary was seen
    pub completed: bool,
}

/// Streams a multipart body into `destination`.
///
/// Preconditions are checked before the file is created, so a rejected
/// upload leaves nothing behind. After a failure mid-body the file holds
/// exactly the payload received so far.
pub async fn ingest<S>(
    transport: &mut Transport<S>,
    request: &RequestHeaders,
    destination: &Path,
) -> Result<UploadReport, UploadError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if request.content_length == 0 {
        return Err(UploadError::MissingLength);
    }
    let boundary = request
        .boundary
        .as_deref()
        .ok_or(UploadError::MissingBoundary)?;

    let mut file = File::create(destination)
        .await
        .map_err(UploadError::Create)?;
    tracing::debug!(
        path = %destination.display(),
        content_length = request.content_length,
        boundary,
        "Receiving upload"
    );

    let mut state = UploadState::new(boundary, request.content_length);
    let mut bytes_written = 0u64;
    let mut idle_reads = 0u32;

    while state.remaining() > 0 && !state.is_done() {
        let limit = state.remaining().min(MAX_LINE_LEN as u64) as usize;
        let line = transport
            .read_line(limit)
            .await
            .map_err(UploadError::Transport)?;

        if line.is_empty() {
            idle_reads += 1;
            if idle_reads >= MAX_IDLE_READS {
                file.flush().await.map_err(UploadError::Write)?;
                return Err(UploadError::Stalled {
                    bytes_consumed: state.bytes_consumed(),
                });
            }
            continue;
        }
        idle_reads = 0;

        match state.advance(&line) {
            Step::Write => {
                file.write_all(line.raw())
                    .await
                    .map_err(UploadError::Write)?;
                bytes_written += line.len() as u64;
            }
            Step::Finish => break,
            Step::Ignore => {}
        }
    }
    file.flush().await.map_err(UploadError::Write)?;

    let mut epilogue = 0;
    if state.is_done() && state.remaining() > 0 {
        epilogue = transport
            .discard(state.remaining())
            .await
            .map_err(UploadError::Transport)?;
        tracing::debug!(epilogue, "Discarded bytes after closing boundary");
    }
    if !state.is_done() {
        tracing::warn!(
            path = %destination.display(),
            bytes_consumed = state.bytes_consumed(),
            "Upload body ended without closing boundary"
        );
    }

    Ok(UploadReport {
        bytes_consumed: state.bytes_consumed() + epilogue,
        bytes_written,
        completed: state.is_done(),
    })
}
