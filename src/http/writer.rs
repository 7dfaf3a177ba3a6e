use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::response::{Response, StatusCode};
use crate::http::transport::Transport;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Value of the `Server` header sent with every response.
pub const SERVER_NAME: &str = "docserve";

fn status_line(buf: &mut Vec<u8>, status: StatusCode) {
    let line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(line.as_bytes());
    header_line(buf, "Server", SERVER_NAME);
}

fn header_line(buf: &mut Vec<u8>, name: &str, value: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.extend_from_slice(b"\r\n");
}

pub fn connection_value(keep_alive: bool) -> &'static str {
    if keep_alive { "keep-alive" } else { "close" }
}

/// Serializes a complete response, adding the `Server` and `Connection` headers.
pub fn serialize_response(resp: &Response, keep_alive: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    status_line(&mut buf, resp.status);
    for (k, v) in &resp.headers {
        header_line(&mut buf, k, v);
    }
    header_line(&mut buf, "Connection", connection_value(keep_alive));

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(&resp.body);
    buf
}

/// Composes a status line and header block, then streams body chunks.
///
/// The head is collected in memory and goes out in one write when
/// [`send_blank_line`](Self::send_blank_line) is called. Chunks are written
/// as-is; retrying partial writes is the transport's job.
pub struct ResponseWriter<'a, S> {
    transport: &'a mut Transport<S>,
    head: Vec<u8>,
    body_bytes: u64,
}

impl<'a, S> ResponseWriter<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(transport: &'a mut Transport<S>) -> Self {
        Self {
            transport,
            head: Vec::with_capacity(256),
            body_bytes: 0,
        }
    }

    pub fn send_status(&mut self, status: StatusCode) {
        self.head.clear();
        status_line(&mut self.head, status);
    }

    pub fn send_header(&mut self, name: &str, value: &str) {
        header_line(&mut self.head, name, value);
    }

    pub async fn send_blank_line(&mut self) -> std::io::Result<()> {
        self.head.extend_from_slice(b"\r\n");
        self.transport.write_all(&self.head).await?;
        self.head.clear();
        Ok(())
    }

    pub async fn send_chunk(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.transport.write_all(bytes).await?;
        self.body_bytes += bytes.len() as u64;
        Ok(())
    }

    /// Writes a fully buffered response in one go.
    pub async fn send_response(&mut self, resp: &Response, keep_alive: bool) -> std::io::Result<()> {
        let bytes = serialize_response(resp, keep_alive);
        self.transport.write_all(&bytes).await?;
        self.body_bytes += resp.body.len() as u64;
        Ok(())
    }

    /// Body bytes written so far.
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    /// Flushes the transport and returns the number of body bytes sent.
    pub async fn finish(self) -> std::io::Result<u64> {
        self.transport.flush().await?;
        Ok(self.body_bytes)
    }
}

/// What a responder sent, for logging and keep-alive decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body_bytes: u64,
    /// The response was length-delimited and the connection may take another request
    pub reusable: bool,
}

/// Sends the HTML error page for `status`.
pub async fn send_error<S>(
    transport: &mut Transport<S>,
    status: StatusCode,
    keep_alive: bool,
) -> std::io::Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let resp = Response::html_page(status);
    let mut writer = ResponseWriter::new(transport);
    writer.send_response(&resp, keep_alive).await?;
    let body_bytes = writer.finish().await?;
    Ok(Reply {
        status,
        body_bytes,
        reusable: keep_alive,
    })
}
