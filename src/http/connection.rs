use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::files;
use crate::http::parser::{self, ParseError};
use crate::http::request::{Method, RequestHeaders};
use crate::http::resolver;
use crate::http::response::{Response, StatusCode};
use crate::http::transport::Transport;
use crate::http::upload::{self, UploadError};
use crate::http::writer::{Reply, ResponseWriter, send_error};

/// Read-only state shared by every connection.
#[derive(Debug, Clone)]
pub struct ServerContext {
    /// Directory every served or uploaded path lives under
    pub root: PathBuf,
}

impl ServerContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

pub struct Connection<S> {
    transport: Transport<S>,
    ctx: Arc<ServerContext>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(RequestHeaders),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, ctx: Arc<ServerContext>) -> Self {
        Self {
            transport: Transport::new(stream),
            ctx,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        Some(req) => ConnectionState::Processing(req),
                        None => ConnectionState::Closed,
                    };
                }

                ConnectionState::Processing(req) => {
                    let reply = self.handle_request(&req).await?;
                    tracing::info!(
                        method = %req.method_token,
                        url = %req.url,
                        status = reply.status.as_u16(),
                        bytes = reply.body_bytes,
                        "Request served"
                    );

                    if reply.reusable {
                        self.state = ConnectionState::Reading; // go back for next request
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        if let Err(e) = self.transport.shutdown().await {
            tracing::debug!(error = %e, "Shutdown after close failed");
        }
        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<Option<RequestHeaders>> {
        match parser::read_request(&mut self.transport).await {
            Ok(req) => Ok(req),
            Err(ParseError::Io(e)) => Err(anyhow::Error::new(e).context("reading request head")),
            Err(e) => {
                // Malformed request → protocol error
                tracing::warn!(error = %e, "Rejecting malformed request");
                send_error(&mut self.transport, StatusCode::BadRequest, false).await?;
                Ok(None)
            }
        }
    }

    async fn handle_request(&mut self, req: &RequestHeaders) -> anyhow::Result<Reply> {
        if req.method == Method::UNSUPPORTED {
            tracing::debug!(method = %req.method_token, "Method not implemented");
            return Ok(send_error(&mut self.transport, StatusCode::NotImplemented, false).await?);
        }

        let decoded = match req.method {
            Method::POST => parser::decode_upload_path(&req.url),
            _ => parser::decode_path(&req.url),
        };
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "Bad request URI");
                return Ok(send_error(&mut self.transport, StatusCode::BadRequest, false).await?);
            }
        };

        if req.method == Method::POST {
            return self.receive_upload(req, &decoded).await;
        }

        // A GET body is never used, but it must leave the stream before the
        // next request head can be read.
        let mut keep_alive = req.keep_alive;
        if keep_alive && req.content_length > 0 {
            let dropped = self
                .transport
                .discard(req.content_length)
                .await
                .context("discarding GET body")?;
            tracing::debug!(bytes = dropped, "Discarded GET body");
            keep_alive &= dropped == req.content_length;
        }

        files::respond(
            &mut self.transport,
            &self.ctx.root,
            &req.url,
            &decoded,
            keep_alive,
        )
        .await
        .context("sending GET response")
    }

    async fn receive_upload(&mut self, req: &RequestHeaders, decoded: &str) -> anyhow::Result<Reply> {
        let destination = match resolver::resolve_target(&self.ctx.root, decoded) {
            Ok(destination) => destination,
            Err(e) => {
                tracing::warn!(path = decoded, error = %e, "Upload target rejected");
                return Ok(send_error(&mut self.transport, StatusCode::NotFound, false).await?);
            }
        };

        match upload::ingest(&mut self.transport, req, &destination).await {
            Ok(report) => {
                tracing::info!(
                    path = %destination.display(),
                    bytes_written = report.bytes_written,
                    completed = report.completed,
                    "Upload stored"
                );
                let reusable = req.keep_alive && report.bytes_consumed >= req.content_length;
                let mut writer = ResponseWriter::new(&mut self.transport);
                writer
                    .send_response(&Response::uploaded(report.bytes_written), reusable)
                    .await?;
                let body_bytes = writer.finish().await?;
                Ok(Reply {
                    status: StatusCode::Ok,
                    body_bytes,
                    reusable,
                })
            }
            Err(UploadError::Transport(e)) => {
                Err(anyhow::Error::new(e).context("reading upload body"))
            }
            Err(e) => {
                tracing::warn!(path = %destination.display(), error = %e, "Upload failed");
                Ok(send_error(&mut self.transport, StatusCode::InternalServerError, false).await?)
            }
        }
    }
}
