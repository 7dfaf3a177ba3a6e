use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::{Connection, ServerContext};
use crate::server::tls;

/// Pause after a failed accept so a full fd table does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let acceptor = if cfg.server.tls.enabled {
        Some(tls::build_acceptor(&cfg.server.tls)?)
    } else {
        None
    };

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let scheme = if acceptor.is_some() { "https" } else { "http" };
    info!(
        "Listening on {}://{} (document root {})",
        scheme,
        listener.local_addr()?,
        cfg.static_files.root.display()
    );

    let ctx = Arc::new(ServerContext::new(cfg.static_files.root.clone()));
    serve(listener, ctx, acceptor).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    acceptor: Option<TlsAcceptor>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!("Accept failed: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer);

        let ctx = ctx.clone();
        let acceptor = acceptor.clone();
        let span = tracing::info_span!("conn", %peer);
        tokio::spawn(
            async move {
                if let Err(e) = handle(socket, ctx, acceptor).await {
                    tracing::error!("Connection error: {:#}", e);
                }
            }
            .instrument(span),
        );
    }
}

async fn handle(
    socket: TcpStream,
    ctx: Arc<ServerContext>,
    acceptor: Option<TlsAcceptor>,
) -> anyhow::Result<()> {
    match acceptor {
        Some(acceptor) => {
            let stream = match acceptor.accept(socket).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::debug!("TLS handshake failed: {}", e);
                    return Ok(());
                }
            };
            Connection::new(stream, ctx).run().await
        }
        None => Connection::new(socket, ctx).run().await,
    }
}
