//! HTTP/1.x file serving.
//!
//! # Architecture
//!
//! - **`transport`**: Buffered, line-oriented reads and retrying writes over one socket
//! - **`parser`**: Request line and header parsing, URL decoding
//! - **`request`**: The parsed request head
//! - **`resolver`**: Sandboxes decoded paths under the document root
//! - **`files`**: GET responder (file streaming and directory listings)
//! - **`upload`**: POST ingestor (multipart boundary state machine)
//! - **`response`**: Status codes and fully buffered responses
//! - **`writer`**: Status line, header block and chunk output
//! - **`mime`**: Content type lookup by file extension
//! - **`connection`**: Per-connection request/response state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Parse request line and headers
//!        └──────┬──────┘
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← GET responder or POST ingestor streams the reply
//!        └──────┬───────────┘
//!               │ Reply sent
//!               ├─ keep-alive and length-delimited → Reading
//!               └─ otherwise → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docserve::http::connection::{Connection, ServerContext};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = Arc::new(ServerContext::new("./htdocs"));
//!     let listener = TcpListener::bind("127.0.0.1:12306").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let ctx = ctx.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, ctx);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod files;
pub mod mime;
pub mod parser;
pub mod request;
pub mod resolver;
pub mod response;
pub mod transport;
pub mod upload;
pub mod writer;
