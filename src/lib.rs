//! docserve - a small HTTP/1.x file server
//!
//! Serves files and directory listings under a document root and accepts
//! multipart uploads into it, over plain TCP or TLS.

pub mod config;
pub mod http;
pub mod server;
