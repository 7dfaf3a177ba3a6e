//! Listening sockets and optional TLS termination.

pub mod listener;
pub mod tls;
