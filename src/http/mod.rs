//! HTTP server core
//!
//! This module provides the request/response object graph the HTTP/2 engine
//! dispatches into, plus the transport abstraction it runs over.
//!
//! # Architecture
//!
//! The HTTP layer uses a session operations abstraction pattern that allows
//! seamless switching between plain TCP and TLS connections:
//!
//! - `SessionOps` trait defines operations (poll, read, write, close)
//! - `HttpSession` wraps a transport and owns the timeout policy
//! - All engine I/O code is transparent to the underlying transport
//!
//! The HTTP/2 engine itself lives under [`h2`]; the HPACK codec it uses is
//! under [`hpack`].

pub mod h2;
pub mod headers;
pub mod hpack;
pub mod message;
pub mod server;
pub mod session;

pub use headers::Headers;
pub use message::{Method, RequestContext, Response, Status};
pub use server::{Handler, Server};
pub use session::{FdSessionOps, HttpSession, SessionOps};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No handler registered for protocol: {0}")]
    UnknownProtocol(String),
}

/// Maximum number of headers per message
pub const MAX_HEADERS: usize = 64;
