//! HTTP/2 server engine
//!
//! Runs the full lifecycle of an HTTP/2 connection once ALPN has selected
//! "h2": connection preface, SETTINGS handshake, frame dispatch with
//! multiplexed streams and flow control, HPACK header compression, and
//! dispatch of each completed request stream into the host server's handler.
//!
//! # Embedding
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft::http::h2::{enable_http2, ServerConfig};
//! use weft::http::{Server, Status};
//!
//! let mut server = Server::new(Arc::new(|ctx| {
//!     ctx.response_mut().set_status(Status::OK);
//!     ctx.response_mut().set_body(&b"ok"[..]);
//! }));
//!
//! enable_http2(&mut server, ServerConfig::default());
//! // The TLS acceptor hands "h2" connections to server.serve_proto("h2", conn)
//! ```

pub mod bridge;
pub mod codec;
pub mod connection;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod metrics;
pub mod settings;
pub mod stream;

pub use codec::FrameCodec;
pub use connection::H2Connection;
pub use error::{Error, ErrorCode, Result};
pub use frames::{Frame, FrameFlags, FrameType};
pub use metrics::{Metrics, MetricsSnapshot};
pub use settings::Settings;
pub use stream::{Stream, StreamId, StreamRegistry, StreamState};

use crate::http::server::Server;
use crate::http::session::{FdSessionOps, SessionOps};
use std::sync::Arc;
use std::time::Duration;

/// HTTP/2 connection preface sent by clients (RFC 7540 Section 3.5)
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Default initial window size (65535 bytes)
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65_535;

/// Default maximum frame size (16384 bytes)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// Default header table size (4096 bytes)
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;

/// HTTP/2 server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address the embedding binds, advisory for the engine
    pub addr: String,
    /// Socket read timeout
    pub read_timeout: Duration,
    /// Socket write timeout
    pub write_timeout: Duration,
    /// Verbose per-frame logging
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: ":443".to_string(),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            debug: false,
        }
    }
}

/// The HTTP/2 engine bound to a host server
pub struct H2Server {
    handler: crate::http::server::Handler,
    config: ServerConfig,
    metrics: Arc<Metrics>,
}

impl H2Server {
    /// Create an engine instance for the given handler
    pub fn new(handler: crate::http::server::Handler, config: ServerConfig) -> Self {
        H2Server {
            handler,
            config,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Engine counters
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the full HTTP/2 lifecycle on one connection
    pub fn handle_connection<S: SessionOps>(&self, session: S) -> Result<()> {
        let mut conn = H2Connection::new(
            session,
            Arc::clone(&self.handler),
            &self.config,
            Arc::clone(&self.metrics),
        );
        conn.serve()
    }
}

/// Register the HTTP/2 engine as the ALPN "h2" handler of `server`
pub fn enable_http2(server: &mut Server, config: ServerConfig) {
    let engine = Arc::new(H2Server::new(server.handler(), config));
    server.next_proto(
        "h2",
        Arc::new(move |conn| {
            let session = FdSessionOps::new(conn);
            if let Err(e) = engine.handle_connection(session) {
                tracing::debug!(error = %e, "h2 connection ended with error");
            }
            Ok(())
        }),
    );
}
