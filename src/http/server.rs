//! Host server object
//!
//! The [`Server`] owns the user-supplied request handler and a registry of
//! ALPN protocol handlers. Protocol extensions (the HTTP/2 engine being the
//! one shipped here) register themselves under their ALPN identifier and are
//! handed each accepted connection once that protocol has been negotiated.

use super::message::RequestContext;
use super::{Error, Result};
use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::Arc;

/// User request handler, invoked exactly once per completed request
pub type Handler = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;

/// Connection handler for a negotiated ALPN protocol
pub type ProtoHandler = Arc<dyn Fn(TcpStream) -> Result<()> + Send + Sync>;

/// HTTP server host
pub struct Server {
    handler: Handler,
    protos: HashMap<String, ProtoHandler>,
}

impl Server {
    /// Create a new server with the given request handler
    pub fn new(handler: Handler) -> Self {
        Server {
            handler,
            protos: HashMap::new(),
        }
    }

    /// Get the request handler
    pub fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }

    /// Register a connection handler for an ALPN protocol identifier
    pub fn next_proto(&mut self, proto: impl Into<String>, handler: ProtoHandler) {
        self.protos.insert(proto.into(), handler);
    }

    /// Look up the connection handler for a negotiated protocol
    pub fn proto_handler(&self, proto: &str) -> Option<ProtoHandler> {
        self.protos.get(proto).cloned()
    }

    /// Hand a connection to the handler registered for `proto`
    ///
    /// The TLS layer calls this once ALPN has selected a protocol.
    pub fn serve_proto(&self, proto: &str, conn: TcpStream) -> Result<()> {
        let handler = self
            .proto_handler(proto)
            .ok_or_else(|| Error::UnknownProtocol(proto.to_string()))?;
        handler(conn)
    }
}
