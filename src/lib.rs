//! weft - HTTP server library with an HTTP/2 connection engine
//!
//! This crate provides an embeddable HTTP server core together with an
//! HTTP/2 extension: frame codec, HPACK header compression, stream
//! multiplexing, flow control, and dispatch into a user-supplied request
//! handler.

pub mod http;
