//! Request/response bridge
//!
//! Turns a completed request stream into the `RequestContext` the user
//! handler consumes, then serializes the handler's response back into
//! HEADERS/CONTINUATION and flow-controlled DATA frames.

use super::connection::H2Connection;
use super::error::{ErrorCode, Result};
use super::frames::{FrameFlags, FrameType};
use super::stream::{StreamId, StreamState};
use super::codec::FrameCodec;
use crate::http::hpack::HeaderField;
use crate::http::message::{Method, RequestContext, Response};
use crate::http::session::SessionOps;
use crate::http::Headers;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Response headers that are connection-specific in HTTP/1 and forbidden on
/// the HTTP/2 wire (RFC 7540 Section 8.1.2.2)
const CONNECTION_HEADERS: [&str; 5] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
];

impl<S: SessionOps> H2Connection<S> {
    /// Dispatch a stream that reached HalfClosedRemote into the handler and
    /// write its response
    pub(super) fn process_stream(&mut self, id: StreamId) -> Result<()> {
        let (fields, body) = match self.streams.get_mut(id) {
            Some(stream) => (stream.take_headers(), stream.take_body()),
            None => return Ok(()),
        };

        let mut ctx = match build_request(fields, body, id) {
            Ok(ctx) => ctx,
            Err(reason) => {
                return self.stream_error(id, ErrorCode::ProtocolError, &reason);
            }
        };

        debug!(stream_id = id, method = %ctx.method(), path = ctx.path(), "dispatching request");

        // The handler runs exactly once; a panic costs the stream, never the
        // connection.
        let handler = Arc::clone(&self.handler);
        if catch_unwind(AssertUnwindSafe(|| handler(&mut ctx))).is_err() {
            return self.stream_error(id, ErrorCode::InternalError, "handler panicked");
        }

        // The response parks on the stream until it is on the wire
        match self.streams.get_mut(id) {
            Some(stream) => stream.set_response(ctx.take_response()),
            None => return Ok(()),
        }
        let completed = self.write_response(id)?;

        if let Some(mut stream) = self.streams.remove(id) {
            stream.set_state(StreamState::Closed);
            self.metrics.stream_closed();
        }
        if completed {
            self.last_processed_stream = self.last_processed_stream.max(id);
        }
        Ok(())
    }

    /// Serialize the response parked on a stream
    ///
    /// Returns false when the stream was reset while the body was blocked on
    /// flow control; the remaining output is discarded.
    fn write_response(&mut self, id: StreamId) -> Result<bool> {
        let response = match self.streams.get_mut(id).and_then(|s| s.take_response()) {
            Some(response) => response,
            None => return Ok(false),
        };
        let block = self.encode_response_headers(&response);
        let body = response.body();
        let max_frame = self.remote_settings.max_frame_size as usize;

        // HEADERS plus CONTINUATION fragments sized to the peer's MaxFrameSize
        let fragments: Vec<&[u8]> = block.chunks(max_frame).collect();
        let last = fragments.len() - 1;
        for (i, fragment) in fragments.iter().enumerate() {
            let mut flags = FrameFlags::empty();
            if i == last {
                flags.set(FrameFlags::END_HEADERS);
            }
            if i == 0 && body.is_empty() {
                flags.set(FrameFlags::END_STREAM);
            }
            let frame_type = if i == 0 {
                FrameType::Headers
            } else {
                FrameType::Continuation
            };
            self.write_raw(frame_type, flags, id, fragment)?;
        }

        if body.is_empty() {
            return Ok(true);
        }
        self.write_body(id, body)
    }

    /// Build the response header block: `:status` first, names lowercased
    fn encode_response_headers(&mut self, response: &Response) -> Vec<u8> {
        let mut block = Vec::new();
        let status = response.status().code().to_string();
        self.encoder.encode(":status", &status, &mut block);

        for (name, value) in response.headers().iter() {
            let lower = name.to_ascii_lowercase();
            if CONNECTION_HEADERS.contains(&lower.as_str()) {
                continue;
            }
            self.encoder.encode(&lower, value, &mut block);
        }
        block
    }

    /// Emit the body as DATA frames bounded by the connection window, the
    /// stream window, and the peer's MaxFrameSize
    fn write_body(&mut self, id: StreamId, body: &[u8]) -> Result<bool> {
        let max_frame = self.remote_settings.max_frame_size as usize;
        let mut offset = 0;

        while offset < body.len() {
            let conn_avail = self.send_window.size().max(0) as usize;
            let stream_avail = match self.streams.get(id) {
                // Reset while sending: discard the rest
                None => return Ok(false),
                Some(stream) => stream.send_window().size().max(0) as usize,
            };

            let window = conn_avail.min(stream_avail);
            if window == 0 {
                if !self.wait_for_window(id)? {
                    return Ok(false);
                }
                continue;
            }

            let chunk = window.min(max_frame).min(body.len() - offset);
            self.send_window.consume(chunk);
            if let Some(stream) = self.streams.get_mut(id) {
                stream.send_window_mut().consume(chunk);
            }

            let end = offset + chunk == body.len();
            let flags = if end {
                FrameFlags::from_u8(FrameFlags::END_STREAM)
            } else {
                FrameFlags::empty()
            };
            self.write_raw(FrameType::Data, flags, id, &body[offset..offset + chunk])?;
            offset += chunk;
        }

        Ok(true)
    }

    /// Pump incoming frames until the stream can send again
    ///
    /// Returns false when the stream disappeared (RST_STREAM) while waiting.
    /// Frames for other streams dispatch normally, so distinct streams may
    /// interleave at frame boundaries.
    fn wait_for_window(&mut self, id: StreamId) -> Result<bool> {
        loop {
            let frame =
                FrameCodec::read_frame(&mut self.session, self.local_settings.max_frame_size)?;
            self.dispatch(frame)?;

            let stream_avail = match self.streams.get(id) {
                None => return Ok(false),
                Some(stream) => stream.send_window().size(),
            };
            if self.send_window.size() > 0 && stream_avail > 0 {
                return Ok(true);
            }
        }
    }
}

/// Materialize a `RequestContext` from the decoded header list and body
///
/// Enforces the pseudo-header rules: all pseudo-headers precede regular
/// headers, none is duplicated, `:method` and a non-empty `:path` are
/// required, and `:scheme` defaults to https when absent.
fn build_request(
    fields: Vec<HeaderField>,
    body: Vec<u8>,
    stream_id: StreamId,
) -> std::result::Result<RequestContext, String> {
    let mut method = None;
    let mut path = None;
    let mut scheme = None;
    let mut authority = None;
    let mut headers = Headers::new();
    let mut pseudo_section = true;

    for field in &fields {
        if let Some(pseudo) = field.name.strip_prefix(':') {
            if !pseudo_section {
                return Err(format!(
                    "pseudo-header :{} after regular header",
                    pseudo
                ));
            }
            let slot = match pseudo {
                "method" => &mut method,
                "path" => &mut path,
                "scheme" => &mut scheme,
                "authority" => &mut authority,
                other => return Err(format!("unknown pseudo-header :{}", other)),
            };
            if slot.is_some() {
                return Err(format!("duplicated pseudo-header :{}", pseudo));
            }
            *slot = Some(field.value.clone());
        } else {
            pseudo_section = false;
            headers.insert(field.name.clone(), field.value.clone());
        }
    }

    let method = match method {
        Some(m) => Method::from_str(&m).map_err(|_| format!("invalid :method {}", m))?,
        None => return Err("missing :method".to_string()),
    };
    let path = match path {
        Some(p) if !p.is_empty() => p,
        Some(_) => return Err("empty :path".to_string()),
        None => return Err("missing :path".to_string()),
    };
    let scheme = scheme.unwrap_or_else(|| "https".to_string());
    let authority = authority.unwrap_or_default();

    // :authority doubles as the Host header when none was sent
    if !authority.is_empty() && !headers.contains("host") {
        headers.insert("host", authority.clone());
    }

    Ok(RequestContext::new(
        method, path, scheme, authority, headers, body, stream_id,
    ))
}
