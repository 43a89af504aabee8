//! HTTP/2 connection engine
//!
//! Drives one connection through its whole lifecycle: preface verification,
//! SETTINGS handshake, the serving dispatch loop, flow-control accounting at
//! the connection level, and the GOAWAY/RST_STREAM error split. One engine
//! instance runs per connection, serial over the socket; handlers run inline
//! with the reader, so frame writes are serialized structurally.

use super::codec::FrameCodec;
use super::error::{Error, ErrorCode, Result};
use super::flow_control::FlowWindow;
use super::frames::{Frame, FrameFlags, FrameType};
use super::metrics::Metrics;
use super::settings::Settings;
use super::stream::{StreamId, StreamRegistry, StreamState};
use super::{ServerConfig, CONNECTION_PREFACE, CONNECTION_STREAM_ID};
use crate::http::hpack::{Decoder, Encoder, HeaderField};
use crate::http::server::Handler;
use crate::http::session::{HttpSession, SessionOps};
use bytes::{BufMut, BytesMut};
use std::sync::Arc;
use tracing::{debug, trace};

/// Connection-level state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the 24-octet client preface
    AwaitPreface,
    /// Exchanging initial SETTINGS
    Handshaking,
    /// Main frame dispatch loop
    Serving,
    /// GOAWAY seen or sent; existing streams finish, new ones are refused
    Draining,
    /// Connection is done
    Closed,
}

/// One HTTP/2 server connection
pub struct H2Connection<S: SessionOps> {
    pub(super) session: HttpSession<S>,
    pub(super) state: ConnectionState,
    /// Our settings, advertised during the handshake
    pub(super) local_settings: Settings,
    /// The peer's settings, applied as SETTINGS frames arrive
    pub(super) remote_settings: Settings,
    pub(super) streams: StreamRegistry,
    /// Connection-level send window, debited by outgoing DATA
    pub(super) send_window: FlowWindow,
    /// Connection-level receive window, debited by incoming DATA
    pub(super) recv_window: FlowWindow,
    pub(super) encoder: Encoder,
    pub(super) decoder: Decoder,
    pub(super) handler: Handler,
    pub(super) metrics: Arc<Metrics>,
    pub(super) debug: bool,
    /// Stream whose header block is mid-flight; only CONTINUATION frames
    /// for this id are legal until END_HEADERS
    continuation: Option<StreamId>,
    /// Header block accumulating for a stream we refused or already closed.
    /// It still must be HPACK-decoded to keep the dynamic table in sync;
    /// the optional code is the RST_STREAM sent once the block ends.
    orphan: Option<(StreamId, Option<ErrorCode>)>,
    orphan_block: Vec<u8>,
    /// Set between sending our SETTINGS and receiving the peer's ACK
    settings_ack_pending: bool,
    goaway_sent: bool,
    /// (last_stream_id, error code) from a GOAWAY the peer sent
    peer_goaway: Option<(StreamId, u32)>,
    /// Last stream id fully processed, reported in GOAWAY
    pub(super) last_processed_stream: StreamId,
}

impl<S: SessionOps> H2Connection<S> {
    /// Create an engine instance over a fresh session
    pub fn new(
        session: S,
        handler: Handler,
        config: &ServerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let mut session = HttpSession::new(session);
        session.set_read_timeout(Some(config.read_timeout));
        session.set_write_timeout(Some(config.write_timeout));

        let local_settings = Settings::server_defaults();
        let remote_settings = Settings::protocol_defaults();

        H2Connection {
            session,
            state: ConnectionState::AwaitPreface,
            send_window: FlowWindow::new(remote_settings.initial_window_size),
            recv_window: FlowWindow::new(local_settings.initial_window_size),
            local_settings,
            remote_settings,
            streams: StreamRegistry::new(),
            encoder: Encoder::new(),
            decoder: Decoder::new(),
            handler,
            metrics,
            debug: config.debug,
            continuation: None,
            orphan: None,
            orphan_block: Vec::new(),
            settings_ack_pending: false,
            goaway_sent: false,
            peer_goaway: None,
            last_processed_stream: 0,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The (last_stream_id, error code) of a GOAWAY received from the peer
    pub fn peer_goaway(&self) -> Option<(StreamId, u32)> {
        self.peer_goaway
    }

    /// Run the connection to completion
    ///
    /// Fatal errors compose a GOAWAY before the socket closes; preface
    /// mismatches and I/O failures close without one.
    pub fn serve(&mut self) -> Result<()> {
        self.metrics.connection_opened();
        debug!("serving h2 connection");

        let result = self.run();

        if let Err(e) = &result {
            match e {
                Error::InvalidPreface
                | Error::ConnectionClosed
                | Error::IncompleteHeader
                | Error::IncompleteBody
                | Error::Io(_)
                | Error::Http(_) => {
                    debug!(error = %e, "closing h2 connection without GOAWAY");
                }
                Error::Timeout => {
                    let code = if self.settings_ack_pending {
                        ErrorCode::SettingsTimeout
                    } else {
                        ErrorCode::NoError
                    };
                    debug!(code = %code, "read timeout, closing h2 connection");
                    self.send_goaway(code);
                }
                other => {
                    debug!(error = %other, code = %other.error_code(), "h2 connection error");
                    self.send_goaway(other.error_code());
                }
            }
        }

        let _ = self.session.close();
        self.state = ConnectionState::Closed;
        self.metrics.connection_closed();
        debug!("h2 connection closed");
        result
    }

    fn run(&mut self) -> Result<()> {
        self.read_preface()?;
        self.handshake()?;
        self.state = ConnectionState::Serving;

        loop {
            let frame =
                FrameCodec::read_frame(&mut self.session, self.local_settings.max_frame_size)?;
            self.dispatch(frame)?;

            if self.state == ConnectionState::Draining && self.drained() {
                debug!("drain complete");
                return Ok(());
            }
        }
    }

    /// Read and verify the 24-octet connection preface
    fn read_preface(&mut self) -> Result<()> {
        let mut preface = [0u8; 24];
        let n = self.session.read_exact(&mut preface)?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        if n < preface.len() || preface != CONNECTION_PREFACE {
            return Err(Error::InvalidPreface);
        }
        self.state = ConnectionState::Handshaking;
        Ok(())
    }

    /// Send our SETTINGS, receive and apply the peer's, ACK it
    fn handshake(&mut self) -> Result<()> {
        let mut payload = BytesMut::new();
        self.local_settings.serialize_non_defaults(&mut payload);
        self.write_raw(FrameType::Settings, FrameFlags::empty(), 0, &payload)?;
        self.settings_ack_pending = true;

        let frame =
            FrameCodec::read_frame(&mut self.session, self.local_settings.max_frame_size)?;
        if frame.frame_type != FrameType::Settings || frame.flags.is_ack() {
            return Err(Error::Protocol(format!(
                "expected SETTINGS as first frame, got {}",
                frame.frame_type
            )));
        }
        if frame.stream_id != CONNECTION_STREAM_ID {
            return Err(Error::Protocol(
                "SETTINGS frame with non-zero stream id".to_string(),
            ));
        }

        self.apply_remote_settings(&frame.payload)?;
        frame.release();
        self.write_raw(
            FrameType::Settings,
            FrameFlags::from_u8(FrameFlags::ACK),
            0,
            &[],
        )?;
        Ok(())
    }

    /// Dispatch one incoming frame
    pub(super) fn dispatch(&mut self, frame: Frame) -> Result<()> {
        if self.debug {
            trace!(
                frame_type = frame.frame_type.name(),
                stream_id = frame.stream_id,
                flags = frame.flags.as_u8(),
                len = frame.payload_len(),
                "recv frame"
            );
        }

        // A header block in flight permits nothing but its own CONTINUATION
        if let Some(expected) = self.continuation {
            if frame.frame_type != FrameType::Continuation || frame.stream_id != expected {
                return Err(Error::Protocol(format!(
                    "{} for stream {} interleaved inside header block of stream {}",
                    frame.frame_type, frame.stream_id, expected
                )));
            }
        }

        match frame.frame_type {
            FrameType::Data => self.handle_data(frame),
            FrameType::Headers => self.handle_headers(frame),
            FrameType::Continuation => self.handle_continuation(frame),
            FrameType::Settings => self.handle_settings(frame),
            FrameType::Ping => self.handle_ping(frame),
            FrameType::Goaway => self.handle_goaway(frame),
            FrameType::WindowUpdate => self.handle_window_update(frame),
            FrameType::RstStream => self.handle_rst_stream(frame),
            FrameType::Priority => self.handle_priority(frame),
            FrameType::PushPromise => self.handle_push_promise(frame),
            FrameType::Unknown(_) => {
                // Extension frames are tolerated and ignored
                frame.release();
                Ok(())
            }
        }
    }

    fn handle_data(&mut self, frame: Frame) -> Result<()> {
        let id = frame.stream_id;
        if id == CONNECTION_STREAM_ID {
            return Err(Error::Protocol("DATA frame on stream 0".to_string()));
        }

        let len = frame.payload_len();
        if self.recv_window.debit(len) < 0 {
            return Err(Error::FlowControl(
                "connection receive window underflow".to_string(),
            ));
        }

        let end_stream = frame.flags.is_end_stream();

        enum Outcome {
            StreamGone,
            IdleStream,
            Accepted { replenish: Option<u32> },
        }

        let outcome = match self.streams.get_mut(id) {
            None => {
                if id <= self.streams.max_remote_id() {
                    Outcome::StreamGone
                } else {
                    Outcome::IdleStream
                }
            }
            Some(stream) => {
                if !stream.state().can_receive() {
                    Outcome::StreamGone
                } else if stream.recv_window_mut().debit(len) < 0 {
                    return Err(Error::FlowControl(format!(
                        "stream {} receive window underflow",
                        id
                    )));
                } else {
                    stream.append_body(&frame.payload);
                    if end_stream {
                        stream.set_state(StreamState::HalfClosedRemote);
                    }
                    let replenish = if end_stream {
                        None
                    } else {
                        stream.recv_window_mut().replenish()
                    };
                    Outcome::Accepted { replenish }
                }
            }
        };

        frame.release();

        // Replenish the connection window for consumed octets regardless of
        // what happened to the stream; the data was still received.
        if let Some(increment) = self.recv_window.replenish() {
            self.send_window_update(CONNECTION_STREAM_ID, increment)?;
        }

        match outcome {
            Outcome::StreamGone => {
                self.stream_error(id, ErrorCode::StreamClosed, "DATA on closed stream")
            }
            Outcome::IdleStream => Err(Error::Protocol(format!("DATA on idle stream {}", id))),
            Outcome::Accepted { replenish } => {
                if let Some(increment) = replenish {
                    self.send_window_update(id, increment)?;
                }
                if end_stream {
                    self.process_stream(id)?;
                }
                Ok(())
            }
        }
    }

    fn handle_headers(&mut self, frame: Frame) -> Result<()> {
        let id = frame.stream_id;
        if id == CONNECTION_STREAM_ID {
            return Err(Error::Protocol("HEADERS frame on stream 0".to_string()));
        }

        let end_headers = frame.flags.is_end_headers();
        let end_stream = frame.flags.is_end_stream();
        let (fragment_range, weight) = parse_headers_payload(&frame)?;
        let fragment = &frame.payload[fragment_range];

        // Trailers for an existing stream, or a brand-new stream
        if self.streams.contains(id) {
            let stream = self.streams.get_mut(id).expect("stream present");
            stream.append_header_fragment(fragment);
            if end_stream {
                stream.set_end_stream_pending(true);
            }
            if let Some(weight) = weight {
                stream.set_priority(weight);
            }
        } else if id <= self.streams.max_remote_id() {
            // Closed stream: the block still feeds the HPACK decoder
            self.begin_orphan_block(id, fragment, Some(ErrorCode::StreamClosed));
        } else if self.state == ConnectionState::Draining {
            self.begin_orphan_block(id, fragment, Some(ErrorCode::RefusedStream));
        } else if self.at_stream_capacity() {
            self.begin_orphan_block(id, fragment, Some(ErrorCode::RefusedStream));
        } else {
            let send_window = self.remote_settings.initial_window_size;
            let recv_window = self.local_settings.initial_window_size;
            let stream = self.streams.open_remote(id, send_window, recv_window)?;
            stream.append_header_fragment(fragment);
            if end_stream {
                stream.set_end_stream_pending(true);
            }
            if let Some(weight) = weight {
                stream.set_priority(weight);
            }
            self.metrics.stream_opened();
        }

        frame.release();

        if end_headers {
            self.finish_header_block(id)?;
        } else {
            self.continuation = Some(id);
        }
        Ok(())
    }

    fn handle_continuation(&mut self, frame: Frame) -> Result<()> {
        // dispatch() already verified this CONTINUATION was expected
        let id = frame.stream_id;
        if self.continuation != Some(id) {
            return Err(Error::Protocol(format!(
                "unexpected CONTINUATION for stream {}",
                id
            )));
        }

        match &self.orphan {
            Some((orphan_id, _)) if *orphan_id == id => {
                self.orphan_block.extend_from_slice(&frame.payload);
            }
            _ => {
                let stream = self
                    .streams
                    .get_mut(id)
                    .ok_or_else(|| Error::Protocol(format!("CONTINUATION for lost stream {}", id)))?;
                stream.append_header_fragment(&frame.payload);
            }
        }

        let end_headers = frame.flags.is_end_headers();
        frame.release();

        if end_headers {
            self.continuation = None;
            self.finish_header_block(id)?;
        }
        Ok(())
    }

    /// Start accumulating a header block for a stream that will not be served
    fn begin_orphan_block(&mut self, id: StreamId, fragment: &[u8], code: Option<ErrorCode>) {
        self.orphan = Some((id, code));
        self.orphan_block.clear();
        self.orphan_block.extend_from_slice(fragment);
    }

    /// Decode a completed header block and move the stream forward
    fn finish_header_block(&mut self, id: StreamId) -> Result<()> {
        self.continuation = None;

        if let Some((orphan_id, code)) = self.orphan.take() {
            if orphan_id == id {
                // Decode into a discard sink purely for dynamic-table sync
                let block = std::mem::take(&mut self.orphan_block);
                let mut sink = Vec::new();
                match self.decoder.decode(&block, &mut sink) {
                    Ok(()) => {
                        if let Some(code) = code {
                            self.send_rst_stream(id, code)?;
                        }
                    }
                    // A malformed name costs this stream either way; real
                    // compression damage still takes the connection down.
                    Err(e) => match Error::from(e) {
                        Error::Protocol(_) => {
                            self.send_rst_stream(id, ErrorCode::ProtocolError)?;
                        }
                        other => return Err(other),
                    },
                }
                return Ok(());
            }
            self.orphan = Some((orphan_id, code));
        }

        let stream = match self.streams.get_mut(id) {
            Some(stream) => stream,
            None => return Ok(()),
        };
        let block = stream.take_header_block();
        let end_stream = stream.end_stream_pending();

        let mut fields: Vec<HeaderField> = Vec::new();
        match self.decoder.decode(&block, &mut fields) {
            Ok(()) => {}
            Err(e) => {
                let err: Error = e.into();
                return match err {
                    // Malformed field names kill the stream, not the table
                    Error::Protocol(msg) => {
                        self.stream_error(id, ErrorCode::ProtocolError, &msg)
                    }
                    other => Err(other),
                };
            }
        }

        let stream = self.streams.get_mut(id).expect("stream present");
        stream.set_headers(fields);

        if end_stream {
            stream.set_state(StreamState::HalfClosedRemote);
            self.process_stream(id)?;
        } else if stream.state() == StreamState::Idle {
            stream.set_state(StreamState::Open);
        }
        Ok(())
    }

    fn handle_settings(&mut self, frame: Frame) -> Result<()> {
        if frame.stream_id != CONNECTION_STREAM_ID {
            return Err(Error::Protocol(
                "SETTINGS frame with non-zero stream id".to_string(),
            ));
        }

        if frame.flags.is_ack() {
            if frame.payload_len() != 0 {
                return Err(Error::FrameSize(
                    "SETTINGS ACK with non-empty payload".to_string(),
                ));
            }
            self.settings_ack_pending = false;
            frame.release();
            return Ok(());
        }

        self.apply_remote_settings(&frame.payload)?;
        frame.release();
        self.write_raw(
            FrameType::Settings,
            FrameFlags::from_u8(FrameFlags::ACK),
            0,
            &[],
        )
    }

    /// Apply a peer SETTINGS payload, adjusting dependent state
    fn apply_remote_settings(&mut self, payload: &[u8]) -> Result<()> {
        let old_initial = self.remote_settings.initial_window_size;
        self.remote_settings.apply(payload)?;

        // InitialWindowSize change shifts every existing stream send window
        let new_initial = self.remote_settings.initial_window_size;
        if new_initial != old_initial {
            for id in self.streams.ids() {
                if let Some(stream) = self.streams.get_mut(id) {
                    stream.send_window_mut().update_initial(new_initial)?;
                }
            }
        }

        self.encoder
            .set_max_table_size(self.remote_settings.header_table_size as usize);
        Ok(())
    }

    fn handle_ping(&mut self, frame: Frame) -> Result<()> {
        if frame.stream_id != CONNECTION_STREAM_ID {
            return Err(Error::Protocol("PING frame with non-zero stream id".to_string()));
        }
        if frame.payload_len() != 8 {
            return Err(Error::FrameSize(format!(
                "PING payload must be 8 octets, got {}",
                frame.payload_len()
            )));
        }

        if !frame.flags.is_ack() {
            self.write_raw(
                FrameType::Ping,
                FrameFlags::from_u8(FrameFlags::ACK),
                0,
                &frame.payload,
            )?;
        }
        frame.release();
        Ok(())
    }

    fn handle_goaway(&mut self, frame: Frame) -> Result<()> {
        if frame.payload_len() < 8 {
            return Err(Error::FrameSize("GOAWAY payload too short".to_string()));
        }
        let last_stream_id =
            u32::from_be_bytes([frame.payload[0], frame.payload[1], frame.payload[2], frame.payload[3]])
                & 0x7FFF_FFFF;
        let code = u32::from_be_bytes([
            frame.payload[4],
            frame.payload[5],
            frame.payload[6],
            frame.payload[7],
        ]);
        debug!(
            last_stream_id,
            code = %ErrorCode::from_u32(code).map(|c| c.name()).unwrap_or("?"),
            "peer sent GOAWAY, draining"
        );
        frame.release();

        self.peer_goaway = Some((last_stream_id, code));
        self.state = ConnectionState::Draining;
        Ok(())
    }

    fn handle_window_update(&mut self, frame: Frame) -> Result<()> {
        let id = frame.stream_id;
        if frame.payload_len() != 4 {
            return Err(Error::FrameSize(
                "WINDOW_UPDATE payload must be 4 octets".to_string(),
            ));
        }
        let increment = u32::from_be_bytes([
            frame.payload[0],
            frame.payload[1],
            frame.payload[2],
            frame.payload[3],
        ]) & 0x7FFF_FFFF;
        frame.release();

        if increment == 0 {
            if id == CONNECTION_STREAM_ID {
                return Err(Error::Protocol(
                    "WINDOW_UPDATE with zero increment".to_string(),
                ));
            }
            return self.stream_error(id, ErrorCode::ProtocolError, "zero window increment");
        }

        if id == CONNECTION_STREAM_ID {
            self.send_window.increase(increment)?;
            return Ok(());
        }

        // Trailing updates for already-closed streams are silently dropped
        let overflow = match self.streams.get_mut(id) {
            None => return Ok(()),
            Some(stream) => stream.send_window_mut().increase(increment).is_err(),
        };
        if overflow {
            return self.stream_error(id, ErrorCode::FlowControlError, "send window overflow");
        }
        Ok(())
    }

    fn handle_rst_stream(&mut self, frame: Frame) -> Result<()> {
        let id = frame.stream_id;
        if id == CONNECTION_STREAM_ID {
            return Err(Error::Protocol("RST_STREAM on stream 0".to_string()));
        }
        if frame.payload_len() != 4 {
            return Err(Error::FrameSize(
                "RST_STREAM payload must be 4 octets".to_string(),
            ));
        }
        let code = u32::from_be_bytes([
            frame.payload[0],
            frame.payload[1],
            frame.payload[2],
            frame.payload[3],
        ]);
        frame.release();

        if let Some(mut stream) = self.streams.remove(id) {
            debug!(
                stream_id = id,
                code = %ErrorCode::from_u32(code).map(|c| c.name()).unwrap_or("?"),
                "stream reset by peer"
            );
            stream.set_state(StreamState::Closed);
            self.metrics.stream_closed();
        }
        Ok(())
    }

    fn handle_priority(&mut self, frame: Frame) -> Result<()> {
        let id = frame.stream_id;
        if id == CONNECTION_STREAM_ID {
            return Err(Error::Protocol("PRIORITY frame on stream 0".to_string()));
        }
        if frame.payload_len() != 5 {
            let len = frame.payload_len();
            frame.release();
            return self.stream_error(
                id,
                ErrorCode::FrameSizeError,
                &format!("PRIORITY payload must be 5 octets, got {}", len),
            );
        }

        // Single-byte weight proxy: the first payload octet
        let weight = frame.payload[0];
        frame.release();
        if let Some(stream) = self.streams.get_mut(id) {
            stream.set_priority(weight);
        }
        Ok(())
    }

    fn handle_push_promise(&mut self, frame: Frame) -> Result<()> {
        if !self.local_settings.enable_push {
            return Err(Error::Protocol(
                "PUSH_PROMISE while push is disabled".to_string(),
            ));
        }
        if frame.payload_len() < 4 {
            return Err(Error::FrameSize("PUSH_PROMISE payload too short".to_string()));
        }

        let promised = u32::from_be_bytes([
            frame.payload[0],
            frame.payload[1],
            frame.payload[2],
            frame.payload[3],
        ]) & 0x7FFF_FFFF;
        debug!(promised_stream_id = promised, "registering promised stream");

        self.streams.reserve_remote(
            promised,
            self.remote_settings.initial_window_size,
            self.local_settings.initial_window_size,
        );

        // The header fragment still feeds the HPACK decoder for table sync;
        // no RST follows, the reservation simply sits unused.
        let id = frame.stream_id;
        self.begin_orphan_block(id, &frame.payload[4..], None);
        let end_headers = frame.flags.is_end_headers();
        frame.release();

        if end_headers {
            self.finish_header_block(id)?;
        } else {
            self.continuation = Some(id);
        }
        Ok(())
    }

    /// Whether every in-flight stream has finished
    ///
    /// Unused push reservations do not hold the connection open.
    fn drained(&self) -> bool {
        self.streams.scan().all(|s| {
            matches!(s.state(), StreamState::ReservedRemote | StreamState::Closed)
        })
    }

    /// Whether SETTINGS_MAX_CONCURRENT_STREAMS is exhausted
    fn at_stream_capacity(&self) -> bool {
        let max = self.local_settings.max_concurrent_streams;
        max != 0 && self.streams.active_count() >= max as usize
    }

    /// Send RST_STREAM and drop the stream; the connection lives on
    pub(super) fn stream_error(
        &mut self,
        id: StreamId,
        code: ErrorCode,
        reason: &str,
    ) -> Result<()> {
        debug!(stream_id = id, code = %code, reason, "stream error");
        self.send_rst_stream(id, code)?;
        if let Some(mut stream) = self.streams.remove(id) {
            stream.set_state(StreamState::Closed);
            self.metrics.stream_closed();
        }
        Ok(())
    }

    pub(super) fn send_rst_stream(&mut self, id: StreamId, code: ErrorCode) -> Result<()> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32(code.as_u32());
        self.write_raw(FrameType::RstStream, FrameFlags::empty(), id, &payload)
    }

    pub(super) fn send_window_update(&mut self, id: StreamId, increment: u32) -> Result<()> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32(increment & 0x7FFF_FFFF);
        self.write_raw(FrameType::WindowUpdate, FrameFlags::empty(), id, &payload)
    }

    /// Compose and write GOAWAY; idempotent, a second fatal error just closes
    fn send_goaway(&mut self, code: ErrorCode) {
        if self.goaway_sent {
            return;
        }
        self.goaway_sent = true;

        let mut payload = BytesMut::with_capacity(8);
        payload.put_u32(self.last_processed_stream & 0x7FFF_FFFF);
        payload.put_u32(code.as_u32());
        if let Err(e) = self.write_raw(FrameType::Goaway, FrameFlags::empty(), 0, &payload) {
            debug!(error = %e, "failed to write GOAWAY");
        }
        self.state = ConnectionState::Draining;
    }

    /// Write one frame; writes never interleave within a frame
    pub(super) fn write_raw(
        &mut self,
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: u32,
        payload: &[u8],
    ) -> Result<()> {
        if self.debug {
            trace!(
                frame_type = frame_type.name(),
                stream_id,
                flags = flags.as_u8(),
                len = payload.len(),
                "send frame"
            );
        }
        let mut wire = BytesMut::with_capacity(9 + payload.len());
        wire.put_slice(&FrameCodec::encode_header(
            frame_type,
            flags,
            stream_id,
            payload.len(),
        ));
        wire.put_slice(payload);
        self.session.write_all(&wire)?;
        Ok(())
    }
}

/// Locate the header block fragment inside a HEADERS payload, stripping
/// padding and the optional priority section. Returns the fragment range and
/// the priority weight when present.
fn parse_headers_payload(frame: &Frame) -> Result<(std::ops::Range<usize>, Option<u8>)> {
    let payload = &frame.payload;
    let mut start = 0;
    let mut end = payload.len();
    let mut weight = None;

    if frame.flags.is_padded() {
        if payload.is_empty() {
            return Err(Error::Protocol("PADDED HEADERS with empty payload".to_string()));
        }
        let pad_len = payload[0] as usize;
        start += 1;
        if start + pad_len > end {
            return Err(Error::Protocol("padding exceeds HEADERS payload".to_string()));
        }
        end -= pad_len;
    }

    if frame.flags.is_priority() {
        if start + 5 > end {
            return Err(Error::Protocol(
                "HEADERS priority section truncated".to_string(),
            ));
        }
        weight = Some(payload[start + 4]);
        start += 5;
    }

    Ok((start..end, weight))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(frame_type: FrameType, flags: u8, stream_id: u32, payload: &[u8]) -> Frame {
        Frame::with_payload(
            frame_type,
            FrameFlags::from_u8(flags),
            stream_id,
            payload.to_vec(),
        )
    }

    #[test]
    fn test_parse_headers_payload_plain() {
        let f = frame(FrameType::Headers, FrameFlags::END_HEADERS, 1, &[0x82, 0x84]);
        let (range, weight) = parse_headers_payload(&f).unwrap();
        assert_eq!(range, 0..2);
        assert_eq!(weight, None);
    }

    #[test]
    fn test_parse_headers_payload_padded_priority() {
        // pad_len=2, dep=0x00000003, weight=15, fragment=[0x82], padding=[0,0]
        let payload = [2u8, 0, 0, 0, 3, 15, 0x82, 0, 0];
        let f = frame(
            FrameType::Headers,
            FrameFlags::PADDED | FrameFlags::PRIORITY,
            1,
            &payload,
        );
        let (range, weight) = parse_headers_payload(&f).unwrap();
        assert_eq!(&f.payload[range], &[0x82]);
        assert_eq!(weight, Some(15));
    }

    #[test]
    fn test_parse_headers_payload_bad_padding() {
        let f = frame(FrameType::Headers, FrameFlags::PADDED, 1, &[200, 0x82]);
        assert!(parse_headers_payload(&f).is_err());
    }
}
