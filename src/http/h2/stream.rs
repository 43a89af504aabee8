//! HTTP/2 stream management (RFC 7540 Section 5)
//!
//! A `Stream` accumulates header block fragments and DATA payload while the
//! client is sending, then carries the response on the way back out. The
//! `StreamRegistry` owns every live stream of a connection, keyed by id.

use super::error::{Error, Result};
use super::flow_control::FlowWindow;
use crate::http::hpack::HeaderField;
use crate::http::message::Response;
use std::collections::HashMap;

/// Stream ID type
pub type StreamId = u32;

/// Stream state as defined in RFC 7540 Section 5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No frames have been sent or received
    Idle,
    /// PUSH_PROMISE received for this id
    ReservedRemote,
    /// Both sides can send frames
    Open,
    /// We can't send, the peer can
    HalfClosedLocal,
    /// The peer is done sending, we can respond
    HalfClosedRemote,
    /// Stream is closed
    Closed,
}

impl StreamState {
    /// Check if the peer may still send payload frames on this stream
    pub fn can_receive(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Check if stream is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }
}

/// HTTP/2 stream
#[derive(Debug)]
pub struct Stream {
    id: StreamId,
    state: StreamState,
    /// Single-byte weight proxy; lower schedules earlier
    priority: u8,
    send_window: FlowWindow,
    recv_window: FlowWindow,
    /// Header block fragments accumulated until END_HEADERS
    header_block: Vec<u8>,
    /// Decoded header list
    headers: Vec<HeaderField>,
    /// Accumulated DATA payload
    body: Vec<u8>,
    /// END_STREAM seen on a HEADERS frame still awaiting END_HEADERS
    end_stream_pending: bool,
    /// Response produced by the handler, awaiting serialization
    response: Option<Response>,
}

impl Stream {
    /// Create a stream with the given initial window sizes
    pub fn new(id: StreamId, send_window: u32, recv_window: u32) -> Self {
        Stream {
            id,
            state: StreamState::Idle,
            priority: 0,
            send_window: FlowWindow::new(send_window),
            recv_window: FlowWindow::new(recv_window),
            header_block: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
            end_stream_pending: false,
            response: None,
        }
    }

    /// Get stream ID
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Get stream state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Set stream state
    pub fn set_state(&mut self, state: StreamState) {
        self.state = state;
    }

    /// Get the priority byte
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Set the priority byte
    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    /// Get the send flow window
    pub fn send_window(&self) -> &FlowWindow {
        &self.send_window
    }

    /// Get the mutable send flow window
    pub fn send_window_mut(&mut self) -> &mut FlowWindow {
        &mut self.send_window
    }

    /// Get the receive flow window
    pub fn recv_window(&self) -> &FlowWindow {
        &self.recv_window
    }

    /// Get the mutable receive flow window
    pub fn recv_window_mut(&mut self) -> &mut FlowWindow {
        &mut self.recv_window
    }

    /// Append a header block fragment
    pub fn append_header_fragment(&mut self, fragment: &[u8]) {
        self.header_block.extend_from_slice(fragment);
    }

    /// Take the accumulated header block for decoding
    pub fn take_header_block(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.header_block)
    }

    /// Get the decoded header list
    pub fn headers(&self) -> &[HeaderField] {
        &self.headers
    }

    /// Store the decoded header list
    pub fn set_headers(&mut self, headers: Vec<HeaderField>) {
        self.headers = headers;
    }

    /// Take the decoded header list
    pub fn take_headers(&mut self) -> Vec<HeaderField> {
        std::mem::take(&mut self.headers)
    }

    /// Append DATA payload
    pub fn append_body(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    /// Get the accumulated body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Take the accumulated body
    pub fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    /// Record END_STREAM seen before END_HEADERS
    pub fn set_end_stream_pending(&mut self, pending: bool) {
        self.end_stream_pending = pending;
    }

    /// Whether END_STREAM arrived on the HEADERS frame
    pub fn end_stream_pending(&self) -> bool {
        self.end_stream_pending
    }

    /// Store the handler's response
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    /// Take the handler's response
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

/// Registry of a connection's live streams, keyed by stream id
///
/// The registry enforces the id rules for remote-initiated streams: odd ids
/// only, strictly greater than every id seen before.
#[derive(Debug)]
pub struct StreamRegistry {
    streams: HashMap<StreamId, Stream>,
    /// Highest remote-initiated id ever seen
    max_remote_id: StreamId,
}

impl StreamRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        StreamRegistry {
            streams: HashMap::new(),
            max_remote_id: 0,
        }
    }

    /// Open a new remote-initiated stream
    pub fn open_remote(
        &mut self,
        id: StreamId,
        send_window: u32,
        recv_window: u32,
    ) -> Result<&mut Stream> {
        if id % 2 == 0 {
            return Err(Error::Protocol(format!(
                "even stream id {} from client",
                id
            )));
        }
        if id <= self.max_remote_id {
            return Err(Error::Protocol(format!(
                "stream id {} not greater than previous {}",
                id, self.max_remote_id
            )));
        }

        self.max_remote_id = id;
        let stream = Stream::new(id, send_window, recv_window);
        Ok(self.streams.entry(id).or_insert(stream))
    }

    /// Register a PUSH_PROMISE-reserved stream id
    pub fn reserve_remote(&mut self, id: StreamId, send_window: u32, recv_window: u32) {
        let mut stream = Stream::new(id, send_window, recv_window);
        stream.set_state(StreamState::ReservedRemote);
        self.streams.insert(id, stream);
    }

    /// Get a stream by ID
    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(&id)
    }

    /// Get a mutable stream by ID
    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    /// Check if a stream exists
    pub fn contains(&self, id: StreamId) -> bool {
        self.streams.contains_key(&id)
    }

    /// Remove a stream
    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        self.streams.remove(&id)
    }

    /// Highest remote-initiated id ever seen
    ///
    /// A remote id at or below this that is no longer present belongs to a
    /// closed stream.
    pub fn max_remote_id(&self) -> StreamId {
        self.max_remote_id
    }

    /// All live stream ids, unordered
    pub fn ids(&self) -> Vec<StreamId> {
        self.streams.keys().copied().collect()
    }

    /// Number of live streams
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Check whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Number of streams not yet closed
    pub fn active_count(&self) -> usize {
        self.streams
            .values()
            .filter(|s| !s.state().is_closed())
            .count()
    }

    /// Iterate over all live streams
    pub fn scan(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    /// Stream ids in scheduling order: ascending priority byte, stable
    pub fn schedule(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        let mut ordered: Vec<(u8, StreamId)> = ids
            .into_iter()
            .map(|id| (self.streams[&id].priority(), id))
            .collect();
        ordered.sort_by_key(|&(priority, _)| priority);
        ordered.into_iter().map(|(_, id)| id).collect()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_remote_enforces_parity() {
        let mut registry = StreamRegistry::new();
        assert!(registry.open_remote(2, 65_535, 65_535).is_err());
        assert!(registry.open_remote(1, 65_535, 65_535).is_ok());
    }

    #[test]
    fn test_open_remote_enforces_monotonicity() {
        let mut registry = StreamRegistry::new();
        registry.open_remote(5, 65_535, 65_535).unwrap();
        assert!(registry.open_remote(3, 65_535, 65_535).is_err());
        assert!(registry.open_remote(5, 65_535, 65_535).is_err());
        assert!(registry.open_remote(7, 65_535, 65_535).is_ok());
        assert_eq!(registry.max_remote_id(), 7);
    }

    #[test]
    fn test_remove_keeps_max_remote_id() {
        let mut registry = StreamRegistry::new();
        registry.open_remote(1, 65_535, 65_535).unwrap();
        registry.remove(1);
        assert!(!registry.contains(1));
        // The id stays burned
        assert!(registry.open_remote(1, 65_535, 65_535).is_err());
        assert_eq!(registry.max_remote_id(), 1);
    }

    #[test]
    fn test_stream_accumulators() {
        let mut stream = Stream::new(1, 65_535, 65_535);
        stream.append_header_fragment(&[0x82]);
        stream.append_header_fragment(&[0x84]);
        assert_eq!(stream.take_header_block(), vec![0x82, 0x84]);
        assert!(stream.take_header_block().is_empty());

        stream.append_body(b"hello ");
        stream.append_body(b"world");
        assert_eq!(stream.body(), b"hello world");
        assert_eq!(stream.take_body(), b"hello world");
    }

    #[test]
    fn test_schedule_orders_by_priority() {
        let mut registry = StreamRegistry::new();
        registry.open_remote(1, 65_535, 65_535).unwrap();
        registry.open_remote(3, 65_535, 65_535).unwrap();
        registry.open_remote(5, 65_535, 65_535).unwrap();

        registry.get_mut(1).unwrap().set_priority(200);
        registry.get_mut(3).unwrap().set_priority(10);
        registry.get_mut(5).unwrap().set_priority(10);

        // Equal priorities keep ascending-id order
        assert_eq!(registry.schedule(), vec![3, 5, 1]);
    }

    #[test]
    fn test_reserve_remote() {
        let mut registry = StreamRegistry::new();
        registry.reserve_remote(2, 65_535, 65_535);
        assert_eq!(
            registry.get(2).unwrap().state(),
            StreamState::ReservedRemote
        );
    }
}
