//! HTTP/2 frame types and the payload buffer pool
//!
//! Frame types and flags follow RFC 7540 Section 6. Incoming frame payloads
//! live in pooled buffers of the canonical 16 384-octet capacity; releasing
//! a frame returns its buffer to a process-wide free list, and oversized
//! buffers are discarded so the pool never drifts above the canonical size.

use std::fmt;
use std::sync::Mutex;

/// Canonical payload buffer capacity (the default SETTINGS_MAX_FRAME_SIZE)
pub const FRAME_BUFFER_CAPACITY: usize = 16_384;

/// Upper bound on pooled buffers kept around
const POOL_LIMIT: usize = 64;

static BUFFER_POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

/// Get an empty payload buffer with the canonical capacity
pub(crate) fn acquire_buffer() -> Vec<u8> {
    let pooled = BUFFER_POOL.lock().ok().and_then(|mut pool| pool.pop());
    pooled.unwrap_or_else(|| Vec::with_capacity(FRAME_BUFFER_CAPACITY))
}

/// Return a payload buffer to the pool
///
/// Buffers whose capacity is not canonical are dropped.
pub(crate) fn release_buffer(mut buf: Vec<u8>) {
    if buf.capacity() != FRAME_BUFFER_CAPACITY {
        return;
    }
    buf.clear();
    if let Ok(mut pool) = BUFFER_POOL.lock() {
        if pool.len() < POOL_LIMIT {
            pool.push(buf);
        }
    }
}

/// HTTP/2 frame types (RFC 7540 Section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// DATA frame (0x0)
    Data,
    /// HEADERS frame (0x1)
    Headers,
    /// PRIORITY frame (0x2)
    Priority,
    /// RST_STREAM frame (0x3)
    RstStream,
    /// SETTINGS frame (0x4)
    Settings,
    /// PUSH_PROMISE frame (0x5)
    PushPromise,
    /// PING frame (0x6)
    Ping,
    /// GOAWAY frame (0x7)
    Goaway,
    /// WINDOW_UPDATE frame (0x8)
    WindowUpdate,
    /// CONTINUATION frame (0x9)
    Continuation,
    /// Extension frame type, tolerated and ignored
    Unknown(u8),
}

impl FrameType {
    /// Convert frame type to u8
    pub fn as_u8(self) -> u8 {
        match self {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::Goaway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::Unknown(t) => t,
        }
    }

    /// Create frame type from u8
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::Goaway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }

    /// Get frame type name
    pub fn name(&self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::Priority => "PRIORITY",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::PushPromise => "PUSH_PROMISE",
            FrameType::Ping => "PING",
            FrameType::Goaway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Continuation => "CONTINUATION",
            FrameType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u8())
    }
}

/// HTTP/2 frame flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// END_STREAM flag (0x1)
    pub const END_STREAM: u8 = 0x1;

    /// ACK flag (0x1) - used for SETTINGS and PING
    pub const ACK: u8 = 0x1;

    /// END_HEADERS flag (0x4)
    pub const END_HEADERS: u8 = 0x4;

    /// PADDED flag (0x8)
    pub const PADDED: u8 = 0x8;

    /// PRIORITY flag (0x20)
    pub const PRIORITY: u8 = 0x20;

    /// Create empty flags
    pub fn empty() -> Self {
        FrameFlags(0)
    }

    /// Create from u8
    pub fn from_u8(flags: u8) -> Self {
        FrameFlags(flags)
    }

    /// Get raw u8 value
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Set a flag
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Check if a flag is set
    pub fn is_set(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Check if END_STREAM is set
    pub fn is_end_stream(&self) -> bool {
        self.is_set(Self::END_STREAM)
    }

    /// Check if ACK is set
    pub fn is_ack(&self) -> bool {
        self.is_set(Self::ACK)
    }

    /// Check if END_HEADERS is set
    pub fn is_end_headers(&self) -> bool {
        self.is_set(Self::END_HEADERS)
    }

    /// Check if PADDED is set
    pub fn is_padded(&self) -> bool {
        self.is_set(Self::PADDED)
    }

    /// Check if PRIORITY is set
    pub fn is_priority(&self) -> bool {
        self.is_set(Self::PRIORITY)
    }
}

/// Generic HTTP/2 frame
#[derive(Debug)]
pub struct Frame {
    /// Frame type
    pub frame_type: FrameType,
    /// Frame flags
    pub flags: FrameFlags,
    /// Stream ID (31 bits, reserved bit cleared)
    pub stream_id: u32,
    /// Frame payload
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with a pooled payload buffer
    pub fn new(frame_type: FrameType, flags: FrameFlags, stream_id: u32) -> Self {
        Frame {
            frame_type,
            flags,
            stream_id,
            payload: acquire_buffer(),
        }
    }

    /// Create a frame around an existing payload
    pub fn with_payload(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: u32,
        payload: Vec<u8>,
    ) -> Self {
        Frame {
            frame_type,
            flags,
            stream_id,
            payload,
        }
    }

    /// Get payload size
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Return the payload buffer to the pool
    pub fn release(self) {
        release_buffer(self.payload);
    }
}
