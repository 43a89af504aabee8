//! HTTP/2 error types
//!
//! This module defines error types for HTTP/2 operations, mapping to
//! the error codes defined in RFC 7540 Section 7.

use crate::http::hpack::HpackError;
use std::fmt;

/// HTTP/2 errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the underlying HTTP layer
    #[error("HTTP error: {0}")]
    Http(crate::http::Error),

    /// Protocol error detected (error code 0x1)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal error (error code 0x2)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Flow control error (error code 0x3)
    #[error("Flow control error: {0}")]
    FlowControl(String),

    /// Settings not acknowledged in time (error code 0x4)
    #[error("Settings timeout")]
    SettingsTimeout,

    /// Frame received for closed stream (error code 0x5)
    #[error("Stream closed: {0}")]
    StreamClosed(u32),

    /// Frame size incorrect (error code 0x6)
    #[error("Frame size error: {0}")]
    FrameSize(String),

    /// Stream cancelled by the peer (error code 0x8)
    #[error("Stream cancelled: {0}")]
    Cancel(u32),

    /// Header compression state broken (error code 0x9)
    #[error("Compression error: {0}")]
    Compression(String),

    /// Frame header could not be read in full
    #[error("Incomplete frame header")]
    IncompleteHeader,

    /// Frame payload could not be read in full
    #[error("Incomplete frame body")]
    IncompleteBody,

    /// Frame payload larger than the advertised maximum
    #[error("Frame payload too large: {0}")]
    FrameTooLarge(usize),

    /// Client preface did not match
    #[error("Invalid connection preface")]
    InvalidPreface,

    /// Socket read or write timed out
    #[error("Timeout")]
    Timeout,

    /// Connection closed by the peer
    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// The wire error code this error carries in GOAWAY or RST_STREAM
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Error::Protocol(_) | Error::InvalidPreface => ErrorCode::ProtocolError,
            Error::FlowControl(_) => ErrorCode::FlowControlError,
            Error::SettingsTimeout => ErrorCode::SettingsTimeout,
            Error::StreamClosed(_) => ErrorCode::StreamClosed,
            Error::FrameSize(_) | Error::FrameTooLarge(_) => ErrorCode::FrameSizeError,
            Error::Cancel(_) => ErrorCode::Cancel,
            Error::Compression(_) => ErrorCode::CompressionError,
            Error::Timeout | Error::ConnectionClosed => ErrorCode::NoError,
            _ => ErrorCode::InternalError,
        }
    }
}

impl From<crate::http::Error> for Error {
    fn from(e: crate::http::Error) -> Self {
        match e {
            crate::http::Error::Timeout => Error::Timeout,
            crate::http::Error::ConnectionClosed => Error::ConnectionClosed,
            other => Error::Http(other),
        }
    }
}

impl From<HpackError> for Error {
    fn from(e: HpackError) -> Self {
        match e {
            // Uppercase names are malformed requests, not compression
            // failures; the stream dies, the connection survives.
            HpackError::UppercaseName => {
                Error::Protocol("uppercase character in header field name".to_string())
            }
            other => Error::Compression(other.to_string()),
        }
    }
}

/// HTTP/2 error codes as defined in RFC 7540 Section 7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// Graceful shutdown
    NoError = 0x0,
    /// Protocol error detected
    ProtocolError = 0x1,
    /// Implementation fault
    InternalError = 0x2,
    /// Flow-control limits exceeded
    FlowControlError = 0x3,
    /// Settings not acknowledged
    SettingsTimeout = 0x4,
    /// Frame received for closed stream
    StreamClosed = 0x5,
    /// Frame size incorrect
    FrameSizeError = 0x6,
    /// Stream not processed
    RefusedStream = 0x7,
    /// Stream cancelled
    Cancel = 0x8,
    /// Compression state not updated
    CompressionError = 0x9,
    /// TCP connection error for CONNECT method
    ConnectError = 0xa,
    /// Processing capacity exceeded
    EnhanceYourCalm = 0xb,
    /// Negotiated TLS parameters not acceptable
    InadequateSecurity = 0xc,
    /// Use HTTP/1.1 for the request
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Create error code from u32
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0x0 => Some(ErrorCode::NoError),
            0x1 => Some(ErrorCode::ProtocolError),
            0x2 => Some(ErrorCode::InternalError),
            0x3 => Some(ErrorCode::FlowControlError),
            0x4 => Some(ErrorCode::SettingsTimeout),
            0x5 => Some(ErrorCode::StreamClosed),
            0x6 => Some(ErrorCode::FrameSizeError),
            0x7 => Some(ErrorCode::RefusedStream),
            0x8 => Some(ErrorCode::Cancel),
            0x9 => Some(ErrorCode::CompressionError),
            0xa => Some(ErrorCode::ConnectError),
            0xb => Some(ErrorCode::EnhanceYourCalm),
            0xc => Some(ErrorCode::InadequateSecurity),
            0xd => Some(ErrorCode::Http11Required),
            _ => None,
        }
    }

    /// Get error name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FlowControlError => "FLOW_CONTROL_ERROR",
            ErrorCode::SettingsTimeout => "SETTINGS_TIMEOUT",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
            ErrorCode::FrameSizeError => "FRAME_SIZE_ERROR",
            ErrorCode::RefusedStream => "REFUSED_STREAM",
            ErrorCode::Cancel => "CANCEL",
            ErrorCode::CompressionError => "COMPRESSION_ERROR",
            ErrorCode::ConnectError => "CONNECT_ERROR",
            ErrorCode::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            ErrorCode::InadequateSecurity => "INADEQUATE_SECURITY",
            ErrorCode::Http11Required => "HTTP_1_1_REQUIRED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u32())
    }
}

/// Result type for HTTP/2 operations
pub type Result<T> = std::result::Result<T, Error>;
