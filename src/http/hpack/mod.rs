//! HPACK header compression (RFC 7541)
//!
//! This module implements the full header compression codec used by the
//! HTTP/2 engine: static and dynamic indexing tables, prefix-coded integers,
//! the canonical Huffman code, and the encoder/decoder pair that operates on
//! header block fragments.
//!
//! Encoder and decoder each carry their own dynamic table; tables are
//! per-endpoint-per-connection and must never be shared across connections.

pub mod decoder;
pub mod encoder;
pub mod huffman;
pub mod integer;
pub mod table;

pub use decoder::Decoder;
pub use encoder::Encoder;

/// A decoded header field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

impl HeaderField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        HeaderField {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Result type for HPACK operations
pub type Result<T> = std::result::Result<T, HpackError>;

/// HPACK decoding/encoding errors
#[derive(Debug, thiserror::Error)]
pub enum HpackError {
    /// Table index 0 or past the end of static + dynamic tables
    #[error("invalid table index: {0}")]
    InvalidIndex(usize),

    /// Header block ended in the middle of a representation
    #[error("truncated header block")]
    Truncated,

    /// Prefix integer exceeded the representable range
    #[error("integer overflow in prefix-coded integer")]
    IntegerOverflow,

    /// Huffman padding was not a prefix of the EOS symbol
    #[error("invalid Huffman padding")]
    InvalidPadding,

    /// Huffman stream decoded the EOS symbol or an impossible code
    #[error("invalid Huffman symbol")]
    InvalidSymbol,

    /// Header text was not valid UTF-8
    #[error("invalid string data in header field")]
    InvalidString,

    /// Header field names must be lowercase on the wire
    #[error("uppercase character in header field name")]
    UppercaseName,

    /// Dynamic table size update above the SETTINGS-advertised ceiling
    #[error("dynamic table size update {requested} exceeds limit {limit}")]
    TableSizeExceeded { requested: usize, limit: usize },
}
