//! HPACK decoder (RFC 7541 Section 3)
//!
//! Consumes an entire header block (the concatenated payloads of a HEADERS
//! frame and any CONTINUATION fragments) and emits header fields in arrival
//! order. The decoder owns the connection's inbound dynamic table.

use super::table::{self, DynamicTable};
use super::{huffman, integer, HeaderField, HpackError, Result};

/// Default dynamic table size before any SETTINGS or size update
const DEFAULT_TABLE_SIZE: usize = 4096;

/// HPACK decoder with dynamic table
pub struct Decoder {
    table: DynamicTable,
    /// Ceiling for dynamic table size updates, from our
    /// SETTINGS_HEADER_TABLE_SIZE advertisement
    max_size_limit: usize,
    /// Scratch buffer reused across Huffman string decodes
    scratch: Vec<u8>,
}

impl Decoder {
    /// Create a decoder with the default 4096-octet table
    pub fn new() -> Self {
        Decoder {
            table: DynamicTable::new(DEFAULT_TABLE_SIZE),
            max_size_limit: DEFAULT_TABLE_SIZE,
            scratch: Vec::with_capacity(256),
        }
    }

    /// Set the ceiling for dynamic table size updates
    pub fn set_max_table_size(&mut self, size: usize) {
        self.max_size_limit = size;
        if self.table.size() > size {
            self.table.set_max_size(size);
        }
    }

    /// Number of entries currently in the dynamic table
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Decode a complete header block, appending each field to `sink`
    pub fn decode(&mut self, block: &[u8], sink: &mut Vec<HeaderField>) -> Result<()> {
        let mut buf = block;

        while !buf.is_empty() {
            let prefix = buf[0];

            if prefix & 0x80 != 0 {
                // Indexed Header Field (Section 6.1)
                let (index, consumed) = integer::decode(buf, 7)?;
                buf = &buf[consumed..];
                let (name, value) = table::resolve(&self.table, index)?;
                sink.push(sanitize(name.to_string(), value.to_string())?);
            } else if prefix & 0xC0 == 0x40 {
                // Literal Header Field with Incremental Indexing (Section 6.2.1)
                let (name, value, rest) = self.decode_literal(buf, 6)?;
                buf = rest;
                // The table stores the field as transmitted; it must stay in
                // lockstep with the peer's encoder table, so sanitizing
                // happens only on emission.
                self.table.insert(&name, &value);
                sink.push(sanitize(name, value)?);
            } else if prefix & 0xE0 == 0x20 {
                // Dynamic Table Size Update (Section 6.3)
                let (new_size, consumed) = integer::decode(buf, 5)?;
                buf = &buf[consumed..];
                if new_size > self.max_size_limit {
                    return Err(HpackError::TableSizeExceeded {
                        requested: new_size,
                        limit: self.max_size_limit,
                    });
                }
                self.table.set_max_size(new_size);
            } else {
                // Literal without Indexing (0000) / Never Indexed (0001),
                // both with a 4-bit name index prefix (Sections 6.2.2, 6.2.3)
                let (name, value, rest) = self.decode_literal(buf, 4)?;
                buf = rest;
                sink.push(sanitize(name, value)?);
            }
        }

        Ok(())
    }

    /// Decode a literal representation: indexed or literal name, then value
    fn decode_literal<'a>(
        &mut self,
        buf: &'a [u8],
        prefix_bits: u8,
    ) -> Result<(String, String, &'a [u8])> {
        let (name_index, consumed) = integer::decode(buf, prefix_bits)?;
        let mut rest = &buf[consumed..];

        let name = if name_index > 0 {
            let (name, _) = table::resolve(&self.table, name_index)?;
            name.to_string()
        } else {
            let (name, consumed) = self.decode_string(rest)?;
            rest = &rest[consumed..];
            name
        };

        let (value, consumed) = self.decode_string(rest)?;
        rest = &rest[consumed..];

        Ok((name, value, rest))
    }

    /// Decode a length-prefixed string, Huffman-decoding when flagged
    fn decode_string(&mut self, buf: &[u8]) -> Result<(String, usize)> {
        if buf.is_empty() {
            return Err(HpackError::Truncated);
        }
        let huffman_coded = buf[0] & 0x80 != 0;
        let (length, consumed) = integer::decode(buf, 7)?;

        if buf.len() < consumed + length {
            return Err(HpackError::Truncated);
        }
        let data = &buf[consumed..consumed + length];

        let text = if huffman_coded {
            huffman::decode(data, &mut self.scratch)?;
            String::from_utf8(self.scratch.clone()).map_err(|_| HpackError::InvalidString)?
        } else {
            String::from_utf8(data.to_vec()).map_err(|_| HpackError::InvalidString)?
        };

        Ok((text, consumed + length))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Enforce lowercase names and strip CR/LF from names and values
///
/// Field names with uppercase ASCII are malformed per RFC 7540 Section
/// 8.1.2. CR and LF are stripped so decoded fields can never smuggle a
/// second header line into an HTTP/1 rendering of the request.
fn sanitize(name: String, value: String) -> Result<HeaderField> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(HpackError::UppercaseName);
    }

    let name = strip_crlf(name);
    let value = strip_crlf(value);
    Ok(HeaderField { name, value })
}

fn strip_crlf(s: String) -> String {
    if s.bytes().any(|b| b == b'\r' || b == b'\n') {
        s.chars().filter(|&c| c != '\r' && c != '\n').collect()
    } else {
        s
    }
}
