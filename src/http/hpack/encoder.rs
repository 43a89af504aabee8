//! HPACK encoder (RFC 7541 Section 3)
//!
//! Encodes one response header list per call into a header block. The
//! encoder owns the connection's outbound dynamic table: fields already in
//! a table are emitted as a single index, everything else becomes a literal
//! with incremental indexing and is inserted for the next block.

use super::table::{self, DynamicTable};
use super::{huffman, integer};

/// Default dynamic table size before the peer's SETTINGS arrives
const DEFAULT_TABLE_SIZE: usize = 4096;

/// HPACK encoder with dynamic table
pub struct Encoder {
    table: DynamicTable,
}

impl Encoder {
    /// Create an encoder with the default 4096-octet table
    pub fn new() -> Self {
        Encoder {
            table: DynamicTable::new(DEFAULT_TABLE_SIZE),
        }
    }

    /// Cap the dynamic table per the peer's SETTINGS_HEADER_TABLE_SIZE
    pub fn set_max_table_size(&mut self, size: usize) {
        self.table.set_max_size(size);
    }

    /// Number of entries currently in the dynamic table
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Encode one header field, appending to `dst`
    pub fn encode(&mut self, name: &str, value: &str, dst: &mut Vec<u8>) {
        // Full match anywhere: a single indexed representation
        if let Some(index) = table::find(&self.table, name, value) {
            integer::encode(index, 7, 0x80, dst);
            return;
        }

        // Literal with incremental indexing, reusing an indexed name if any
        match table::find_name(&self.table, name) {
            Some(name_index) => integer::encode(name_index, 6, 0x40, dst),
            None => {
                dst.push(0x40);
                encode_string(name, dst);
            }
        }
        encode_string(value, dst);

        self.table.insert(name, value);
    }

    /// Encode a whole header list into a header block
    pub fn encode_block<'a, I>(&mut self, fields: I, dst: &mut Vec<u8>)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in fields {
            self.encode(name, value, dst);
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit a length-prefixed string, Huffman-coded when that is shorter
fn encode_string(s: &str, dst: &mut Vec<u8>) {
    let raw = s.as_bytes();
    let huffman_len = huffman::encoded_len(raw);

    if huffman_len < raw.len() {
        integer::encode(huffman_len, 7, 0x80, dst);
        huffman::encode(raw, dst);
    } else {
        integer::encode(raw.len(), 7, 0x00, dst);
        dst.extend_from_slice(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::super::Decoder;
    use super::*;

    fn decode(decoder: &mut Decoder, block: &[u8]) -> Vec<(String, String)> {
        let mut sink = Vec::new();
        decoder.decode(block, &mut sink).unwrap();
        sink.into_iter().map(|f| (f.name, f.value)).collect()
    }

    #[test]
    fn test_static_exact_match_single_byte() {
        let mut encoder = Encoder::new();
        let mut block = Vec::new();
        encoder.encode(":method", "GET", &mut block);
        assert_eq!(block, vec![0x82]);

        block.clear();
        encoder.encode(":status", "200", &mut block);
        assert_eq!(block, vec![0x88]);
    }

    #[test]
    fn test_literal_inserted_then_indexed() {
        let mut encoder = Encoder::new();

        let mut first = Vec::new();
        encoder.encode("x-request-id", "abc123", &mut first);
        assert_eq!(encoder.table_len(), 1);

        // Second emission of the same pair is a one-byte index (62 = 0xBE)
        let mut second = Vec::new();
        encoder.encode("x-request-id", "abc123", &mut second);
        assert_eq!(second, vec![0xBE]);
    }

    #[test]
    fn test_name_reference_for_new_value() {
        let mut encoder = Encoder::new();
        let mut block = Vec::new();
        // content-type is static index 31; the value is new
        encoder.encode("content-type", "text/plain", &mut block);
        assert_eq!(block[0], 0x40 | 31);
    }

    #[test]
    fn test_roundtrip_through_decoder() {
        let mut encoder = Encoder::new();
        let mut decoder = Decoder::new();

        let fields = [
            (":status", "200"),
            ("content-type", "application/json"),
            ("x-trace", "0af7651916cd43dd8448eb211c80319c"),
            ("set-cookie", "id=a3fWa; Secure; HttpOnly"),
        ];

        let mut block = Vec::new();
        encoder.encode_block(fields.iter().copied(), &mut block);

        let decoded = decode(&mut decoder, &block);
        let expected: Vec<(String, String)> = fields
            .iter()
            .map(|&(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_shared_table_state_across_blocks() {
        let mut encoder = Encoder::new();
        let mut decoder = Decoder::new();

        for round in 0..4 {
            let value = "same-every-time";
            let mut block = Vec::new();
            encoder.encode("x-server", value, &mut block);
            encoder.encode(":status", "200", &mut block);

            if round > 0 {
                // After the first round the custom pair is a single index
                assert_eq!(block.len(), 2);
            }

            let decoded = decode(&mut decoder, &block);
            assert_eq!(
                decoded,
                vec![
                    ("x-server".to_string(), value.to_string()),
                    (":status".to_string(), "200".to_string())
                ]
            );
        }
        assert_eq!(encoder.table_len(), decoder.table_len());
    }

    #[test]
    fn test_huffman_used_when_shorter() {
        let mut encoder = Encoder::new();
        let mut block = Vec::new();
        // Lowercase text compresses well below 1:1
        encoder.encode("x-a", "aaaaaaaaaaaaaaaa", &mut block);

        let mut decoder = Decoder::new();
        let decoded = decode(&mut decoder, &block);
        assert_eq!(decoded[0].1, "aaaaaaaaaaaaaaaa");
        // 16 chars of 5-bit symbols is 10 octets on the wire
        assert!(block.len() < 4 + 16);
    }

    #[test]
    fn test_table_cap_respected() {
        let mut encoder = Encoder::new();
        encoder.set_max_table_size(40);

        let mut block = Vec::new();
        encoder.encode("aaaa", "bbbb", &mut block); // size 40, fits
        encoder.encode("cccc", "dddd", &mut block); // evicts the first
        assert_eq!(encoder.table_len(), 1);
    }
}
