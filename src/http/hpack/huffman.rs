//! Canonical Huffman coder (RFC 7541 Appendix B)
//!
//! The decode trie is built once from the 257-entry code table behind a
//! `OnceLock` and shared by every connection; decoding walks bits MSB-first
//! and writes into a caller-supplied buffer so warm paths do not allocate.

use super::{HpackError, Result};
use std::sync::OnceLock;

/// End-of-stream symbol. Its code may only appear as padding.
const EOS: u16 = 256;

/// (code, bit length) for symbols 0-255 plus EOS.
#[rustfmt::skip]
const CODES: [(u32, u8); 257] = [
    (0x1ff8, 13), (0x7fffd8, 23), (0xfffffe2, 28), (0xfffffe3, 28),
    (0xfffffe4, 28), (0xfffffe5, 28), (0xfffffe6, 28), (0xfffffe7, 28),
    (0xfffffe8, 28), (0xffffea, 24), (0x3ffffffc, 30), (0xfffffe9, 28),
    (0xfffffea, 28), (0x3ffffffd, 30), (0xfffffeb, 28), (0xfffffec, 28),
    (0xfffffed, 28), (0xfffffee, 28), (0xfffffef, 28), (0xffffff0, 28),
    (0xffffff1, 28), (0xffffff2, 28), (0x3ffffffe, 30), (0xffffff3, 28),
    (0xffffff4, 28), (0xffffff5, 28), (0xffffff6, 28), (0xffffff7, 28),
    (0xffffff8, 28), (0xffffff9, 28), (0xffffffa, 28), (0xffffffb, 28),
    (0x14, 6), (0x3f8, 10), (0x3f9, 10), (0xffa, 12),
    (0x1ff9, 13), (0x15, 6), (0xf8, 8), (0x7fa, 11),
    (0x3fa, 10), (0x3fb, 10), (0xf9, 8), (0x7fb, 11),
    (0xfa, 8), (0x16, 6), (0x17, 6), (0x18, 6),
    (0x0, 5), (0x1, 5), (0x2, 5), (0x19, 6),
    (0x1a, 6), (0x1b, 6), (0x1c, 6), (0x1d, 6),
    (0x1e, 6), (0x1f, 6), (0x5c, 7), (0xfb, 8),
    (0x7ffc, 15), (0x20, 6), (0xffb, 12), (0x3fc, 10),
    (0x1ffa, 13), (0x21, 6), (0x5d, 7), (0x5e, 7),
    (0x5f, 7), (0x60, 7), (0x61, 7), (0x62, 7),
    (0x63, 7), (0x64, 7), (0x65, 7), (0x66, 7),
    (0x67, 7), (0x68, 7), (0x69, 7), (0x6a, 7),
    (0x6b, 7), (0x6c, 7), (0x6d, 7), (0x6e, 7),
    (0x6f, 7), (0x70, 7), (0x71, 7), (0x72, 7),
    (0xfc, 8), (0x73, 7), (0xfd, 8), (0x1ffb, 13),
    (0x7fff0, 19), (0x1ffc, 13), (0x3ffc, 14), (0x22, 6),
    (0x7ffd, 15), (0x3, 5), (0x23, 6), (0x4, 5),
    (0x24, 6), (0x5, 5), (0x25, 6), (0x26, 6),
    (0x27, 6), (0x6, 5), (0x74, 7), (0x75, 7),
    (0x28, 6), (0x29, 6), (0x2a, 6), (0x7, 5),
    (0x2b, 6), (0x76, 7), (0x2c, 6), (0x8, 5),
    (0x9, 5), (0x2d, 6), (0x77, 7), (0x78, 7),
    (0x79, 7), (0x7a, 7), (0x7b, 7), (0x7ffe, 15),
    (0x7fc, 11), (0x3ffd, 14), (0x1ffd, 13), (0xffffffc, 28),
    (0xfffe6, 20), (0x3fffd2, 22), (0xfffe7, 20), (0xfffe8, 20),
    (0x3fffd3, 22), (0x3fffd4, 22), (0x3fffd5, 22), (0x7fffd9, 23),
    (0x3fffd6, 22), (0x7fffda, 23), (0x7fffdb, 23), (0x7fffdc, 23),
    (0x7fffdd, 23), (0x7fffde, 23), (0xffffeb, 24), (0x7fffdf, 23),
    (0xffffec, 24), (0xffffed, 24), (0x3fffd7, 22), (0x7fffe0, 23),
    (0xffffee, 24), (0x7fffe1, 23), (0x7fffe2, 23), (0x7fffe3, 23),
    (0x7fffe4, 23), (0x1fffdc, 21), (0x3fffd8, 22), (0x7fffe5, 23),
    (0x3fffd9, 22), (0x7fffe6, 23), (0x7fffe7, 23), (0xffffef, 24),
    (0x3fffda, 22), (0x1fffdd, 21), (0xfffe9, 20), (0x3fffdb, 22),
    (0x3fffdc, 22), (0x7fffe8, 23), (0x7fffe9, 23), (0x1fffde, 21),
    (0x7fffea, 23), (0x3fffdd, 22), (0x3fffde, 22), (0xfffff0, 24),
    (0x1fffdf, 21), (0x3fffdf, 22), (0x7fffeb, 23), (0x7fffec, 23),
    (0x1fffe0, 21), (0x1fffe1, 21), (0x3fffe0, 22), (0x1fffe2, 21),
    (0x7fffed, 23), (0x3fffe1, 22), (0x7fffee, 23), (0x7fffef, 23),
    (0xfffea, 20), (0x3fffe2, 22), (0x3fffe3, 22), (0x3fffe4, 22),
    (0x7ffff0, 23), (0x3fffe5, 22), (0x3fffe6, 22), (0x7ffff1, 23),
    (0x3ffffe0, 26), (0x3ffffe1, 26), (0xfffeb, 20), (0x7fff1, 19),
    (0x3fffe7, 22), (0x7ffff2, 23), (0x3fffe8, 22), (0x1ffffec, 25),
    (0x3ffffe2, 26), (0x3ffffe3, 26), (0x3ffffe4, 26), (0x7ffffde, 27),
    (0x7ffffdf, 27), (0x3ffffe5, 26), (0xfffff1, 24), (0x1ffffed, 25),
    (0x7fff2, 19), (0x1fffe3, 21), (0x3ffffe6, 26), (0x7ffffe0, 27),
    (0x7ffffe1, 27), (0x3ffffe7, 26), (0x7ffffe2, 27), (0xfffff2, 24),
    (0x1fffe4, 21), (0x1fffe5, 21), (0x3ffffe8, 26), (0x3ffffe9, 26),
    (0xffffffd, 28), (0x7ffffe3, 27), (0x7ffffe4, 27), (0x7ffffe5, 27),
    (0xfffec, 20), (0xfffff3, 24), (0xfffed, 20), (0x1fffe6, 21),
    (0x3fffe9, 22), (0x1fffe7, 21), (0x1fffe8, 21), (0x7ffff3, 23),
    (0x3fffea, 22), (0x3fffeb, 22), (0x1ffffee, 25), (0x1ffffef, 25),
    (0xfffff4, 24), (0xfffff5, 24), (0x3ffffea, 26), (0x7ffff4, 23),
    (0x3ffffeb, 26), (0x7ffffe6, 27), (0x3ffffec, 26), (0x3ffffed, 26),
    (0x7ffffe7, 27), (0x7ffffe8, 27), (0x7ffffe9, 27), (0x7ffffea, 27),
    (0x7ffffeb, 27), (0xffffffe, 28), (0x7ffffec, 27), (0x7ffffed, 27),
    (0x7ffffee, 27), (0x7ffffef, 27), (0x7fffff0, 27), (0x3ffffee, 26),
    (0x3fffffff, 30),
];

struct Node {
    children: [Option<Box<Node>>; 2],
    symbol: Option<u16>,
}

impl Node {
    fn new() -> Self {
        Node {
            children: [None, None],
            symbol: None,
        }
    }
}

static TRIE: OnceLock<Node> = OnceLock::new();

fn trie() -> &'static Node {
    TRIE.get_or_init(|| {
        let mut root = Node::new();
        for (symbol, &(code, bits)) in CODES.iter().enumerate() {
            let mut node = &mut root;
            for i in (0..bits).rev() {
                let bit = ((code >> i) & 1) as usize;
                node = node.children[bit]
                    .get_or_insert_with(|| Box::new(Node::new()))
                    .as_mut();
            }
            node.symbol = Some(symbol as u16);
        }
        root
    })
}

/// Number of octets `src` occupies once Huffman-encoded.
pub fn encoded_len(src: &[u8]) -> usize {
    let bits: usize = src.iter().map(|&b| CODES[b as usize].1 as usize).sum();
    (bits + 7) / 8
}

/// Huffman-encode `src`, appending to `dst`. Trailing bits are padded with
/// the most significant bits of the EOS code (all ones).
pub fn encode(src: &[u8], dst: &mut Vec<u8>) {
    let mut bitbuf: u64 = 0;
    let mut bits: u32 = 0;

    for &byte in src {
        let (code, len) = CODES[byte as usize];
        bitbuf = (bitbuf << len) | code as u64;
        bits += len as u32;
        while bits >= 8 {
            bits -= 8;
            dst.push((bitbuf >> bits) as u8);
        }
    }

    if bits > 0 {
        let pad = (1u64 << (8 - bits)) - 1;
        dst.push(((bitbuf << (8 - bits)) | pad) as u8);
    }
}

/// Huffman-decode `src` into `dst`.
///
/// `dst` is cleared first and reused; the trie itself is immutable shared
/// state. Trailing bits must form a prefix of the EOS code, and a complete
/// EOS inside the stream is rejected.
pub fn decode(src: &[u8], dst: &mut Vec<u8>) -> Result<()> {
    dst.clear();

    let root = trie();
    let mut node = root;
    // Bits consumed since the last emitted symbol, for padding validation
    let mut path_len: u8 = 0;
    let mut path_ones = true;

    for &byte in src {
        for shift in (0..8).rev() {
            let bit = ((byte >> shift) & 1) as usize;
            node = match &node.children[bit] {
                Some(child) => child.as_ref(),
                None => return Err(HpackError::InvalidSymbol),
            };
            path_len += 1;
            path_ones &= bit == 1;

            if let Some(symbol) = node.symbol {
                if symbol == EOS {
                    return Err(HpackError::InvalidSymbol);
                }
                dst.push(symbol as u8);
                node = root;
                path_len = 0;
                path_ones = true;
            }
        }
    }

    // Whatever is left must be at most 7 set bits: a prefix of EOS.
    if path_len >= 8 || !path_ones {
        return Err(HpackError::InvalidPadding);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &[u8]) {
        let mut encoded = Vec::new();
        encode(input, &mut encoded);
        assert_eq!(encoded.len(), encoded_len(input));

        let mut decoded = Vec::new();
        decode(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_rfc7541_c4_1_www_example_com() {
        // RFC 7541 Appendix C.4.1
        let mut encoded = Vec::new();
        encode(b"www.example.com", &mut encoded);
        assert_eq!(
            encoded,
            [0xF1, 0xE3, 0xC2, 0xE5, 0xF2, 0x3A, 0x6B, 0xA0, 0xAB, 0x90, 0xF4, 0xFF]
        );
    }

    #[test]
    fn test_rfc7541_c4_2_no_cache() {
        // RFC 7541 Appendix C.4.2
        let mut encoded = Vec::new();
        encode(b"no-cache", &mut encoded);
        assert_eq!(encoded, [0xA8, 0xEB, 0x10, 0x64, 0x9C, 0xBF]);
    }

    #[test]
    fn test_rfc7541_c6_1_date_value() {
        // RFC 7541 Appendix C.6.1
        let mut encoded = Vec::new();
        encode(b"Mon, 21 Oct 2013 20:13:21 GMT", &mut encoded);
        assert_eq!(
            encoded,
            [
                0xD0, 0x7A, 0xBE, 0x94, 0x10, 0x54, 0xD4, 0x44, 0xA8, 0x20, 0x05, 0x95,
                0x04, 0x0B, 0x81, 0x66, 0xE0, 0x82, 0xA6, 0x2D, 0x1B, 0xFF,
            ]
        );
    }

    #[test]
    fn test_roundtrip_ascii() {
        roundtrip(b"");
        roundtrip(b"a");
        roundtrip(b"hello world");
        roundtrip(b"/search?q=rust+http2&limit=10");
        let all: Vec<u8> = (0u8..=127).collect();
        roundtrip(&all);
    }

    #[test]
    fn test_roundtrip_binary() {
        let all: Vec<u8> = (0u8..=255).collect();
        roundtrip(&all);
    }

    #[test]
    fn test_decode_reuses_buffer() {
        let mut encoded = Vec::new();
        encode(b"first", &mut encoded);

        let mut out = Vec::with_capacity(64);
        decode(&encoded, &mut out).unwrap();
        assert_eq!(out, b"first");

        encoded.clear();
        encode(b"second value", &mut encoded);
        let capacity = out.capacity();
        decode(&encoded, &mut out).unwrap();
        assert_eq!(out, b"second value");
        assert_eq!(out.capacity(), capacity);
    }

    #[test]
    fn test_invalid_padding_zero_bits() {
        // 'a' is 00011 (5 bits); zero padding is not an EOS prefix
        let mut out = Vec::new();
        assert!(matches!(
            decode(&[0b0001_1000], &mut out),
            Err(HpackError::InvalidPadding)
        ));
    }

    #[test]
    fn test_eos_in_stream_rejected() {
        // 30 bits of EOS followed by enough ones to finish the octet
        let mut out = Vec::new();
        let result = decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF], &mut out);
        assert!(matches!(result, Err(HpackError::InvalidSymbol)));
    }

    #[test]
    fn test_whole_octet_padding_rejected() {
        // A valid symbol followed by a full octet of ones-padding
        let mut encoded = Vec::new();
        encode(b"0", &mut encoded);
        encoded.push(0xFF);
        let mut out = Vec::new();
        assert!(matches!(
            decode(&encoded, &mut out),
            Err(HpackError::InvalidPadding)
        ));
    }
}
