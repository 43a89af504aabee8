//! HPACK codec integration tests
//!
//! Round-trip properties across a shared encoder/decoder pair, the RFC 7541
//! appendix decode vectors, and Huffman coverage over full byte ranges.

use weft::http::hpack::{huffman, Decoder, Encoder, HeaderField};

fn decode_pairs(decoder: &mut Decoder, block: &[u8]) -> Vec<(String, String)> {
    let mut sink: Vec<HeaderField> = Vec::new();
    decoder.decode(block, &mut sink).unwrap();
    sink.into_iter().map(|f| (f.name, f.value)).collect()
}

#[test]
fn test_roundtrip_request_header_lists() {
    let mut encoder = Encoder::new();
    let mut decoder = Decoder::new();

    let requests: Vec<Vec<(&str, &str)>> = vec![
        vec![
            (":method", "GET"),
            (":scheme", "https"),
            (":path", "/"),
            (":authority", "www.example.com"),
        ],
        vec![
            (":method", "GET"),
            (":scheme", "https"),
            (":path", "/"),
            (":authority", "www.example.com"),
            ("cache-control", "no-cache"),
        ],
        vec![
            (":method", "GET"),
            (":scheme", "https"),
            (":path", "/index.html"),
            (":authority", "www.example.com"),
            ("custom-key", "custom-value"),
        ],
    ];

    // Dynamic table state must stay consistent over a request sequence
    for request in &requests {
        let mut block = Vec::new();
        encoder.encode_block(request.iter().copied(), &mut block);

        let decoded = decode_pairs(&mut decoder, &block);
        let expected: Vec<(String, String)> = request
            .iter()
            .map(|&(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(decoded, expected);
    }

    assert_eq!(encoder.table_len(), decoder.table_len());
}

#[test]
fn test_roundtrip_pseudo_random_pairs() {
    let mut encoder = Encoder::new();
    let mut decoder = Decoder::new();

    // Deterministic xorshift; names lowercase ASCII, values printable
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    for _ in 0..50 {
        let mut fields: Vec<(String, String)> = Vec::new();
        for _ in 0..8 {
            let name_len = 1 + (next() % 12) as usize;
            let value_len = (next() % 40) as usize;
            let name: String = (0..name_len)
                .map(|_| (b'a' + (next() % 26) as u8) as char)
                .collect();
            let value: String = (0..value_len)
                .map(|_| (b' ' + (next() % 95) as u8) as char)
                .collect();
            fields.push((name, value));
        }

        let mut block = Vec::new();
        encoder.encode_block(
            fields.iter().map(|(n, v)| (n.as_str(), v.as_str())),
            &mut block,
        );

        let decoded = decode_pairs(&mut decoder, &block);
        let expected: Vec<(String, String)> = fields
            .iter()
            .map(|(n, v)| {
                let clean: String = v.chars().filter(|&c| c != '\r' && c != '\n').collect();
                (n.clone(), clean)
            })
            .collect();
        assert_eq!(decoded, expected);
    }
}

#[test]
fn test_rfc7541_c3_plain_request_sequence() {
    // RFC 7541 Appendix C.3: three requests without Huffman coding,
    // decoded through one decoder to exercise dynamic table growth
    let mut decoder = Decoder::new();

    let first: &[u8] = &[
        0x82, 0x86, 0x84, 0x41, 0x0F, 0x77, 0x77, 0x77, 0x2E, 0x65, 0x78, 0x61, 0x6D, 0x70,
        0x6C, 0x65, 0x2E, 0x63, 0x6F, 0x6D,
    ];
    let fields = decode_pairs(&mut decoder, first);
    assert_eq!(
        fields,
        vec![
            (":method".into(), "GET".into()),
            (":scheme".into(), "http".into()),
            (":path".into(), "/".into()),
            (":authority".into(), "www.example.com".into()),
        ]
    );
    assert_eq!(decoder.table_len(), 1);

    let second: &[u8] = &[
        0x82, 0x86, 0x84, 0xBE, 0x58, 0x08, 0x6E, 0x6F, 0x2D, 0x63, 0x61, 0x63, 0x68, 0x65,
    ];
    let fields = decode_pairs(&mut decoder, second);
    assert_eq!(fields[3], (":authority".into(), "www.example.com".into()));
    assert_eq!(fields[4], ("cache-control".into(), "no-cache".into()));
    assert_eq!(decoder.table_len(), 2);

    let third: &[u8] = &[
        0x82, 0x87, 0x85, 0xBF, 0x40, 0x0A, 0x63, 0x75, 0x73, 0x74, 0x6F, 0x6D, 0x2D, 0x6B,
        0x65, 0x79, 0x0C, 0x63, 0x75, 0x73, 0x74, 0x6F, 0x6D, 0x2D, 0x76, 0x61, 0x6C, 0x75,
        0x65,
    ];
    let fields = decode_pairs(&mut decoder, third);
    assert_eq!(
        fields,
        vec![
            (":method".into(), "GET".into()),
            (":scheme".into(), "https".into()),
            (":path".into(), "/index.html".into()),
            (":authority".into(), "www.example.com".into()),
            ("custom-key".into(), "custom-value".into()),
        ]
    );
    assert_eq!(decoder.table_len(), 3);
}

#[test]
fn test_rfc7541_c4_huffman_request_sequence() {
    // RFC 7541 Appendix C.4: the same requests with Huffman-coded strings
    let mut decoder = Decoder::new();

    let first: &[u8] = &[
        0x82, 0x86, 0x84, 0x41, 0x8C, 0xF1, 0xE3, 0xC2, 0xE5, 0xF2, 0x3A, 0x6B, 0xA0, 0xAB,
        0x90, 0xF4, 0xFF,
    ];
    let fields = decode_pairs(&mut decoder, first);
    assert_eq!(fields[3], (":authority".into(), "www.example.com".into()));

    let second: &[u8] = &[
        0x82, 0x86, 0x84, 0xBE, 0x58, 0x86, 0xA8, 0xEB, 0x10, 0x64, 0x9C, 0xBF,
    ];
    let fields = decode_pairs(&mut decoder, second);
    assert_eq!(fields[4], ("cache-control".into(), "no-cache".into()));

    let third: &[u8] = &[
        0x82, 0x87, 0x85, 0xBF, 0x40, 0x88, 0x25, 0xA8, 0x49, 0xE9, 0x5B, 0xA9, 0x7D, 0x7F,
        0x89, 0x25, 0xA8, 0x49, 0xE9, 0x5B, 0xB8, 0xE8, 0xB4, 0xBF,
    ];
    let fields = decode_pairs(&mut decoder, third);
    assert_eq!(fields[4], ("custom-key".into(), "custom-value".into()));
    assert_eq!(decoder.table_len(), 3);
}

#[test]
fn test_huffman_roundtrip_ascii_strings() {
    let samples = [
        "",
        "/",
        "www.example.com",
        "Mon, 21 Oct 2013 20:13:21 GMT",
        "max-age=3600; includeSubdomains",
        "!\"#$%&'()*+,-./0123456789:;<=>?@",
    ];

    let mut encoded = Vec::new();
    let mut decoded = Vec::new();
    for sample in samples {
        encoded.clear();
        huffman::encode(sample.as_bytes(), &mut encoded);
        huffman::decode(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, sample.as_bytes());
    }
}

#[test]
fn test_shrunken_table_stays_in_sync() {
    let mut encoder = Encoder::new();
    let mut decoder = Decoder::new();
    // Both ends agree on a small table, as after SETTINGS
    encoder.set_max_table_size(128);
    decoder.set_max_table_size(128);

    for i in 0..20 {
        let name = format!("x-header-{}", i);
        let value = format!("value-{}", i);
        let mut block = Vec::new();
        encoder.encode(&name, &value, &mut block);
        // Re-emit an older pair that may or may not still be indexed
        if i >= 3 {
            let old_name = format!("x-header-{}", i - 3);
            let old_value = format!("value-{}", i - 3);
            encoder.encode(&old_name, &old_value, &mut block);
        }

        let fields = decode_pairs(&mut decoder, &block);
        assert_eq!(fields[0].0, format!("x-header-{}", i));
        if i >= 3 {
            assert_eq!(fields[1].1, format!("value-{}", i - 3));
        }
        assert_eq!(encoder.table_len(), decoder.table_len());
    }
}
