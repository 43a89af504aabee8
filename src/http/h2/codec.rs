//! HTTP/2 frame encoding and decoding
//!
//! Reads and writes the 9-octet frame header plus payload over an
//! `HttpSession`. The codec does no semantic validation beyond framing;
//! interpreting a frame is the connection engine's job.

use super::error::{Error, Result};
use super::frames::{acquire_buffer, Frame, FrameFlags, FrameType, FRAME_BUFFER_CAPACITY};
use crate::http::session::{HttpSession, SessionOps};
use bytes::{BufMut, BytesMut};

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Frame codec for encoding/decoding HTTP/2 frames
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header into a buffer
    pub fn encode_header(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: u32,
        length: usize,
    ) -> [u8; FRAME_HEADER_SIZE] {
        let mut header = [0u8; FRAME_HEADER_SIZE];

        // Length (24 bits, big-endian)
        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;

        // Type and flags
        header[3] = frame_type.as_u8();
        header[4] = flags.as_u8();

        // Stream ID (31 bits, big-endian, reserved bit cleared)
        let stream_id = stream_id & 0x7FFF_FFFF;
        header[5] = ((stream_id >> 24) & 0xFF) as u8;
        header[6] = ((stream_id >> 16) & 0xFF) as u8;
        header[7] = ((stream_id >> 8) & 0xFF) as u8;
        header[8] = (stream_id & 0xFF) as u8;

        header
    }

    /// Decode a frame header from bytes
    pub fn decode_header(bytes: &[u8; FRAME_HEADER_SIZE]) -> (FrameType, FrameFlags, u32, usize) {
        let length =
            ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);
        let frame_type = FrameType::from_u8(bytes[3]);
        let flags = FrameFlags::from_u8(bytes[4]);

        // Reserved bit is masked off
        let stream_id = ((bytes[5] as u32 & 0x7F) << 24)
            | ((bytes[6] as u32) << 16)
            | ((bytes[7] as u32) << 8)
            | (bytes[8] as u32);

        (frame_type, flags, stream_id, length)
    }

    /// Read one frame from the session
    ///
    /// `max_frame_size` is our advertised SETTINGS_MAX_FRAME_SIZE; anything
    /// larger is rejected before the payload is read.
    pub fn read_frame<S: SessionOps>(
        session: &mut HttpSession<S>,
        max_frame_size: u32,
    ) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let n = session.read_exact(&mut header)?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        if n < FRAME_HEADER_SIZE {
            return Err(Error::IncompleteHeader);
        }

        let (frame_type, flags, stream_id, length) = Self::decode_header(&header);

        if length > max_frame_size as usize {
            return Err(Error::FrameTooLarge(length));
        }

        // Standard-sized payloads reuse pooled buffers; anything larger than
        // the canonical capacity gets a one-off allocation.
        let mut payload = if length <= FRAME_BUFFER_CAPACITY {
            acquire_buffer()
        } else {
            Vec::with_capacity(length)
        };

        if length > 0 {
            payload.resize(length, 0);
            if session.read_exact(&mut payload)? < length {
                return Err(Error::IncompleteBody);
            }
        }

        Ok(Frame::with_payload(frame_type, flags, stream_id, payload))
    }

    /// Write one frame to the session
    pub fn write_frame<S: SessionOps>(session: &mut HttpSession<S>, frame: &Frame) -> Result<()> {
        let mut wire = BytesMut::with_capacity(FRAME_HEADER_SIZE + frame.payload.len());
        wire.put_slice(&Self::encode_header(
            frame.frame_type,
            frame.flags,
            frame.stream_id,
            frame.payload.len(),
        ));
        wire.put_slice(&frame.payload);
        session.write_all(&wire)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_header() {
        let flags = FrameFlags::from_u8(FrameFlags::END_STREAM | FrameFlags::END_HEADERS);
        let header = FrameCodec::encode_header(FrameType::Headers, flags, 42, 1234);
        let (frame_type, decoded_flags, stream_id, length) = FrameCodec::decode_header(&header);

        assert_eq!(frame_type, FrameType::Headers);
        assert_eq!(decoded_flags.as_u8(), flags.as_u8());
        assert_eq!(stream_id, 42);
        assert_eq!(length, 1234);
    }

    #[test]
    fn test_reserved_bit_masked() {
        // Encoding clears the reserved bit
        let header =
            FrameCodec::encode_header(FrameType::Data, FrameFlags::empty(), 0xFFFF_FFFF, 0);
        let (_, _, stream_id, _) = FrameCodec::decode_header(&header);
        assert_eq!(stream_id, 0x7FFF_FFFF);

        // Decoding masks it even when set on the wire
        let mut raw = FrameCodec::encode_header(FrameType::Data, FrameFlags::empty(), 1, 0);
        raw[5] |= 0x80;
        let (_, _, stream_id, _) = FrameCodec::decode_header(&raw);
        assert_eq!(stream_id, 1);
    }

    #[test]
    fn test_header_wire_layout() {
        let header = FrameCodec::encode_header(
            FrameType::Data,
            FrameFlags::from_u8(FrameFlags::END_STREAM),
            1,
            5,
        );
        assert_eq!(header, [0, 0, 5, 0x0, 0x1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_header_roundtrip_pseudo_random() {
        // Deterministic xorshift over (type, flags, stream id, length)
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for _ in 0..500 {
            let frame_type = FrameType::from_u8((next() % 12) as u8);
            let flags = FrameFlags::from_u8(next() as u8);
            let stream_id = (next() as u32) & 0x7FFF_FFFF;
            let length = (next() % (1 << 24)) as usize;

            let header = FrameCodec::encode_header(frame_type, flags, stream_id, length);
            let (t, f, id, len) = FrameCodec::decode_header(&header);
            assert_eq!(t, frame_type);
            assert_eq!(f.as_u8(), flags.as_u8());
            assert_eq!(id, stream_id);
            assert_eq!(len, length);
        }
    }

    #[test]
    fn test_unknown_type_survives_decode() {
        let header = FrameCodec::encode_header(FrameType::Unknown(0x42), FrameFlags::empty(), 7, 3);
        let (frame_type, _, stream_id, length) = FrameCodec::decode_header(&header);
        assert_eq!(frame_type, FrameType::Unknown(0x42));
        assert_eq!(stream_id, 7);
        assert_eq!(length, 3);
    }
}
