//! Packet codec
//!
//! Encodes and decodes single RCON packets. Framing of a byte stream into
//! packets is handled by the reassembler.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Size of the size, id and type fields
pub const HEADER_SIZE: usize = 12;

/// Two NUL bytes close every body
const TERMINATOR_SIZE: usize = 2;

/// Smallest possible packet: header plus terminator, empty body
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + TERMINATOR_SIZE;

/// Codec errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Incomplete packet: {0} bytes (min: {1})")]
    Incomplete(usize, usize),
}

/// A decoded RCON packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Byte count after the size field
    pub size: i32,
    /// Correlation id
    pub id: i32,
    /// Packet type
    pub packet_type: i32,
    /// Body with surrounding NUL bytes trimmed
    pub body: String,
}

/// Encode a packet into its wire representation
pub fn encode(packet_type: i32, id: i32, body: &str) -> BytesMut {
    let body = body.as_bytes();
    let total = body.len() + MIN_PACKET_SIZE;
    let mut buf = BytesMut::with_capacity(total);

    buf.put_i32_le((total - 4) as i32);
    buf.put_i32_le(id);
    buf.put_i32_le(packet_type);
    buf.put_slice(body);
    buf.put_u16_le(0);

    buf
}

/// Decode one complete packet.
///
/// The slice must hold exactly one packet as declared by its size field;
/// the body is everything between the header and the last two bytes.
pub fn decode(mut buf: &[u8]) -> Result<Packet, CodecError> {
    if buf.len() < MIN_PACKET_SIZE {
        return Err(CodecError::Incomplete(buf.len(), MIN_PACKET_SIZE));
    }

    let body_end = buf.len() - TERMINATOR_SIZE;
    let size = buf.get_i32_le();
    let id = buf.get_i32_le();
    let packet_type = buf.get_i32_le();
    let body = trim_nul(&buf[..body_end - HEADER_SIZE]);

    Ok(Packet {
        size,
        id,
        packet_type,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

fn trim_nul(mut bytes: &[u8]) -> &[u8] {
    while let [0, rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., 0] = bytes {
        bytes = rest;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PACKET: [u8; 18] = [14, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 84, 101, 115, 116, 0, 0];

    #[test]
    fn test_encode() {
        let buf = encode(1, 1, "Test");
        assert_eq!(&buf[..], &TEST_PACKET[..]);
    }

    #[test]
    fn test_decode() {
        let packet = decode(&TEST_PACKET).unwrap();
        assert_eq!(
            packet,
            Packet {
                size: 14,
                id: 1,
                packet_type: 1,
                body: "Test".to_string(),
            }
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let long = "AdminBroadcast ".repeat(512);
        let cases = [
            (3, 101, ""),
            (2, 50, "ListPlayers ÄÖ ✓"),
            (1, i32::MIN, "x"),
            (0, i32::MAX, long.as_str()),
            (0, -1, "body"),
        ];

        for (packet_type, id, body) in cases {
            let buf = encode(packet_type, id, body);
            assert_eq!(buf.len(), body.len() + MIN_PACKET_SIZE);

            let packet = decode(&buf).unwrap();
            assert_eq!(packet.size as usize, body.len() + 10);
            assert_eq!(packet.id, id);
            assert_eq!(packet.packet_type, packet_type);
            assert_eq!(packet.body, body);
        }
    }

    #[test]
    fn test_empty_body() {
        let buf = encode(2, 100, "");
        assert_eq!(&buf[..], &[10, 0, 0, 0, 100, 0, 0, 0, 2, 0, 0, 0, 0, 0]);
        assert_eq!(decode(&buf).unwrap().body, "");
    }

    #[test]
    fn test_decode_trims_padding() {
        let mut buf = BytesMut::new();
        buf.put_i32_le(16);
        buf.put_i32_le(7);
        buf.put_i32_le(0);
        buf.put_slice(b"\0\0ok\0\0");
        buf.put_u16_le(0);

        assert_eq!(decode(&buf).unwrap().body, "ok");
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(
            decode(&TEST_PACKET[..7]),
            Err(CodecError::Incomplete(7, MIN_PACKET_SIZE))
        );
    }
}
