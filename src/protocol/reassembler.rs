//! Stream reassembly
//!
//! TCP gives no message boundaries, so inbound bytes are buffered here until
//! they form a complete packet. Command replies may span many packets; the
//! end of a reply is detected by the completion marker the server emits
//! after answering the sentinel empty command.

use bytes::{BufMut, BytesMut};

use super::{
    decode, Packet, AUTH_ACCEPTED_TYPE, AUTH_PACKET_ID, COMPLETION_MARKER, EMPTY_PACKET_ID,
    MIN_PACKET_SIZE, PACKET_TYPE_RESPONSE, PACKET_TYPE_SERVER_PUSH,
};

/// Default upper bound for a single declared packet (10 MB)
pub const DEFAULT_MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// Items produced from the inbound byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// All fragments of the in-flight command reply, concatenated
    Response(String),
    /// An unsolicited server log line
    Push(String),
    /// The server accepted the password
    Authenticated,
}

/// Turns a byte stream into [`Inbound`] items.
///
/// Holds the raw buffer of not-yet-framed bytes and the body accumulated
/// for the command currently awaiting its completion marker.
#[derive(Debug)]
pub struct Reassembler {
    buf: BytesMut,
    body: String,
    max_packet_size: usize,
}

impl Reassembler {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            body: String::new(),
            max_packet_size,
        }
    }

    /// Feed bytes in arrival order and collect everything they complete
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Inbound> {
        let mut out = Vec::new();
        for &byte in bytes {
            self.push_byte(byte, &mut out);
        }
        out
    }

    /// Number of buffered bytes not yet framed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Reply body accumulated so far for the in-flight command
    pub fn pending_body(&self) -> &str {
        &self.body
    }

    fn push_byte(&mut self, byte: u8, out: &mut Vec<Inbound>) {
        self.buf.put_u8(byte);

        if self.buf.len() < COMPLETION_MARKER.len() {
            return;
        }

        if self.buf[..COMPLETION_MARKER.len()] == COMPLETION_MARKER {
            tracing::trace!("Completion marker, reply is {} bytes", self.body.len());
            out.push(Inbound::Response(std::mem::take(&mut self.body)));
            self.buf.clear();
            return;
        }

        let declared = i32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        let total = i64::from(declared) + 4;

        if total < MIN_PACKET_SIZE as i64 || total > self.max_packet_size as i64 {
            tracing::warn!(
                "Discarding {} buffered bytes: declared packet size {} is out of range",
                self.buf.len(),
                declared
            );
            self.buf.clear();
            return;
        }

        if self.buf.len() as i64 == total {
            let frame = self.buf.split_to(total as usize);
            match decode(&frame) {
                Ok(packet) => self.dispatch(packet, out),
                Err(e) => tracing::warn!("Dropping packet: {}", e),
            }
        }
    }

    fn dispatch(&mut self, packet: Packet, out: &mut Vec<Inbound>) {
        match (packet.packet_type, packet.id) {
            (PACKET_TYPE_RESPONSE, id) if id != AUTH_PACKET_ID && id != EMPTY_PACKET_ID => {
                self.body.push_str(&packet.body);
            }
            (PACKET_TYPE_SERVER_PUSH, _) => out.push(Inbound::Push(packet.body)),
            (AUTH_ACCEPTED_TYPE, AUTH_PACKET_ID) => out.push(Inbound::Authenticated),
            (packet_type, id) => {
                tracing::trace!("Ignoring packet id={} type={}", id, packet_type);
            }
        }
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode, EXECUTE_COMMAND_ID, PACKET_TYPE_COMMAND};

    /// What the server sends after answering the sentinel empty command
    fn completion() -> Vec<u8> {
        let mut bytes = encode(PACKET_TYPE_RESPONSE, EMPTY_PACKET_ID, "").to_vec();
        bytes.extend_from_slice(&COMPLETION_MARKER);
        bytes
    }

    fn response(body: &str) -> Vec<u8> {
        encode(PACKET_TYPE_RESPONSE, EXECUTE_COMMAND_ID, body).to_vec()
    }

    #[test]
    fn test_multi_packet_response() {
        let parts = ["ID: 0 | Name: a\n", "ID: 1 | Name: b\n", "ID: 2 | Name: c"];
        let mut stream = Vec::new();
        for part in &parts {
            stream.extend(response(part));
        }
        stream.extend(completion());

        let mut reassembler = Reassembler::default();
        let items = reassembler.feed(&stream);

        assert_eq!(items, vec![Inbound::Response(parts.concat())]);
        assert_eq!(reassembler.buffered(), 0);
        assert_eq!(reassembler.pending_body(), "");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut stream = response("first ");
        stream.extend(response("second"));
        stream.extend(completion());

        let mut reassembler = Reassembler::default();
        let mut items = Vec::new();
        for byte in stream {
            items.extend(reassembler.feed(&[byte]));
        }

        assert_eq!(items, vec![Inbound::Response("first second".to_string())]);
    }

    #[test]
    fn test_push_between_fragments() {
        let mut stream = response("part one, ");
        stream.extend(encode(PACKET_TYPE_SERVER_PUSH, 0, "[ChatAll] hello").to_vec());
        stream.extend(response("part two"));
        stream.extend(completion());

        let items = Reassembler::default().feed(&stream);

        assert_eq!(
            items,
            vec![
                Inbound::Push("[ChatAll] hello".to_string()),
                Inbound::Response("part one, part two".to_string()),
            ]
        );
    }

    #[test]
    fn test_authentication() {
        let mut stream = encode(PACKET_TYPE_RESPONSE, AUTH_PACKET_ID, "").to_vec();
        stream.extend(encode(AUTH_ACCEPTED_TYPE, AUTH_PACKET_ID, "").to_vec());

        let items = Reassembler::default().feed(&stream);
        assert_eq!(items, vec![Inbound::Authenticated]);
    }

    #[test]
    fn test_rejected_password_is_not_authentication() {
        let stream = encode(AUTH_ACCEPTED_TYPE, -1, "").to_vec();
        assert!(Reassembler::default().feed(&stream).is_empty());
    }

    #[test]
    fn test_echoed_commands_are_ignored() {
        let stream = encode(PACKET_TYPE_COMMAND, EXECUTE_COMMAND_ID, "noise").to_vec();
        let mut reassembler = Reassembler::default();
        assert!(reassembler.feed(&stream).is_empty());
        assert_eq!(reassembler.pending_body(), "");
    }

    #[test]
    fn test_empty_response_body() {
        let items = Reassembler::default().feed(&completion());
        assert_eq!(items, vec![Inbound::Response(String::new())]);
    }

    #[test]
    fn test_partial_packet_stays_buffered() {
        let stream = response("incomplete");
        let mut reassembler = Reassembler::default();

        assert!(reassembler.feed(&stream[..stream.len() - 1]).is_empty());
        assert_eq!(reassembler.buffered(), stream.len() - 1);

        reassembler.feed(&stream[stream.len() - 1..]);
        assert_eq!(reassembler.buffered(), 0);
        assert_eq!(reassembler.pending_body(), "incomplete");
    }

    #[test]
    fn test_out_of_range_size_is_discarded() {
        let mut reassembler = Reassembler::new(1024);

        let mut oversized = Vec::new();
        oversized.extend_from_slice(&4096i32.to_le_bytes());
        oversized.extend_from_slice(&[0, 0, 0]);
        assert!(reassembler.feed(&oversized).is_empty());
        assert_eq!(reassembler.buffered(), 0);

        let undersized = [2, 0, 0, 0, 0, 0, 0];
        assert!(reassembler.feed(&undersized).is_empty());
        assert_eq!(reassembler.buffered(), 0);

        let mut stream = response("after resync");
        stream.extend(completion());
        assert_eq!(
            reassembler.feed(&stream),
            vec![Inbound::Response("after resync".to_string())]
        );
    }

    #[test]
    fn test_consecutive_responses() {
        let mut stream = response("one");
        stream.extend(completion());
        stream.extend(response("two"));
        stream.extend(completion());

        let items = Reassembler::default().feed(&stream);
        assert_eq!(
            items,
            vec![
                Inbound::Response("one".to_string()),
                Inbound::Response("two".to_string()),
            ]
        );
    }
}
