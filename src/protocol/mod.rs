//! Protocol module - Defines the RCON wire protocol
//!
//! Every packet uses the same little-endian layout:
//! - 4 bytes size (byte count of everything after this field)
//! - 4 bytes id
//! - 4 bytes type
//! - Variable length body followed by two NUL bytes

mod codec;
mod reassembler;

pub use codec::*;
pub use reassembler::*;

/// Packet type carrying the password
pub const PACKET_TYPE_AUTH: i32 = 0x03;
/// Packet type for client commands
pub const PACKET_TYPE_COMMAND: i32 = 0x02;
/// Packet type for unsolicited server log lines
pub const PACKET_TYPE_SERVER_PUSH: i32 = 0x01;
/// Packet type for command replies
pub const PACKET_TYPE_RESPONSE: i32 = 0x00;

/// The server acknowledges a good password with this type on the auth id.
/// It shares its value with `PACKET_TYPE_COMMAND` but means nothing else.
pub const AUTH_ACCEPTED_TYPE: i32 = 2;

/// Id of the trailing sentinel command sent after every real command
pub const EMPTY_PACKET_ID: i32 = 100;
/// Id of the authentication packet
pub const AUTH_PACKET_ID: i32 = 101;
/// Id used for every executed command
pub const EXECUTE_COMMAND_ID: i32 = 50;

/// Raw buffer prefix that terminates a multi-packet command response
pub const COMPLETION_MARKER: [u8; 7] = [0, 1, 0, 0, 0, 0, 0];

/// Default RCON port for Squad servers
pub const DEFAULT_PORT: u16 = 21114;
