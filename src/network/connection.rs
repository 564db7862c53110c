//! Connection state and close classification

use std::io;

use thiserror::Error;

/// Why a live connection stopped reading
#[derive(Error, Debug)]
pub enum CloseError {
    /// The server reset or dropped the connection, usually after a bad password
    #[error("Connection reset by server (check the RCON password): {0}")]
    Reset(#[source] io::Error),

    #[error("Connection lost: {0}")]
    Lost(#[source] io::Error),

    #[error("Connection closed: {0}")]
    Unknown(#[source] io::Error),
}

impl CloseError {
    /// Sort a read error into reset, lost or unknown
    pub fn classify(error: io::Error) -> Self {
        use io::ErrorKind::*;

        match error.kind() {
            ConnectionReset | UnexpectedEof | PermissionDenied => CloseError::Reset(error),
            ConnectionAborted | ConnectionRefused | NotConnected | BrokenPipe | TimedOut
            | AddrNotAvailable | HostUnreachable | NetworkUnreachable => CloseError::Lost(error),
            _ => CloseError::Unknown(error),
        }
    }

    /// The underlying I/O error
    pub fn io_error(&self) -> &io::Error {
        match self {
            CloseError::Reset(e) | CloseError::Lost(e) | CloseError::Unknown(e) => e,
        }
    }
}

/// State of a connection. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    /// Not yet connected
    Disconnected,
    /// TCP connection established, password sent
    Connected,
    /// Server accepted the password
    Authenticated,
    /// Reader stopped; terminal
    Closed,
}

impl ConnectionState {
    /// Whether commands can currently be answered
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_read_errors() {
        let reset = CloseError::classify(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(reset, CloseError::Reset(_)));

        let eof = CloseError::classify(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(eof, CloseError::Reset(_)));

        let lost = CloseError::classify(io::Error::from(io::ErrorKind::ConnectionAborted));
        assert!(matches!(lost, CloseError::Lost(_)));

        let unreachable = CloseError::classify(io::Error::from(io::ErrorKind::HostUnreachable));
        assert!(matches!(unreachable, CloseError::Lost(_)));

        let other = CloseError::classify(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(matches!(other, CloseError::Unknown(_)));
        assert_eq!(other.io_error().kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_state_order() {
        assert!(ConnectionState::Disconnected < ConnectionState::Connected);
        assert!(ConnectionState::Connected < ConnectionState::Authenticated);
        assert!(ConnectionState::Authenticated < ConnectionState::Closed);
        assert!(ConnectionState::Authenticated.is_active());
        assert!(!ConnectionState::Closed.is_active());
    }
}
