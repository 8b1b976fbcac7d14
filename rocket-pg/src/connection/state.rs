use std::fmt;

use crate::ErrorKind;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, [`connect`][crate::Protocol::connect] is allowed.
    Disconnected,
    /// Waiting for the transport to be established.
    Connecting,
    /// Startup message sent, waiting for authentication result.
    Authenticating,
    /// Idle, a query can be sent.
    Ready,
    /// A query is in flight.
    Busy,
    /// A fatal error occured, waiting for the transport to close.
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection lifecycle notification.
#[derive(Debug, Clone)]
pub enum Event {
    /// Authentication succeeded.
    Connect,
    /// The connection is closed.
    Disconnect,
    /// A fatal error occured, the connection will be closed.
    Error(ErrorKind),
}
