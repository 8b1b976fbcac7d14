use std::fmt;

use super::ConnectionState;
use crate::postgres::ProtocolError;

/// An operation invoked in the wrong connection state.
#[derive(Clone)]
pub enum UsageError {
    InvalidState {
        op: &'static str,
        state: ConnectionState,
    },
    /// Query string can not be sent as nul terminated string.
    NulInQuery,
    /// Query string length overflows the message length field.
    QueryTooLarge(usize),
}

impl UsageError {
    pub(crate) fn invalid_state(op: &'static str, state: ConnectionState) -> UsageError {
        Self::InvalidState { op, state }
    }
}

impl std::error::Error for UsageError { }

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { op, state } => write!(f, "cannot {op} while connection is {state}"),
            Self::NulInQuery => f.write_str("query string contains a nul byte"),
            Self::QueryTooLarge(len) => write!(f, "query string of {len} bytes is too large for a message"),
        }
    }
}

impl fmt::Debug for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// An error during authentication exchange.
#[derive(Clone)]
pub enum AuthError {
    /// Authentication message can not be decoded.
    Malformed(ProtocolError),
    /// Server requested authentication method other than trust.
    Unsupported(&'static str),
}

impl std::error::Error for AuthError { }

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed authentication message: {e}"),
            Self::Unsupported(method) => write!(f, "unsupported authentication method: {method}"),
        }
    }
}

impl fmt::Debug for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Operation failed because the connection was closed.
#[derive(Clone)]
pub struct ConnectionClosed;

impl std::error::Error for ConnectionClosed { }

impl fmt::Display for ConnectionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection closed")
    }
}

impl fmt::Debug for ConnectionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
