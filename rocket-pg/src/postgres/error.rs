//! Protocol error
use std::fmt;

use super::BackendMessage;

/// An error when translating bytes from postgres.
///
/// Every `ProtocolError` is fatal to the connection, the stream can no longer
/// be trusted to be aligned at a message boundary.
#[derive(Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A message arrived that is not valid at this point.
    ///
    /// With `expect` and `phase` both `None`, the message type itself is unknown.
    Unexpected {
        expect: Option<u8>,
        found: u8,
        phase: Option<&'static str>,
    },
    /// A message header declared a length smaller than the length field itself.
    InvalidLength {
        msgtype: u8,
        len: u32,
    },
    /// A message body does not match its documented layout.
    Malformed {
        msgtype: u8,
        reason: &'static str,
    },
    /// An `Authentication` message with an undocumented code.
    UnknownAuth {
        auth: u32,
    },
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::Unexpected { expect, found, phase } => {
                let name = BackendMessage::message_name(found);
                match expect {
                    Some(m) => write!(
                        f,
                        "Expected message `{}` found `{name}`",
                        BackendMessage::message_name(m),
                    )?,
                    None if phase.is_none() => {
                        write!(f, "Unknown message type `{}`", found.escape_ascii())?
                    },
                    None => write!(f, "Unexpected message `{name}`")?,
                }
                if let Some(phase) = phase {
                    write!(f, " in `{phase}`")?
                }
                Ok(())
            },
            ProtocolError::InvalidLength { msgtype, len } => write!(
                f,
                "Invalid length {len} for message `{}`, must be at least 4",
                BackendMessage::message_name(msgtype),
            ),
            ProtocolError::Malformed { msgtype, reason } => write!(
                f,
                "Malformed `{}` message: {reason}",
                BackendMessage::message_name(msgtype),
            ),
            ProtocolError::UnknownAuth { auth } => write!(f, "Unknown authentication code {auth}"),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl ProtocolError {
    pub(crate) fn unknown(found: u8) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: None }
    }

    pub(crate) fn unexpected(expect: u8, found: u8) -> ProtocolError {
        Self::Unexpected { expect: Some(expect), found, phase: None }
    }

    pub(crate) fn unexpected_phase(found: u8, phase: &'static str) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: Some(phase) }
    }

    pub(crate) fn invalid_length(msgtype: u8, len: u32) -> ProtocolError {
        Self::InvalidLength { msgtype, len }
    }

    pub(crate) fn malformed(msgtype: u8, reason: &'static str) -> ProtocolError {
        Self::Malformed { msgtype, reason }
    }

    pub(crate) fn unknown_auth(auth: u32) -> ProtocolError {
        Self::UnknownAuth { auth }
    }
}
