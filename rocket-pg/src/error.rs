//! `rocket-pg` error types.
use std::{backtrace::Backtrace, fmt, io, sync::Arc};

use crate::{
    connection::{AuthError, ConnectionClosed, ParseError, UsageError},
    postgres::{ErrorResponse, ProtocolError},
    query::EmptyQueryError,
};

/// A specialized [`Result`] type for `rocket-pg` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `rocket-pg` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Add context which is displayed before the error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns `true` if the connection can not be used anymore.
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

/// All possible error kind from `rocket-pg` library.
#[derive(Clone)]
pub enum ErrorKind {
    /// Malformed connection url.
    Config(ParseError),
    /// Operation invoked in the wrong connection state.
    Usage(UsageError),
    /// Framing or decoding violation.
    Protocol(ProtocolError),
    /// Malformed or unsupported authentication request.
    Auth(AuthError),
    /// Error reported by the server.
    Database(ErrorResponse),
    /// Underlying transport failure.
    Io(Arc<io::Error>),
    /// Pending operation failed because the connection was closed.
    Closed(ConnectionClosed),
    /// Query string was empty.
    EmptyQuery(EmptyQueryError),
}

impl ErrorKind {
    /// Returns `true` if this error always terminates the connection.
    ///
    /// [`ErrorKind::Database`] is fatal only outside of a query, which is
    /// decided by the connection rather than the error itself, see
    /// [`ErrorResponse::is_fatal`] for the server side view.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Protocol(_) | Self::Auth(_) | Self::Io(_) | Self::Closed(_) => true,
            Self::Database(e) => e.is_fatal(),
            Self::Config(_) | Self::Usage(_) | Self::EmptyQuery(_) => false,
        }
    }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<UsageError>e => ErrorKind::Usage(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<AuthError>e => ErrorKind::Auth(e));
from!(<ErrorResponse>e => ErrorKind::Database(e));
from!(<std::io::Error>e => ErrorKind::Io(Arc::new(e)));
from!(<ConnectionClosed>e => ErrorKind::Closed(e));
from!(<EmptyQueryError>e => ErrorKind::EmptyQuery(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => fmt::Display::fmt(e, f),
            Self::Usage(e) => fmt::Display::fmt(e, f),
            Self::Protocol(e) => fmt::Display::fmt(e, f),
            Self::Auth(e) => fmt::Display::fmt(e, f),
            Self::Database(e) => fmt::Display::fmt(e, f),
            Self::Io(e) => fmt::Display::fmt(e, f),
            Self::Closed(e) => fmt::Display::fmt(e, f),
            Self::EmptyQuery(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
