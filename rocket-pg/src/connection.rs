//! Postgres connection.
//!
//! [`Protocol`] is the connection state machine without io,
//! [`Connection`] drives it over an async stream.
mod config;
mod state;
mod error;
mod protocol;
#[cfg(feature = "tokio")]
mod driver;
#[cfg(test)]
mod mock;

pub use config::{Config, ParseError};
pub use state::{ConnectionState, Event};
pub use error::{AuthError, ConnectionClosed, UsageError};
pub use protocol::Protocol;
#[cfg(feature = "tokio")]
pub use driver::Connection;
