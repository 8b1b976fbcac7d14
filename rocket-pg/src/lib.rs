//! Postgres Driver
//!
//! A client of the postgres v3 wire protocol, speaking the simple query
//! protocol over tcp or unix socket.
//!
//! The protocol itself is implemented without io in [`Protocol`], the
//! [`Connection`] drives it over a tokio stream.
//!
//! # Examples
//!
//! ```no_run
//! use rocket_pg::Connection;
//!
//! # async fn app() -> rocket_pg::Result<()> {
//! let mut conn = Connection::connect_env().await?;
//!
//! let res = conn.query("SELECT 420, 'Foo'").await?;
//!
//! assert_eq!(res.rows[0][0], "420");
//! assert_eq!(res.rows[0][1], "Foo");
//! assert_eq!(res.command_tag, "SELECT 1");
//!
//! conn.end().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Without io:
//!
//! ```
//! use rocket_pg::{Config, ConnectionState, Protocol};
//!
//! let mut proto = Protocol::new(Config::default().user("alice"));
//! proto.connect().unwrap();
//! proto.on_connected();
//!
//! // send startup message to the server
//! let startup = proto.take_output();
//! # assert!(!startup.is_empty());
//!
//! // AuthenticationOk
//! proto.on_data(&[b'R', 0, 0, 0, 8, 0, 0, 0, 0]);
//! assert_eq!(proto.state(), ConnectionState::Ready);
//! ```

pub mod common;
mod ext;

// Protocol
pub mod postgres;
pub mod decoder;

// Component
mod value;
pub mod row;
pub mod query;

// Connection
pub mod connection;

// Io
#[cfg(feature = "tokio")]
mod io;
#[cfg(feature = "tokio")]
pub mod net;
#[cfg(feature = "tokio")]
pub mod transport;

mod error;


pub use common::ByteStr;
pub use decoder::{Frame, FrameDecoder};
pub use value::Value;
pub use row::{Row, Column};
pub use query::QueryResult;

pub use connection::{Config, ConnectionState, Event, Protocol};
#[cfg(feature = "tokio")]
pub use connection::Connection;
pub use error::{Error, ErrorKind, Result};
