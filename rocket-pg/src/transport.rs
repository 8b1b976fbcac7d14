//! The [`Connect`] trait.
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Config, net::Socket};

/// A byte stream which can be opened from a [`Config`].
///
/// Any `AsyncRead + AsyncWrite` stream can be used with
/// [`Connection::connect_stream`][crate::Connection::connect_stream],
/// `Connect` is only required by [`Connection::connect`][crate::Connection::connect].
pub trait Connect: AsyncRead + AsyncWrite + Unpin + Sized {
    fn connect(config: &Config) -> impl Future<Output = io::Result<Self>>;
}

impl Connect for Socket {
    async fn connect(config: &Config) -> io::Result<Self> {
        Socket::connect(config).await
    }
}
