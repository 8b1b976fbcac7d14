use std::{future::poll_fn, pin::Pin};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{Config, ConnectionClosed, ConnectionState, Event, Protocol};
use crate::{
    Result,
    common::verbose,
    io,
    net::Socket,
    postgres::{TransactionStatus, backend::BackendKeyData},
    query::QueryResult,
    transport::Connect,
};

/// Minimum spare capacity reserved before each read.
const READ_RESERVE: usize = 1024;

/// Postgres connection over an async stream.
///
/// Methods take `&mut self`, one operation is in flight at a time.
#[derive(Debug)]
pub struct Connection<S = Socket> {
    proto: Protocol,
    stream: Option<S>,
}

impl Connection {
    /// Create disconnected connection over [`Socket`].
    pub fn new(config: Config) -> Self {
        Self::with_config(config)
    }

    /// Connect using config from environment variable.
    ///
    /// See [`Config::from_env`].
    pub async fn connect_env() -> Result<Self> {
        let mut conn = Self::new(Config::from_env());
        conn.connect().await?;
        Ok(conn)
    }
}

impl<S: Connect> Connection<S> {
    /// Open the transport and perform the startup handshake.
    pub async fn connect(&mut self) -> Result<()> {
        self.proto.connect()?;
        match S::connect(self.proto.config()).await {
            Ok(stream) => self.stream = Some(stream),
            Err(err) => self.proto.on_error(err),
        }
        self.handshake().await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create disconnected connection over any stream type.
    pub fn with_config(config: Config) -> Self {
        Self { proto: Protocol::new(config), stream: None }
    }

    /// Perform the startup handshake over already established `stream`.
    pub async fn connect_stream(&mut self, stream: S) -> Result<()> {
        self.proto.connect()?;
        self.stream = Some(stream);
        self.handshake().await
    }

    /// Execute a simple query.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.proto.query(sql)?;
        self.drive(Protocol::take_query_result).await
    }

    /// Force close the transport.
    ///
    /// An in flight query fails with [`ConnectionClosed`].
    pub async fn disconnect(&mut self) -> Result<()> {
        self.proto.disconnect()?;
        self.close().await;
        Ok(())
    }

    /// Send `Terminate` and close the transport.
    pub async fn end(&mut self) -> Result<()> {
        self.proto.end()?;
        self.flush().await;
        self.close().await;
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.proto.state()
    }

    /// Returns the next lifecycle event, if any.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.proto.poll_event()
    }

    /// Value of a server reported run-time parameter, e.g. `server_version`.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.proto.parameter(name)
    }

    pub fn backend_key_data(&self) -> Option<BackendKeyData> {
        self.proto.backend_key_data()
    }

    pub fn transaction_status(&self) -> TransactionStatus {
        self.proto.transaction_status()
    }

    /// The underlying state machine.
    pub fn protocol(&self) -> &Protocol {
        &self.proto
    }

    async fn handshake(&mut self) -> Result<()> {
        if self.stream.is_some() {
            self.proto.on_connected();
        }
        self.drive(Protocol::take_connect_result).await
    }

    /// Flush and read until `take` yields an outcome and the server is synchronized.
    async fn drive<T>(&mut self, mut take: impl FnMut(&mut Protocol) -> Option<Result<T>>) -> Result<T> {
        let mut outcome = None;
        loop {
            self.flush().await;

            if self.proto.wants_close() {
                self.close().await;
            }

            if outcome.is_none() {
                outcome = take(&mut self.proto);
            }

            match outcome.take() {
                Some(Err(err)) => return Err(err),
                Some(Ok(ok)) if self.is_settled() => return self.survived(ok),
                pending => outcome = pending,
            }

            self.read().await?;
        }
    }

    /// Returns `false` while a `ReadyForQuery` is owed on a live session.
    fn is_settled(&self) -> bool {
        self.proto.state() != ConnectionState::Ready || self.proto.is_synchronized()
    }

    /// `ok` if the session outlived the owed `ReadyForQuery`, the cause of its end otherwise.
    fn survived<T>(&self, ok: T) -> Result<T> {
        if self.proto.state() == ConnectionState::Ready {
            return Ok(ok);
        }
        match self.proto.failure() {
            Some(kind) => Err(kind.clone().into()),
            None => Err(ConnectionClosed.into()),
        }
    }

    async fn read(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ConnectionClosed.into());
        };

        let buf = self.proto.read_buf();
        buf.reserve(READ_RESERVE);

        let read = poll_fn(|cx| io::poll_read(stream, buf, cx)).await;
        match read {
            Ok(0) => {
                verbose!("end of stream");
                self.stream = None;
                self.proto.on_close();
            },
            Ok(_n) => {
                verbose!(n = _n, "read");
                self.proto.on_read();
            },
            Err(err) => self.proto.on_error(err),
        }

        Ok(())
    }

    async fn flush(&mut self) {
        let output = self.proto.output_mut();
        if output.is_empty() {
            return;
        }

        let Some(stream) = self.stream.as_mut() else {
            output.clear();
            return;
        };

        let mut result = poll_fn(|cx| io::poll_write_all(stream, output, cx)).await;
        if result.is_ok() {
            result = poll_fn(|cx| Pin::new(&mut *stream).poll_flush(cx)).await;
        }

        if let Err(err) = result {
            self.proto.on_error(err);
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(_err) = poll_fn(|cx| Pin::new(&mut stream).poll_shutdown(cx)).await {
                verbose!(%_err, "shutdown failed");
            }
        }
        self.proto.on_close();
    }
}

#[cfg(test)]
mod test {
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf, duplex};

    use super::*;
    use crate::{ErrorKind, connection::mock::*};

    async fn read_startup(server: &mut DuplexStream) -> Vec<u8> {
        let len = server.read_u32().await.unwrap();
        let mut body = vec![0; len as usize - 4];
        server.read_exact(&mut body).await.unwrap();
        body
    }

    async fn read_message(server: &mut DuplexStream) -> (u8, Vec<u8>) {
        let msgtype = server.read_u8().await.unwrap();
        let len = server.read_u32().await.unwrap();
        let mut body = vec![0; len as usize - 4];
        server.read_exact(&mut body).await.unwrap();
        (msgtype, body)
    }

    /// Accept startup and reply as a trust authenticated server.
    async fn handshake(server: &mut DuplexStream) {
        let startup = read_startup(server).await;
        assert_eq!(&startup[..4], &196_608u32.to_be_bytes());
        assert!(startup.ends_with(b"user\0alice\0database\0db1\0\0"));

        let mut reply = auth_ok();
        reply.extend(parameter_status("server_version", "16.2"));
        reply.extend(frame(b'K', &[0, 0, 0, 1, 0, 0, 0, 2]));
        reply.extend(ready_for_query(b'I'));
        server.write_all(&reply).await.unwrap();
    }

    fn connection() -> Connection<DuplexStream> {
        Connection::with_config(Config::default().user("alice").dbname("db1"))
    }

    fn events<S: AsyncRead + AsyncWrite + Unpin>(conn: &mut Connection<S>) -> Vec<Event> {
        std::iter::from_fn(|| conn.poll_event()).collect()
    }

    #[tokio::test]
    async fn connect_query_end() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            handshake(&mut server).await;

            let (msgtype, body) = read_message(&mut server).await;
            assert_eq!(msgtype, b'Q');
            assert_eq!(body, b"SELECT 1\0");

            let mut reply = row_description(&["x"]);
            reply.extend(data_row(&[Some("1")]));
            reply.extend(command_complete("SELECT 1"));
            reply.extend(ready_for_query(b'I'));
            server.write_all(&reply).await.unwrap();

            let (msgtype, body) = read_message(&mut server).await;
            assert_eq!(msgtype, b'X');
            assert!(body.is_empty());
            assert_eq!(server.read(&mut [0; 8]).await.unwrap(), 0);
        });

        let mut conn = connection();
        conn.connect_stream(client).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Ready);
        assert_eq!(conn.parameter("server_version"), Some("16.2"));
        assert_eq!(conn.backend_key_data().unwrap().process_id, 1);
        assert_eq!(conn.transaction_status(), TransactionStatus::Idle);

        let result = conn.query("SELECT 1").await.unwrap();
        assert_eq!(result.columns[0].name, "x");
        assert_eq!(result.rows[0][0], "1");
        assert_eq!(result.command_tag, "SELECT 1");

        conn.end().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(events(&mut conn)[..], [Event::Connect, Event::Disconnect]));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn query_error_recovers() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            handshake(&mut server).await;

            read_message(&mut server).await;
            let mut reply = error_response("ERROR", "42601", "syntax error at or near \"SELEC\"");
            reply.extend(ready_for_query(b'I'));
            server.write_all(&reply).await.unwrap();

            let (_, body) = read_message(&mut server).await;
            assert_eq!(body, b"SELECT 2\0");
            let mut reply = row_description(&["?column?"]);
            reply.extend(data_row(&[Some("2")]));
            reply.extend(command_complete("SELECT 1"));
            reply.extend(ready_for_query(b'I'));
            server.write_all(&reply).await.unwrap();
            server
        });

        let mut conn = connection();
        conn.connect_stream(client).await.unwrap();

        let err = conn.query("SELEC 1").await.unwrap_err();
        let ErrorKind::Database(db) = err.kind() else {
            panic!("expected database error, found {err}");
        };
        assert_eq!(db.code, "42601");
        assert_eq!(conn.state(), ConnectionState::Ready);

        let result = conn.query("SELECT 2").await.unwrap();
        assert_eq!(result.rows[0][0], "2");

        let _server = server.await.unwrap();
    }

    #[tokio::test]
    async fn server_close_fails_query() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            handshake(&mut server).await;
            read_message(&mut server).await;
        });

        let mut conn = connection();
        conn.connect_stream(client).await.unwrap();

        let err = conn.query("SELECT pg_sleep(10)").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(_)));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(events(&mut conn)[..], [Event::Connect, Event::Disconnect]));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn unsupported_auth_closes() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            read_startup(&mut server).await;
            server.write_all(&frame(b'R', &[0, 0, 0, 5, 1, 2, 3, 4])).await.unwrap();
            assert_eq!(server.read(&mut [0; 8]).await.unwrap(), 0);
        });

        let mut conn = connection();
        let err = conn.connect_stream(client).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(_)));
        assert!(err.is_fatal());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(events(&mut conn)[..], [Event::Error(ErrorKind::Auth(_)), Event::Disconnect]));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn double_disconnect() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            handshake(&mut server).await;
            assert_eq!(server.read(&mut [0; 8]).await.unwrap(), 0);
        });

        let mut conn = connection();
        conn.connect_stream(client).await.unwrap();

        conn.disconnect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let err = conn.disconnect().await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Usage(_)));

        let err = conn.query("SELECT 1").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Usage(_)));

        assert!(matches!(events(&mut conn)[..], [Event::Connect, Event::Disconnect]));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn fatal_after_auth_ok_fails_connect() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            read_startup(&mut server).await;
            let mut reply = auth_ok();
            reply.extend(error_response("FATAL", "3D000", "database \"db1\" does not exist"));
            server.write_all(&reply).await.unwrap();
        });

        let mut conn = connection();
        let err = conn.connect_stream(client).await.unwrap_err();
        let ErrorKind::Database(db) = err.kind() else {
            panic!("expected database error, found {err}");
        };
        assert_eq!(db.code, "3D000");
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(
            events(&mut conn)[..],
            [Event::Connect, Event::Error(ErrorKind::Database(_)), Event::Disconnect]
        ));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn close_after_auth_ok_fails_connect() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            read_startup(&mut server).await;
            server.write_all(&auth_ok()).await.unwrap();
        });

        let mut conn = connection();
        let err = conn.connect_stream(client).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(_)));
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn fatal_after_command_complete_fails_query() {
        let (client, mut server) = duplex(4096);

        let server = tokio::spawn(async move {
            handshake(&mut server).await;
            read_message(&mut server).await;

            let mut reply = row_description(&["x"]);
            reply.extend(data_row(&[Some("1")]));
            reply.extend(command_complete("SELECT 1"));
            reply.extend(error_response("FATAL", "57P01", "terminating connection due to administrator command"));
            server.write_all(&reply).await.unwrap();
        });

        let mut conn = connection();
        conn.connect_stream(client).await.unwrap();

        let err = conn.query("SELECT 1").await.unwrap_err();
        let ErrorKind::Database(db) = err.kind() else {
            panic!("expected database error, found {err}");
        };
        assert_eq!(db.code, "57P01");
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn write_error_fails_connect() {
        let (client, server) = duplex(4096);
        drop(server);

        let mut conn = connection();
        let err = conn.connect_stream(client).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(events(&mut conn)[..], [Event::Error(ErrorKind::Io(_)), Event::Disconnect]));
    }

    /// Accepts every write, fails every read.
    struct ResetOnRead;

    impl AsyncRead for ResetOnRead {
        fn poll_read(self: Pin<&mut Self>, _: &mut Context<'_>, _: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    impl AsyncWrite for ResetOnRead {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn read_error_fails_connect() {
        let mut conn = Connection::with_config(Config::default().user("alice"));
        let err = conn.connect_stream(ResetOnRead).await.unwrap_err();
        let ErrorKind::Io(io) = err.kind() else {
            panic!("expected io error, found {err}");
        };
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(events(&mut conn)[..], [Event::Error(ErrorKind::Io(_)), Event::Disconnect]));
    }
}
