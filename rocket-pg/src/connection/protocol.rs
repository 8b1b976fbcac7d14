//! Sans-io connection state machine.
//!
//! [`Protocol`] never touches a socket. The transport reports what happened
//! with [`on_connected`][Protocol::on_connected], [`on_data`][Protocol::on_data],
//! [`on_error`][Protocol::on_error] and [`on_close`][Protocol::on_close],
//! and drains the bytes to send with [`take_output`][Protocol::take_output].
use bytes::{Bytes, BytesMut};
use std::{collections::{HashMap, VecDeque}, io, mem, sync::Arc};

use super::{AuthError, Config, ConnectionClosed, ConnectionState, Event, UsageError};
use crate::{
    ErrorKind, Result,
    common::{ByteStr, span, verbose},
    decoder::{Frame, FrameDecoder},
    postgres::{
        BackendMessage, BackendProtocol, NoticeResponse, TransactionStatus,
        backend::{Authentication, BackendKeyData, ErrorResponse},
        frontend::{self, Query, Terminate},
    },
    query::{EmptyQueryError, QueryExecutor, QueryResult},
};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Outcome slot of one operation category.
#[derive(Debug)]
enum Pending<T> {
    Idle,
    InFlight,
    Done(Result<T>),
}

impl<T> Pending<T> {
    fn resolve(&mut self, result: Result<T>) {
        if let Pending::InFlight = self {
            *self = Pending::Done(result);
        }
    }

    fn reject(&mut self, kind: &ErrorKind) {
        self.resolve(Err(kind.clone().into()));
    }

    fn take(&mut self) -> Option<Result<T>> {
        match mem::replace(self, Pending::Idle) {
            Pending::Done(result) => Some(result),
            other => {
                *self = other;
                None
            },
        }
    }
}

/// Postgres client protocol state machine.
#[derive(Debug)]
pub struct Protocol {
    config: Config,
    state: ConnectionState,
    decoder: FrameDecoder,
    write_buf: BytesMut,

    handshake: Pending<()>,
    query: Pending<QueryResult>,
    executor: QueryExecutor,
    events: VecDeque<Event>,

    /// `ReadyForQuery` the server still owes, one after startup and one per query.
    owed_ready: u32,
    /// Cause of the latest fatal error, cleared by `connect`.
    failure: Option<ErrorKind>,
    close_requested: bool,

    parameters: HashMap<ByteStr, ByteStr>,
    backend_key: Option<BackendKeyData>,
    transaction: TransactionStatus,
}

impl Protocol {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            decoder: FrameDecoder::new(),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            handshake: Pending::Idle,
            query: Pending::Idle,
            executor: QueryExecutor::new(),
            events: VecDeque::new(),
            owed_ready: 0,
            failure: None,
            close_requested: false,
            parameters: HashMap::new(),
            backend_key: None,
            transaction: TransactionStatus::Idle,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Value of a `ParameterStatus` reported by the server, e.g. `server_version`.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(ByteStr::as_str)
    }

    pub fn backend_key_data(&self) -> Option<BackendKeyData> {
        self.backend_key
    }

    /// Transaction status from the latest `ReadyForQuery`.
    pub fn transaction_status(&self) -> TransactionStatus {
        self.transaction
    }

    /// Returns `true` if no `ReadyForQuery` is owed by the server.
    pub fn is_synchronized(&self) -> bool {
        self.owed_ready == 0
    }

    /// Cause of the fatal error that ended the current session, if any.
    pub fn failure(&self) -> Option<&ErrorKind> {
        self.failure.as_ref()
    }

    /// Returns `true` if the transport should be closed.
    pub fn wants_close(&self) -> bool {
        self.close_requested
    }

    pub fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Take the handshake outcome, if resolved.
    pub fn take_connect_result(&mut self) -> Option<Result<()>> {
        self.handshake.take()
    }

    /// Take the in flight query outcome, if resolved.
    pub fn take_query_result(&mut self) -> Option<Result<QueryResult>> {
        self.query.take()
    }

    /// Take all bytes queued for the transport.
    pub fn take_output(&mut self) -> Bytes {
        self.write_buf.split().freeze()
    }

    /// Bytes queued for the transport, consumed by advancing the buffer.
    pub fn output_mut(&mut self) -> &mut BytesMut {
        &mut self.write_buf
    }

    /// Receive arena, for reading from io without intermediate copy.
    ///
    /// Call [`on_read`][Protocol::on_read] after writing into it.
    pub(crate) fn read_buf(&mut self) -> &mut BytesMut {
        self.decoder.buf_mut()
    }

    // ===== Operations =====

    /// Begin a handshake, the transport should be opened afterwards.
    pub fn connect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(UsageError::invalid_state("connect", self.state).into());
        }

        self.decoder.clear();
        self.write_buf.clear();
        self.parameters.clear();
        self.backend_key = None;
        self.transaction = TransactionStatus::Idle;
        self.owed_ready = 0;
        self.failure = None;
        self.close_requested = false;

        self.handshake = Pending::InFlight;
        self.set_state(ConnectionState::Connecting);
        Ok(())
    }

    /// Send a simple query.
    ///
    /// The outcome is available from [`take_query_result`][Protocol::take_query_result].
    pub fn query(&mut self, sql: &str) -> Result<()> {
        if self.state != ConnectionState::Ready {
            return Err(UsageError::invalid_state("query", self.state).into());
        }
        if sql.contains('\0') {
            return Err(UsageError::NulInQuery.into());
        }
        if !Query::fits(sql.len()) {
            return Err(UsageError::QueryTooLarge(sql.len()).into());
        }

        verbose!(sql, "query");
        frontend::write(Query { sql }, &mut self.write_buf);

        self.executor = QueryExecutor::new();
        self.query = Pending::InFlight;
        self.owed_ready += 1;
        self.set_state(ConnectionState::Busy);
        Ok(())
    }

    /// Force close the connection, an in flight query fails with [`ConnectionClosed`].
    pub fn disconnect(&mut self) -> Result<()> {
        if !matches!(self.state, ConnectionState::Ready | ConnectionState::Busy) {
            return Err(UsageError::invalid_state("disconnect", self.state).into());
        }

        self.write_buf.clear();
        self.decoder.clear();
        self.query.reject(&ErrorKind::Closed(ConnectionClosed));
        self.shutdown();
        Ok(())
    }

    /// Gracefully close the connection by sending `Terminate`.
    pub fn end(&mut self) -> Result<()> {
        if self.state != ConnectionState::Ready {
            return Err(UsageError::invalid_state("end", self.state).into());
        }

        frontend::write(Terminate, &mut self.write_buf);
        self.decoder.clear();
        self.shutdown();
        Ok(())
    }

    // ===== Transport notification =====

    /// Transport is established, the startup message is queued.
    pub fn on_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            verbose!(state = %self.state, "connected notification ignored");
            return;
        }

        self.config.startup().write(&mut self.write_buf);
        self.owed_ready = 1;
        self.set_state(ConnectionState::Authenticating);
    }

    /// Bytes received from the transport.
    pub fn on_data(&mut self, bytes: &[u8]) {
        if let ConnectionState::Disconnected | ConnectionState::Error = self.state {
            verbose!(len = bytes.len(), state = %self.state, "data discarded");
            return;
        }
        self.decoder.extend(bytes);
        self.on_read();
    }

    /// Process every complete frame in the receive arena.
    pub(crate) fn on_read(&mut self) {
        loop {
            if let ConnectionState::Disconnected | ConnectionState::Error = self.state {
                self.decoder.clear();
                return;
            }

            match self.decoder.try_extract_frame() {
                Ok(Some(frame)) => self.dispatch(frame),
                Ok(None) => return,
                Err(err) => return self.fatal(ErrorKind::Protocol(err)),
            }
        }
    }

    /// Transport failure.
    pub fn on_error(&mut self, err: io::Error) {
        if let ConnectionState::Disconnected | ConnectionState::Error = self.state {
            verbose!(%err, state = %self.state, "transport error ignored");
            return;
        }
        self.fatal(ErrorKind::Io(Arc::new(err)));
    }

    /// Transport closed, idempotent.
    pub fn on_close(&mut self) {
        self.close_requested = false;
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.decoder.clear();
        self.write_buf.clear();

        let closed = ErrorKind::Closed(ConnectionClosed);
        self.handshake.reject(&closed);
        self.query.reject(&closed);

        self.set_state(ConnectionState::Disconnected);
        self.events.push_back(Event::Disconnect);
    }

    // ===== Dispatch =====

    fn dispatch(&mut self, frame: Frame) {
        span!("dispatch", msgtype = %(frame.msgtype as char), len = frame.body.len());
        verbose!(state = %self.state, "frame received");

        let msgtype = frame.msgtype;
        let message = match BackendMessage::decode(msgtype, frame.body) {
            Ok(ok) => ok,
            Err(err) if msgtype == Authentication::MSGTYPE => {
                return self.fatal(ErrorKind::Auth(AuthError::Malformed(err)))
            },
            Err(err) => return self.fatal(ErrorKind::Protocol(err)),
        };

        if let BackendMessage::ErrorResponse(err) = message {
            return self.error_response(err);
        }

        match self.state {
            ConnectionState::Authenticating => self.authenticate(message),
            ConnectionState::Busy => self.execute(message),
            ConnectionState::Ready => self.idle(message),
            ConnectionState::Connecting => self.fatal(ErrorKind::Protocol(message.unexpected("connecting"))),
            ConnectionState::Disconnected | ConnectionState::Error => {
                verbose!("frame discarded");
            },
        }
    }

    fn error_response(&mut self, err: ErrorResponse) {
        match self.state {
            ConnectionState::Busy => {
                verbose!(%err, "query failed");
                self.query.resolve(Err(err.into()));
                self.set_state(ConnectionState::Ready);
            },
            // failure of the trailing statements of a multi statement query
            ConnectionState::Ready if self.owed_ready > 0 && !err.is_fatal() => {
                #[cfg(feature = "log")]
                log::warn!("error after query completed: {err}");
                verbose!(%err, "trailing error discarded");
            },
            _ => self.fatal(ErrorKind::Database(err)),
        }
    }

    fn authenticate(&mut self, message: BackendMessage) {
        match message {
            BackendMessage::Authentication(Authentication::Ok) => {
                self.handshake.resolve(Ok(()));
                self.set_state(ConnectionState::Ready);
                self.events.push_back(Event::Connect);
            },
            BackendMessage::Authentication(auth) => {
                self.fatal(ErrorKind::Auth(AuthError::Unsupported(auth.method_name())))
            },
            BackendMessage::NegotiateProtocolVersion(_negotiate) => {
                verbose!(minor = _negotiate.minor, "protocol version negotiated");
            },
            BackendMessage::NoticeResponse(notice) => self.notice(notice),
            message => self.fatal(ErrorKind::Protocol(message.unexpected("authentication"))),
        }
    }

    fn execute(&mut self, message: BackendMessage) {
        let Some(message) = self.session(message) else {
            return;
        };

        match message {
            BackendMessage::RowDescription(rd) => {
                if let Err(err) = self.executor.describe(rd) {
                    self.fatal(ErrorKind::Protocol(err));
                }
            },
            BackendMessage::DataRow(dr) => {
                if let Err(err) = self.executor.push_row(dr) {
                    self.fatal(ErrorKind::Protocol(err));
                }
            },
            BackendMessage::CommandComplete(cmd) => {
                verbose!(tag = %cmd.tag, "command complete");
                let result = mem::take(&mut self.executor).complete(cmd);
                self.query.resolve(Ok(result));
                self.set_state(ConnectionState::Ready);
            },
            BackendMessage::EmptyQueryResponse(_) => {
                self.query.resolve(Err(EmptyQueryError.into()));
                self.set_state(ConnectionState::Ready);
            },
            message => self.fatal(ErrorKind::Protocol(message.unexpected("query"))),
        }
    }

    fn idle(&mut self, message: BackendMessage) {
        let Some(message) = self.session(message) else {
            return;
        };

        match message {
            // responses of the trailing statements of a multi statement query
            BackendMessage::RowDescription(_)
            | BackendMessage::DataRow(_)
            | BackendMessage::CommandComplete(_)
            | BackendMessage::EmptyQueryResponse(_)
                if self.owed_ready > 0 =>
            {
                #[cfg(feature = "log")]
                log::warn!(
                    "discarding {} after query completed",
                    BackendMessage::message_name(message.msgtype()),
                );
                verbose!(msgtype = %(message.msgtype() as char), "trailing message discarded");
            },
            message => self.fatal(ErrorKind::Protocol(message.unexpected("ready"))),
        }
    }

    /// Handle message valid whenever the session is established.
    ///
    /// Returns the message back if it is not a session message.
    fn session(&mut self, message: BackendMessage) -> Option<BackendMessage> {
        match message {
            BackendMessage::ParameterStatus(param) => {
                verbose!(name = %param.name, value = %param.value, "parameter status");
                self.parameters.insert(param.name, param.value);
            },
            BackendMessage::BackendKeyData(key) => self.backend_key = Some(key),
            BackendMessage::NoticeResponse(notice) => self.notice(notice),
            BackendMessage::NotificationResponse(_notify) => {
                verbose!(channel = %_notify.channel, payload = %_notify.payload, "notification");
            },
            BackendMessage::ReadyForQuery(ready) => {
                self.owed_ready = self.owed_ready.saturating_sub(1);
                self.transaction = ready.status;
            },
            message => return Some(message),
        }
        None
    }

    fn notice(&self, _notice: NoticeResponse) {
        #[cfg(feature = "log")]
        log::warn!("{_notice}");
        verbose!(%_notice, "notice");
    }

    fn fatal(&mut self, kind: ErrorKind) {
        #[cfg(feature = "log")]
        log::error!("connection error: {kind}");

        self.decoder.clear();
        self.handshake.reject(&kind);
        self.query.reject(&kind);
        self.set_state(ConnectionState::Error);
        self.failure = Some(kind.clone());
        self.events.push_back(Event::Error(kind));
        self.close_requested = true;
    }

    /// Locally initiated close.
    fn shutdown(&mut self) {
        self.set_state(ConnectionState::Disconnected);
        self.events.push_back(Event::Disconnect);
        self.close_requested = true;
    }

    fn set_state(&mut self, state: ConnectionState) {
        verbose!(from = %self.state, to = %state, "state transition");
        self.state = state;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::connection::mock::*;

    fn config() -> Config {
        Config::default().user("alice").dbname("db1")
    }

    /// Protocol in `Ready` state with drained events and output.
    fn ready() -> Protocol {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.take_output();
        p.on_data(&auth_ok());
        p.on_data(&ready_for_query(b'I'));
        p.take_connect_result().unwrap().unwrap();
        assert!(matches!(p.poll_event(), Some(Event::Connect)));
        p
    }

    fn events(p: &mut Protocol) -> Vec<Event> {
        std::iter::from_fn(|| p.poll_event()).collect()
    }

    #[test]
    fn startup_on_connected() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        assert_eq!(p.state(), ConnectionState::Connecting);
        assert!(p.take_output().is_empty());

        p.on_connected();
        assert_eq!(p.state(), ConnectionState::Authenticating);

        let out = p.take_output();
        assert_eq!(&out[..4], &33u32.to_be_bytes());
        assert_eq!(&out[4..8], &196_608u32.to_be_bytes());
        assert_eq!(&out[8..], b"user\0alice\0database\0db1\0\0");
    }

    #[test]
    fn auth_ok_transitions_ready() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        assert!(p.take_connect_result().is_none());

        p.on_data(&auth_ok());
        assert_eq!(p.state(), ConnectionState::Ready);
        assert!(p.take_connect_result().unwrap().is_ok());
        assert!(matches!(events(&mut p)[..], [Event::Connect]));
        assert!(!p.is_synchronized());

        p.on_data(&ready_for_query(b'I'));
        assert!(p.is_synchronized());
    }

    #[test]
    fn auth_nonzero_code_is_fatal() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.on_data(&frame(b'R', &[0, 0, 0, 1]));

        assert_eq!(p.state(), ConnectionState::Error);
        let err = p.take_connect_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(AuthError::Malformed(_))));
        assert!(matches!(events(&mut p)[..], [Event::Error(ErrorKind::Auth(_))]));
        assert!(p.wants_close());
    }

    #[test]
    fn auth_trailing_bytes_is_fatal() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.on_data(&frame(b'R', &[0, 0, 0, 0, 0]));
        let err = p.take_connect_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(AuthError::Malformed(_))));
    }

    #[test]
    fn auth_password_unsupported() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.on_data(&frame(b'R', &[0, 0, 0, 3]));
        let err = p.take_connect_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(AuthError::Unsupported("CleartextPassword"))));
        assert_eq!(p.state(), ConnectionState::Error);
    }

    #[test]
    fn server_error_during_startup() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.on_data(&error_response("FATAL", "3D000", "database \"db1\" does not exist"));
        let err = p.take_connect_result().unwrap().unwrap_err();
        let ErrorKind::Database(db) = err.kind() else {
            panic!("expected database error, found {err}");
        };
        assert_eq!(db.code, "3D000");
        assert_eq!(p.state(), ConnectionState::Error);
    }

    #[test]
    fn usage_error_does_not_write() {
        let mut p = Protocol::new(config());
        let err = p.query("SELECT 1").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Usage(UsageError::InvalidState { state: ConnectionState::Disconnected, .. })));
        assert!(p.take_output().is_empty());

        p.connect().unwrap();
        let err = p.query("SELECT 1").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Usage(UsageError::InvalidState { state: ConnectionState::Connecting, .. })));
        assert!(p.take_output().is_empty());

        assert!(p.connect().is_err());
        assert!(p.end().is_err());
        assert!(p.disconnect().is_err());
    }

    #[test]
    fn nul_in_query() {
        let mut p = ready();
        let err = p.query("SELECT '\0'").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Usage(UsageError::NulInQuery)));
        assert_eq!(p.state(), ConnectionState::Ready);
        assert!(p.take_output().is_empty());
    }

    #[test]
    fn simple_query() {
        let mut p = ready();
        p.query("SELECT 1").unwrap();
        assert_eq!(p.state(), ConnectionState::Busy);
        assert_eq!(&p.take_output()[..], b"Q\0\0\0\x0dSELECT 1\0");

        p.on_data(&row_description(&["x"]));
        p.on_data(&data_row(&[Some("1")]));
        assert!(p.take_query_result().is_none());
        p.on_data(&command_complete("SELECT 1"));

        assert_eq!(p.state(), ConnectionState::Ready);
        let result = p.take_query_result().unwrap().unwrap();
        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.columns[0].name, "x");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "1");
        assert_eq!(result.command_tag, "SELECT 1");
        assert_eq!(result.rows_affected, 1);

        p.on_data(&ready_for_query(b'I'));
        assert!(p.is_synchronized());
        assert!(events(&mut p).is_empty());
    }

    #[test]
    fn query_chunk_boundary_independent() {
        let mut server = vec![];
        server.extend(row_description(&["x", "y"]));
        server.extend(data_row(&[Some("1"), None]));
        server.extend(data_row(&[Some("2"), Some("two")]));
        server.extend(command_complete("SELECT 2"));
        server.extend(ready_for_query(b'I'));

        let mut expected = None;
        for at in 0..=server.len() {
            let mut p = ready();
            p.query("SELECT x, y FROM t").unwrap();
            p.on_data(&server[..at]);
            p.on_data(&server[at..]);
            assert!(p.is_synchronized());
            let result = p.take_query_result().unwrap().unwrap();
            match &expected {
                None => expected = Some(result),
                Some(expected) => assert_eq!(&result, expected, "split at {at}"),
            }
        }

        let expected = expected.unwrap();
        assert_eq!(expected.rows.len(), 2);
        assert!(expected.rows[0][1].is_null());
        assert_eq!(expected.rows[1][1], "two");
    }

    #[test]
    fn query_error_recovers() {
        let mut p = ready();
        p.query("SELEC 1").unwrap();
        p.on_data(&error_response("ERROR", "42601", "syntax error at or near \"SELEC\""));

        assert_eq!(p.state(), ConnectionState::Ready);
        let err = p.take_query_result().unwrap().unwrap_err();
        let ErrorKind::Database(db) = err.kind() else {
            panic!("expected database error, found {err}");
        };
        assert_eq!(db.code, "42601");
        assert!(!err.is_fatal());
        p.on_data(&ready_for_query(b'I'));

        p.query("SELECT 1").unwrap();
        p.take_output();
        p.on_data(&row_description(&["x"]));
        p.on_data(&data_row(&[Some("1")]));
        p.on_data(&command_complete("SELECT 1"));
        p.on_data(&ready_for_query(b'I'));

        let result = p.take_query_result().unwrap().unwrap();
        assert_eq!(result.rows[0][0], "1");
        assert!(events(&mut p).is_empty());
        assert!(!p.wants_close());
    }

    #[test]
    fn empty_query() {
        let mut p = ready();
        p.query("").unwrap();
        p.on_data(&frame(b'I', b""));
        p.on_data(&ready_for_query(b'I'));
        let err = p.take_query_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::EmptyQuery(_)));
        assert_eq!(p.state(), ConnectionState::Ready);
    }

    #[test]
    fn command_without_rows() {
        let mut p = ready();
        p.query("CREATE TABLE foo(id int)").unwrap();
        p.on_data(&command_complete("CREATE TABLE"));
        let result = p.take_query_result().unwrap().unwrap();
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert_eq!(result.rows_affected, 0);
    }

    #[test]
    fn multi_statement_first_complete_is_terminal() {
        let mut p = ready();
        p.query("SELECT 1; SELECT 2; SELEC 3").unwrap();

        let mut server = vec![];
        server.extend(row_description(&["a"]));
        server.extend(data_row(&[Some("1")]));
        server.extend(command_complete("SELECT 1"));
        server.extend(row_description(&["b"]));
        server.extend(data_row(&[Some("2")]));
        server.extend(command_complete("SELECT 1"));
        server.extend(error_response("ERROR", "42601", "syntax error"));
        server.extend(ready_for_query(b'I'));
        p.on_data(&server);

        let result = p.take_query_result().unwrap().unwrap();
        assert_eq!(result.columns[0].name, "a");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(p.state(), ConnectionState::Ready);
        assert!(p.is_synchronized());
        assert!(events(&mut p).is_empty());
    }

    #[test]
    fn session_messages() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();

        let mut server = auth_ok();
        server.extend(parameter_status("server_version", "16.2"));
        server.extend(parameter_status("client_encoding", "UTF8"));
        server.extend(frame(b'K', &[0, 0, 0, 42, 0, 0, 0, 7]));
        server.extend(ready_for_query(b'T'));
        p.on_data(&server);

        assert_eq!(p.parameter("server_version"), Some("16.2"));
        assert_eq!(p.parameter("client_encoding"), Some("UTF8"));
        assert_eq!(p.parameter("TimeZone"), None);
        let key = p.backend_key_data().unwrap();
        assert_eq!((key.process_id, key.secret_key), (42, 7));
        assert_eq!(p.transaction_status(), TransactionStatus::Transaction);
        assert!(p.is_synchronized());

        // asynchronous while busy
        p.query("SELECT 1").unwrap();
        p.on_data(&parameter_status("TimeZone", "UTC"));
        p.on_data(&notice_response("hello"));
        assert_eq!(p.state(), ConnectionState::Busy);
        assert_eq!(p.parameter("TimeZone"), Some("UTC"));
    }

    #[test]
    fn error_response_outside_query_is_fatal() {
        let mut p = ready();
        p.on_data(&error_response("FATAL", "57P01", "terminating connection due to administrator command"));
        assert_eq!(p.state(), ConnectionState::Error);
        assert!(matches!(events(&mut p)[..], [Event::Error(ErrorKind::Database(_))]));
        assert!(p.wants_close());

        p.on_close();
        assert_eq!(p.state(), ConnectionState::Disconnected);
        assert!(matches!(events(&mut p)[..], [Event::Disconnect]));
        assert!(!p.wants_close());
    }

    #[test]
    fn unexpected_message_in_ready_is_fatal() {
        let mut p = ready();
        p.on_data(&data_row(&[Some("1")]));
        assert_eq!(p.state(), ConnectionState::Error);
    }

    #[test]
    fn data_row_before_description() {
        let mut p = ready();
        p.query("SELECT 1").unwrap();
        p.on_data(&data_row(&[Some("1")]));
        assert_eq!(p.state(), ConnectionState::Error);
        let err = p.take_query_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Protocol(_)));
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let mut p = ready();
        p.query("SELECT 1").unwrap();
        p.on_data(&row_description(&["x"]));
        p.on_data(&frame(b'D', &[0, 1, 0, 0, 0, 1, 0xff]));
        assert_eq!(p.state(), ConnectionState::Error);
    }

    #[test]
    fn framing_violation_is_fatal_once() {
        let mut p = ready();
        p.query("SELECT 1").unwrap();
        p.on_data(&[b'?', 0, 0, 0, 4]);
        assert_eq!(p.state(), ConnectionState::Error);
        assert!(matches!(p.take_query_result(), Some(Err(_))));

        p.on_data(&command_complete("SELECT 1"));
        p.on_error(io::ErrorKind::BrokenPipe.into());
        assert_eq!(events(&mut p).len(), 1);
    }

    #[test]
    fn transport_error_rejects_pending() {
        let mut p = ready();
        p.query("SELECT pg_sleep(10)").unwrap();
        p.on_error(io::ErrorKind::ConnectionReset.into());

        assert_eq!(p.state(), ConnectionState::Error);
        let err = p.take_query_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
        assert!(matches!(events(&mut p)[..], [Event::Error(ErrorKind::Io(_))]));
    }

    #[test]
    fn close_rejects_pending_once() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.on_close();
        p.on_close();

        let err = p.take_connect_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(_)));
        assert!(matches!(events(&mut p)[..], [Event::Disconnect]));
        assert_eq!(p.state(), ConnectionState::Disconnected);

        // reconnect
        p.connect().unwrap();
        p.on_connected();
        p.on_data(&auth_ok());
        assert!(p.take_connect_result().unwrap().is_ok());
    }

    #[test]
    fn double_disconnect() {
        let mut p = ready();
        p.query("SELECT 1").unwrap();
        p.disconnect().unwrap();
        assert_eq!(p.state(), ConnectionState::Disconnected);
        assert!(p.wants_close());
        assert!(p.take_output().is_empty());

        let err = p.take_query_result().unwrap().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(_)));

        let err = p.disconnect().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Usage(_)));

        // transport reports the close later
        p.on_close();
        assert!(matches!(events(&mut p)[..], [Event::Disconnect]));
    }

    #[test]
    fn end_sends_terminate() {
        let mut p = ready();
        p.end().unwrap();
        assert_eq!(p.state(), ConnectionState::Disconnected);
        assert_eq!(&p.take_output()[..], b"X\0\0\0\x04");
        assert!(p.wants_close());
        p.on_close();
        assert!(matches!(events(&mut p)[..], [Event::Disconnect]));

        let mut p = ready();
        p.query("SELECT 1").unwrap();
        assert!(p.end().is_err());
    }

    #[test]
    fn fatal_after_auth_ok_is_recorded() {
        let mut p = Protocol::new(config());
        p.connect().unwrap();
        p.on_connected();
        p.on_data(&auth_ok());
        assert!(p.take_connect_result().unwrap().is_ok());
        assert!(!p.is_synchronized());
        assert!(p.failure().is_none());

        p.on_data(&error_response("FATAL", "3D000", "database \"db1\" does not exist"));
        assert_eq!(p.state(), ConnectionState::Error);
        assert!(matches!(p.failure(), Some(ErrorKind::Database(db)) if db.code == "3D000"));

        p.on_close();
        p.connect().unwrap();
        assert!(p.failure().is_none());
    }

    #[test]
    fn copy_out_during_query_is_unexpected() {
        let mut p = ready();
        p.query("COPY t TO STDOUT").unwrap();
        p.on_data(&frame(b'H', &[0, 0, 1, 0, 0]));
        assert_eq!(p.state(), ConnectionState::Error);

        let err = p.take_query_result().unwrap().unwrap_err();
        let ErrorKind::Protocol(proto) = err.kind() else {
            panic!("expected protocol error, found {err}");
        };
        assert_eq!(*proto, crate::postgres::ProtocolError::unexpected_phase(b'H', "query"));
    }
}
