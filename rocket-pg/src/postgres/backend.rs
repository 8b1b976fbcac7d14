//! Postgres Backend Messages
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::{Buf, Bytes};
use std::fmt;

use super::{Oid, ProtocolError};
use crate::{common::ByteStr, ext::BytesExt, row::Column};

/// A type that can be decoded into postgres backend message.
///
/// Decoder receives the body without message type and length.
pub trait BackendProtocol: Sized {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError>;
}

/// Read an integer, or return `Malformed` if the body is exhausted.
macro_rules! get {
    ($body:ident.$method:ident()) => {
        $body
            .$method()
            .map_err(|_| ProtocolError::malformed(Self::MSGTYPE, "unexpected end of message"))?
    };
}

/// Read a nul terminated utf8 string.
macro_rules! get_str {
    ($body:ident) => {{
        let Some(bytes) = $body.get_nul_bytes() else {
            return Err(ProtocolError::malformed(Self::MSGTYPE, "string is not nul terminated"));
        };
        ByteStr::from_utf8(bytes)
            .map_err(|_| ProtocolError::malformed(Self::MSGTYPE, "string is not valid utf8"))?
    }};
}

macro_rules! assert_msgtype {
    ($typ:ident) => {
        if Self::MSGTYPE != $typ {
            return Err(ProtocolError::unexpected(Self::MSGTYPE, $typ))
        }
    };
}

/// Postgres backend messages.
///
/// This is the closed set of v3 backend message types, anything else is a
/// framing violation. Types outside the simple query flow, such as the copy
/// and function call responses, are decoded and then rejected as
/// unexpected in their phase.
#[derive(Debug)]
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    CopyBothResponse(CopyBothResponse),
    CopyData(CopyData),
    CopyDone(CopyDone),
    CopyInResponse(CopyInResponse),
    CopyOutResponse(CopyOutResponse),
    DataRow(DataRow),
    ErrorResponse(ErrorResponse),
    EmptyQueryResponse(EmptyQueryResponse),
    FunctionCallResponse(FunctionCallResponse),
    NegotiateProtocolVersion(NegotiateProtocolVersion),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            pub fn msgtype(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::MSGTYPE,)*
                }
            }

            /// Returns `true` if `msgtype` is one of the known backend message type.
            pub fn is_known(msgtype: u8) -> bool {
                matches!(msgtype, $($name::MSGTYPE)|*)
            }

            /// Get message name from message type.
            ///
            /// Returns `"Unknown"` for unknown message type.
            pub fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }

        impl BackendProtocol for BackendMessage {
            fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name(<$name as BackendProtocol>::decode(msgtype, body)?),)*
                    _ => return Err(ProtocolError::unknown(msgtype)),
                };
                Ok(message)
            }
        }
    };
}

match_backend! {
    Authentication,
    BackendKeyData,
    BindComplete,
    CloseComplete,
    CommandComplete,
    CopyBothResponse,
    CopyData,
    CopyDone,
    CopyInResponse,
    CopyOutResponse,
    DataRow,
    ErrorResponse,
    EmptyQueryResponse,
    FunctionCallResponse,
    NegotiateProtocolVersion,
    NoData,
    NoticeResponse,
    NotificationResponse,
    ParameterDescription,
    ParameterStatus,
    ParseComplete,
    PortalSuspended,
    ReadyForQuery,
    RowDescription,
}

impl BackendMessage {
    /// Create [`ProtocolError`] for this message not valid in current `phase`.
    pub fn unexpected(&self, phase: &'static str) -> ProtocolError {
        ProtocolError::unexpected_phase(self.msgtype(), phase)
    }
}

/// Identifies the message as an authentication request.
#[derive(Debug, PartialEq, Eq)]
pub enum Authentication {
    /// Specifies that the authentication was successful.
    Ok,
    /// Specifies that Kerberos V5 authentication is required.
    KerberosV5,
    /// Specifies that a clear-text password is required.
    CleartextPassword,
    /// Specifies that an MD5-encrypted password is required.
    MD5Password {
        /// The salt to use when encrypting the password.
        salt: [u8;4],
    },
    /// Specifies that GSSAPI authentication is required.
    GSS,
    /// GSSAPI or SSPI authentication data.
    GSSContinue {
        data: Bytes,
    },
    /// Specifies that SSPI authentication is required.
    SSPI,
    /// Specifies that SASL authentication is required.
    SASL {
        /// The message body is a list of SASL authentication mechanisms, in the server's order of preference.
        mechanisms: Bytes,
    },
    /// Specifies that this message contains a SASL challenge.
    SASLContinue {
        /// SASL data, specific to the SASL mechanism being used.
        data: Bytes,
    },
    /// Specifies that SASL authentication has completed.
    SASLFinal {
        /// SASL outcome "additional data", specific to the SASL mechanism being used.
        data: Bytes,
    },
}

impl Authentication {
    pub const MSGTYPE: u8 = b'R';

    /// Authentication method name.
    pub fn method_name(&self) -> &'static str {
        match self {
            Authentication::Ok => "Ok",
            Authentication::KerberosV5 => "KerberosV5",
            Authentication::CleartextPassword => "CleartextPassword",
            Authentication::MD5Password { .. } => "MD5Password",
            Authentication::GSS => "GSS",
            Authentication::GSSContinue { .. } => "GSSContinue",
            Authentication::SSPI => "SSPI",
            Authentication::SASL { .. } => "SASL",
            Authentication::SASLContinue { .. } => "SASLContinue",
            Authentication::SASLFinal { .. } => "SASLFinal",
        }
    }
}

impl BackendProtocol for Authentication {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let auth = match get!(body.try_get_u32()) {
            // AuthenticationOk is exactly Int32(0)
            0 if body.has_remaining() => {
                return Err(ProtocolError::malformed(Self::MSGTYPE, "AuthenticationOk carries trailing bytes"))
            },
            0 => Authentication::Ok,
            2 => Authentication::KerberosV5,
            3 => Authentication::CleartextPassword,
            5 => Authentication::MD5Password { salt: get!(body.try_get_u32()).to_be_bytes() },
            7 => Authentication::GSS,
            8 => Authentication::GSSContinue { data: body },
            9 => Authentication::SSPI,
            10 => Authentication::SASL { mechanisms: body },
            11 => Authentication::SASLContinue { data: body },
            12 => Authentication::SASLFinal { data: body },
            auth => return Err(ProtocolError::unknown_auth(auth)),
        };
        Ok(auth)
    }
}

/// Identifies the message as cancellation key data.
///
/// The frontend must save these values if it wishes to be able to issue CancelRequest messages later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendKeyData {
    /// The process ID of this backend.
    pub process_id: u32,
    /// The secret key of this backend.
    pub secret_key: u32,
}

impl BackendKeyData {
    pub const MSGTYPE: u8 = b'K';
}

impl BackendProtocol for BackendKeyData {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            process_id: get!(body.try_get_u32()),
            secret_key: get!(body.try_get_u32()),
        })
    }
}

/// Identifies the message as a run-time parameter status report
#[derive(Debug)]
pub struct ParameterStatus {
    /// The name of the run-time parameter being reported
    pub name: ByteStr,
    /// The current value of the parameter
    pub value: ByteStr,
}

impl ParameterStatus {
    pub const MSGTYPE: u8 = b'S';
}

impl BackendProtocol for ParameterStatus {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            name: get_str!(body),
            value: get_str!(body),
        })
    }
}

/// Identifies the message as an error.
///
/// The message body consists of one or more identified fields, followed by a zero byte as a terminator.
/// Fields can appear in any order.
///
/// For each field there is a `Byte1` code identifying the field type, then the field value `String`.
/// Fields of unrecognized type are silently ignored.
///
/// <https://www.postgresql.org/docs/current/protocol-error-fields.html>
#[derive(Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// `S`, the field contents are ERROR, FATAL, or PANIC (in an error message),
    /// or WARNING, NOTICE, DEBUG, INFO, or LOG (in a notice message),
    /// or a localized translation of one of these.
    pub severity: ByteStr,
    /// `V`, same as `severity` except that the contents are never localized.
    pub severity_nonlocalized: Option<ByteStr>,
    /// `C`, the SQLSTATE code for the error.
    pub code: ByteStr,
    /// `M`, the primary human-readable error message.
    pub message: ByteStr,
    /// `D`, an optional secondary error message carrying more detail about the problem.
    pub detail: Option<ByteStr>,
    /// `H`, an optional suggestion what to do about the problem.
    pub hint: Option<ByteStr>,
    /// `P`, a decimal ASCII integer indicating an error cursor position as an index into the original query string.
    pub position: Option<u32>,
    /// `W`, an indication of the context in which the error occurred.
    pub where_: Option<ByteStr>,
    /// `s`, the name of the schema containing the associated object.
    pub schema: Option<ByteStr>,
    /// `t`, the name of the associated table.
    pub table: Option<ByteStr>,
    /// `c`, the name of the associated table column.
    pub column: Option<ByteStr>,
    /// `d`, the name of the associated data type.
    pub data_type: Option<ByteStr>,
    /// `n`, the name of the associated constraint.
    pub constraint: Option<ByteStr>,
    /// `F`, the file name of the source-code location where the error was reported.
    pub file: Option<ByteStr>,
    /// `L`, the line number of the source-code location where the error was reported.
    pub line: Option<ByteStr>,
    /// `R`, the name of the source-code routine reporting the error.
    pub routine: Option<ByteStr>,
}

impl ErrorResponse {
    pub const MSGTYPE: u8 = b'E';

    /// Returns `true` if server is about to terminate the session.
    pub fn is_fatal(&self) -> bool {
        let severity = self.severity_nonlocalized.as_ref().unwrap_or(&self.severity);
        matches!(severity.as_str(), "FATAL" | "PANIC")
    }
}

impl BackendProtocol for ErrorResponse {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);

        let mut severity = None;
        let mut code = None;
        let mut message = None;
        let mut me = ErrorResponse {
            severity: ByteStr::default(),
            severity_nonlocalized: None,
            code: ByteStr::default(),
            message: ByteStr::default(),
            detail: None,
            hint: None,
            position: None,
            where_: None,
            schema: None,
            table: None,
            column: None,
            data_type: None,
            constraint: None,
            file: None,
            line: None,
            routine: None,
        };

        loop {
            let field = get!(body.try_get_u8());
            if field == b'\0' {
                break;
            }
            let value = get_str!(body);
            match field {
                b'S' => severity = Some(value),
                b'V' => me.severity_nonlocalized = Some(value),
                b'C' => code = Some(value),
                b'M' => message = Some(value),
                b'D' => me.detail = Some(value),
                b'H' => me.hint = Some(value),
                b'P' => me.position = value.parse().ok(),
                b'W' => me.where_ = Some(value),
                b's' => me.schema = Some(value),
                b't' => me.table = Some(value),
                b'c' => me.column = Some(value),
                b'd' => me.data_type = Some(value),
                b'n' => me.constraint = Some(value),
                b'F' => me.file = Some(value),
                b'L' => me.line = Some(value),
                b'R' => me.routine = Some(value),
                _ => { },
            }
        }

        let (Some(severity), Some(code), Some(message)) = (severity, code, message) else {
            return Err(ProtocolError::malformed(Self::MSGTYPE, "missing severity, code or message field"));
        };

        me.severity = severity;
        me.code = code;
        me.message = message;
        Ok(me)
    }
}

impl std::error::Error for ErrorResponse { }

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.severity, self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {hint}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// A warning message. The frontend should display the message.
///
/// Fields share the layout of [`ErrorResponse`].
#[derive(Debug)]
pub struct NoticeResponse {
    pub fields: ErrorResponse,
}

impl NoticeResponse {
    pub const MSGTYPE: u8 = b'N';
}

impl BackendProtocol for NoticeResponse {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        match ErrorResponse::decode(ErrorResponse::MSGTYPE, body) {
            Ok(fields) => Ok(Self { fields }),
            Err(ProtocolError::Malformed { reason, .. }) => Err(ProtocolError::malformed(Self::MSGTYPE, reason)),
            Err(err) => Err(err),
        }
    }
}

impl fmt::Display for NoticeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.fields, f)
    }
}

/// Identifies the message as a notification response, from `LISTEN`/`NOTIFY`.
#[derive(Debug)]
pub struct NotificationResponse {
    /// The process ID of the notifying backend process.
    pub process_id: u32,
    /// The name of the channel that the notify has been raised on.
    pub channel: ByteStr,
    /// The “payload” string passed from the notifying process.
    pub payload: ByteStr,
}

impl NotificationResponse {
    pub const MSGTYPE: u8 = b'A';
}

impl BackendProtocol for NotificationResponse {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self {
            process_id: get!(body.try_get_u32()),
            channel: get_str!(body),
            payload: get_str!(body),
        })
    }
}

/// Identifies the message as a row description
#[derive(Debug)]
pub struct RowDescription {
    /// One entry per field, in result column order.
    pub columns: Vec<Column>,
}

impl RowDescription {
    pub const MSGTYPE: u8 = b'T';
}

impl BackendProtocol for RowDescription {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);

        // Specifies the number of fields in a row (can be zero).
        let field_len = get!(body.try_get_u16());
        let mut columns = Vec::with_capacity(field_len as usize);

        for _ in 0..field_len {
            let name = get_str!(body);
            let table_oid = get!(body.try_get_u32());
            let attribute = get!(body.try_get_i16());
            let type_oid = get!(body.try_get_u32());
            let type_size = get!(body.try_get_i16());
            let type_modifier = get!(body.try_get_i32());
            let format_code = get!(body.try_get_u16());
            let Some(format) = super::PgFormat::from_code(format_code) else {
                return Err(ProtocolError::malformed(Self::MSGTYPE, "unknown format code"));
            };
            columns.push(Column {
                name,
                table_oid,
                attribute,
                type_oid,
                type_size,
                type_modifier,
                format,
            });
        }

        Ok(Self { columns })
    }
}

/// Identifies the message as a data row.
#[derive(Debug)]
pub struct DataRow {
    /// Raw column values, `None` is SQL NULL.
    pub values: Vec<Option<Bytes>>,
}

impl DataRow {
    pub const MSGTYPE: u8 = b'D';
}

impl BackendProtocol for DataRow {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);

        // The number of column values that follow (possibly zero).
        let column_len = get!(body.try_get_u16());
        let mut values = Vec::with_capacity(column_len as usize);

        for _ in 0..column_len {
            // The length of the column value, in bytes (this count does not include itself).
            // Can be zero. As a special case, -1 indicates a NULL column value.
            let value = match get!(body.try_get_i32()) {
                -1 => None,
                len if len < 0 => {
                    return Err(ProtocolError::malformed(Self::MSGTYPE, "negative column length"));
                },
                len if len as usize > body.len() => {
                    return Err(ProtocolError::malformed(Self::MSGTYPE, "column length exceeds message"));
                },
                len => Some(body.split_to(len as usize)),
            };
            values.push(value);
        }

        Ok(Self { values })
    }
}

/// Identifies the message as a command-completed response
///
/// For an INSERT command, the tag is `INSERT oid rows`, where rows is the number of rows inserted.
///
/// For a DELETE, UPDATE, MERGE, SELECT (or CREATE TABLE AS), MOVE, FETCH or COPY command,
/// the tag is the command followed by the number of rows affected.
#[derive(Debug)]
pub struct CommandComplete {
    /// The command tag. This is usually a single word that identifies which SQL command was completed.
    pub tag: ByteStr,
}

impl CommandComplete {
    pub const MSGTYPE: u8 = b'C';
}

impl BackendProtocol for CommandComplete {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self { tag: get_str!(body) })
    }
}

/// Identifies the message as a protocol version negotiation message.
#[derive(Debug)]
pub struct NegotiateProtocolVersion {
    /// Newest minor protocol version supported by the server for the major protocol version requested by the client.
    pub minor: u32,
    /// Protocol options not recognized by the server.
    pub options: Vec<ByteStr>,
}

impl NegotiateProtocolVersion {
    pub const MSGTYPE: u8 = b'v';
}

impl BackendProtocol for NegotiateProtocolVersion {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let minor = get!(body.try_get_u32());
        let len = get!(body.try_get_u32());
        let mut options = Vec::new();
        for _ in 0..len {
            options.push(get_str!(body));
        }
        Ok(Self { minor, options })
    }
}

/// Identifies the message as a parameter description.
#[derive(Debug)]
pub struct ParameterDescription {
    /// The object ID of each parameter data type.
    pub oids: Vec<Oid>,
}

impl ParameterDescription {
    pub const MSGTYPE: u8 = b't';
}

impl BackendProtocol for ParameterDescription {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let len = get!(body.try_get_u16());
        let mut oids = Vec::with_capacity(len as usize);
        for _ in 0..len {
            oids.push(get!(body.try_get_u32()));
        }
        Ok(Self { oids })
    }
}

macro_rules! copy_response {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
            $(#[$doc])*
            #[derive(Debug)]
            pub struct $name {
                /// Overall copy format, [`Text`][super::PgFormat::Text] or [`Binary`][super::PgFormat::Binary].
                pub format: super::PgFormat,
                /// Format of each column, all text if the overall format is text.
                pub column_formats: Vec<super::PgFormat>,
            }

            impl $name {
                pub const MSGTYPE: u8 = $ty;
            }

            impl BackendProtocol for $name {
                fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
                    assert_msgtype!(msgtype);
                    let Some(format) = super::PgFormat::from_code(get!(body.try_get_u8()).into()) else {
                        return Err(ProtocolError::malformed(Self::MSGTYPE, "unknown format code"));
                    };
                    let len = get!(body.try_get_u16());
                    let mut column_formats = Vec::with_capacity(len as usize);
                    for _ in 0..len {
                        let Some(format) = super::PgFormat::from_code(get!(body.try_get_u16())) else {
                            return Err(ProtocolError::malformed(Self::MSGTYPE, "unknown format code"));
                        };
                        column_formats.push(format);
                    }
                    Ok(Self { format, column_formats })
                }
            }
    )*};
}

copy_response! {
    /// Identifies the message as a Start Copy In response.
    ///
    /// The frontend must now send copy-in data.
    struct CopyInResponse, b'G';

    /// Identifies the message as a Start Copy Out response.
    ///
    /// This message will be followed by copy-out data.
    struct CopyOutResponse, b'H';

    /// Identifies the message as a Start Copy Both response, only used for streaming replication.
    struct CopyBothResponse, b'W';
}

/// Identifies the message as COPY data.
#[derive(Debug)]
pub struct CopyData {
    /// Data that forms part of a COPY data stream.
    pub data: Bytes,
}

impl CopyData {
    pub const MSGTYPE: u8 = b'd';
}

impl BackendProtocol for CopyData {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        Ok(Self { data: body })
    }
}

/// Identifies the message as a function call result.
#[derive(Debug)]
pub struct FunctionCallResponse {
    /// The value of the function result, `None` is NULL.
    pub value: Option<Bytes>,
}

impl FunctionCallResponse {
    pub const MSGTYPE: u8 = b'V';
}

impl BackendProtocol for FunctionCallResponse {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let value = match get!(body.try_get_i32()) {
            -1 => None,
            len if len < 0 || len as usize > body.len() => {
                return Err(ProtocolError::malformed(Self::MSGTYPE, "invalid result length"));
            },
            len => Some(body.split_to(len as usize)),
        };
        Ok(Self { value })
    }
}

/// Current backend transaction status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// `I`, not in a transaction block.
    Idle,
    /// `T`, in a transaction block.
    Transaction,
    /// `E`, in a failed transaction block, queries will be rejected until block is ended.
    Failed,
}

/// Identifies the message type. ReadyForQuery is sent whenever the backend is ready for a new query cycle.
#[derive(Debug)]
pub struct ReadyForQuery {
    pub status: TransactionStatus,
}

impl ReadyForQuery {
    pub const MSGTYPE: u8 = b'Z';
}

impl BackendProtocol for ReadyForQuery {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(msgtype);
        let status = match get!(body.try_get_u8()) {
            b'I' => TransactionStatus::Idle,
            b'T' => TransactionStatus::Transaction,
            b'E' => TransactionStatus::Failed,
            _ => return Err(ProtocolError::malformed(Self::MSGTYPE, "unknown transaction status")),
        };
        Ok(Self { status })
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
            $(#[$doc])*
            #[derive(Debug)]
            pub struct $name;

            impl $name {
                pub const MSGTYPE: u8 = $ty;
            }

            impl BackendProtocol for $name {
                fn decode(msgtype: u8, _: Bytes) -> Result<Self, ProtocolError> {
                    assert_msgtype!(msgtype);
                    Ok(Self)
                }
            }
    )*};
}

unit_msg! {
    /// Identifies the message as a Bind-complete indicator.
    struct BindComplete, b'2';

    /// Identifies the message as a Close-complete indicator.
    struct CloseComplete, b'3';

    /// Identifies the message as a COPY-complete indicator.
    struct CopyDone, b'c';

    /// Identifies the message as a response to an empty query string.
    ///
    /// This substitutes for CommandComplete.
    struct EmptyQueryResponse, b'I';

    /// Identifies the message as a no-data indicator.
    struct NoData, b'n';

    /// Identifies the message as a Parse-complete indicator.
    struct ParseComplete, b'1';

    /// Identifies the message as a portal-suspended indicator.
    struct PortalSuspended, b's';
}
