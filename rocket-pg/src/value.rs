use bytes::Bytes;
use std::fmt;

use crate::{common::ByteStr, ext::FmtExt, postgres::PgFormat};

/// A single column value of a [`Row`][crate::Row].
#[derive(Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Value in text format, the format of every simple query result.
    Text(ByteStr),
    /// Value in binary format, as sent by the backend.
    Binary(Bytes),
}

impl Value {
    /// Decode raw `DataRow` value according to the column `format`.
    ///
    /// Returns `Err` if text formatted value is not valid utf8.
    pub(crate) fn decode(format: PgFormat, raw: Option<Bytes>) -> Result<Value, std::str::Utf8Error> {
        let Some(raw) = raw else {
            return Ok(Value::Null);
        };
        match format {
            PgFormat::Text => ByteStr::from_utf8(raw).map(Value::Text),
            PgFormat::Binary => Ok(Value::Binary(raw)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text value, `None` for NULL or binary value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the raw bytes, `None` for NULL.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Null => None,
            Value::Text(text) => Some(text.as_bytes()),
            Value::Binary(bytes) => Some(bytes),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Text(text) => fmt::Debug::fmt(text, f),
            Value::Binary(bytes) => fmt::Debug::fmt(&bytes.lossy(), f),
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Binary(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}
