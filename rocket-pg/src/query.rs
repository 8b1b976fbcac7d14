//! Simple query execution.
//!
//! <https://www.postgresql.org/docs/current/protocol-flow.html#PROTOCOL-FLOW-SIMPLE-QUERY>
use std::fmt;

use crate::{
    Row, Value,
    common::ByteStr,
    postgres::{
        ProtocolError,
        backend::{CommandComplete, DataRow, RowDescription},
    },
    row::Column,
};

/// The result of a simple query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Column descriptions, empty for command that returns no rows.
    pub columns: Vec<Column>,
    /// Returned rows, in server order.
    pub rows: Vec<Row>,
    /// The command tag, e.g. `SELECT 3` or `INSERT 0 1`.
    pub command_tag: ByteStr,
    /// Row count parsed from the command tag, zero when the tag carries none.
    pub rows_affected: u64,
}

impl QueryResult {
    /// Find column index by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|e| e.name == name)
    }

    /// Get value of row `row` at column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.rows.get(row)?.get(self.column_index(name)?)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for QueryResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let names: Vec<&str> = self.columns.iter().map(|e| e.name.as_str()).collect();
        let mut st = serializer.serialize_struct("QueryResult", 4)?;
        st.serialize_field("columns", &names)?;
        st.serialize_field("rows", &self.rows)?;
        st.serialize_field("command_tag", &self.command_tag)?;
        st.serialize_field("rows_affected", &self.rows_affected)?;
        st.end()
    }
}

/// Accumulate the response of one in flight simple query.
#[derive(Debug, Default)]
pub(crate) struct QueryExecutor {
    columns: Option<Vec<Column>>,
    rows: Vec<Row>,
}

impl QueryExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rows are about to be returned, set the column layout.
    pub(crate) fn describe(&mut self, rd: RowDescription) -> Result<(), ProtocolError> {
        if self.columns.is_some() {
            return Err(ProtocolError::unexpected_phase(RowDescription::MSGTYPE, "fetching data rows"));
        }
        self.columns = Some(rd.columns);
        Ok(())
    }

    /// Decode one row according to the described columns.
    pub(crate) fn push_row(&mut self, dr: DataRow) -> Result<(), ProtocolError> {
        let Some(columns) = &self.columns else {
            return Err(ProtocolError::unexpected(RowDescription::MSGTYPE, DataRow::MSGTYPE));
        };

        if columns.len() != dr.values.len() {
            return Err(ProtocolError::malformed(DataRow::MSGTYPE, "column count mismatch with RowDescription"));
        }

        let values = columns
            .iter()
            .zip(dr.values)
            .map(|(col, raw)| Value::decode(col.format, raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ProtocolError::malformed(DataRow::MSGTYPE, "text value is not valid utf8"))?;

        self.rows.push(Row::new(values));
        Ok(())
    }

    /// An SQL command completed normally.
    pub(crate) fn complete(self, cmd: CommandComplete) -> QueryResult {
        QueryResult {
            columns: self.columns.unwrap_or_default(),
            rows: self.rows,
            rows_affected: rows_affected(&cmd.tag),
            command_tag: cmd.tag,
        }
    }
}

/// Parse the row count from a command tag.
fn rows_affected(tag: &str) -> u64 {
    let mut whs = tag.split_whitespace();
    let Some(tag) = whs.next() else {
        return 0;
    };
    let Some(rows) = whs.next() else {
        return 0;
    };
    match tag {
        "INSERT" => whs.next().unwrap_or_default(),
        "SELECT" => rows,
        "UPDATE" => rows,
        "DELETE" => rows,
        "MERGE" => rows,
        "FETCH" => rows,
        "MOVE" => rows,
        "COPY" => rows,
        _ => return 0,
    }
    .parse()
    .unwrap_or_default()
}

/// An error when query string is empty.
#[derive(Clone)]
pub struct EmptyQueryError;

impl std::error::Error for EmptyQueryError { }

impl fmt::Display for EmptyQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Query string is empty")
    }
}

impl fmt::Debug for EmptyQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::postgres::PgFormat;

    fn column(name: &'static str) -> Column {
        Column {
            name: ByteStr::from_static(name),
            table_oid: 0,
            attribute: 0,
            type_oid: 23,
            type_size: 4,
            type_modifier: -1,
            format: PgFormat::Text,
        }
    }

    #[test]
    fn command_tag_row_count() {
        assert_eq!(rows_affected("SELECT 3"), 3);
        assert_eq!(rows_affected("INSERT 0 14"), 14);
        assert_eq!(rows_affected("UPDATE 2"), 2);
        assert_eq!(rows_affected("CREATE TABLE"), 0);
        assert_eq!(rows_affected("BEGIN"), 0);
        assert_eq!(rows_affected(""), 0);
    }

    #[test]
    fn accumulate_rows() {
        let mut exec = QueryExecutor::new();
        exec.describe(RowDescription { columns: vec![column("id"), column("name")] }).unwrap();
        exec.push_row(DataRow { values: vec![Some(Bytes::from_static(b"1")), None] }).unwrap();
        exec.push_row(DataRow { values: vec![Some(Bytes::from_static(b"2")), Some(Bytes::from_static(b"foo"))] }).unwrap();

        let result = exec.complete(CommandComplete { tag: ByteStr::from_static("SELECT 2") });
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows_affected, 2);
        assert_eq!(result.command_tag, "SELECT 2");
        assert!(result.get(0, "name").unwrap().is_null());
        assert_eq!(result.get(1, "name").unwrap(), "foo");
        assert_eq!(result.get(1, "missing"), None);
    }

    #[test]
    fn data_row_before_description() {
        let mut exec = QueryExecutor::new();
        let err = exec.push_row(DataRow { values: vec![] }).unwrap_err();
        assert_eq!(err, ProtocolError::unexpected(b'T', b'D'));
    }

    #[test]
    fn column_count_mismatch() {
        let mut exec = QueryExecutor::new();
        exec.describe(RowDescription { columns: vec![column("x")] }).unwrap();
        assert!(exec.push_row(DataRow { values: vec![None, None] }).is_err());
    }

    #[test]
    fn command_without_rows() {
        let exec = QueryExecutor::new();
        let result = exec.complete(CommandComplete { tag: ByteStr::from_static("INSERT 0 1") });
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
        assert_eq!(result.rows_affected, 1);
    }
}
