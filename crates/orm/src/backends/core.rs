//! Core Database Backend Traits
//!
//! Wire-level values, result rows and the executor seam the query compiler and
//! the eager loader talk to. Concrete executors live in sibling modules.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;

use crate::error::OrmResult;

/// Identifier quote character of the MySQL dialect
pub const IDENTIFIER_QUOTE: char = '`';

/// Positional parameter placeholder of the MySQL dialect
pub const PARAMETER_PLACEHOLDER: &str = "?";

/// Quote a table or column name, doubling embedded quote characters
pub fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(IDENTIFIER_QUOTE);
    for ch in name.chars() {
        if ch == IDENTIFIER_QUOTE {
            quoted.push(IDENTIFIER_QUOTE);
        }
        quoted.push(ch);
    }
    quoted.push(IDENTIFIER_QUOTE);
    quoted
}

/// Values as they travel over the wire to and from MySQL
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    /// Only produced by drivers that report `TINYINT(1)` as boolean
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Only produced by drivers; the converter stores UUIDs as text
    Uuid(uuid::Uuid),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    /// Signed TIME value, may exceed 24 hours
    Time(Duration),
    Json(JsonValue),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Short type label used in conversion error messages
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "NULL",
            DatabaseValue::Bool(_) => "BOOL",
            DatabaseValue::Int8(_) => "TINYINT",
            DatabaseValue::Int16(_) => "SMALLINT",
            DatabaseValue::Int32(_) => "INT",
            DatabaseValue::Int64(_) => "BIGINT",
            DatabaseValue::UInt64(_) => "BIGINT UNSIGNED",
            DatabaseValue::Float32(_) => "FLOAT",
            DatabaseValue::Float64(_) => "DOUBLE",
            DatabaseValue::String(_) => "TEXT",
            DatabaseValue::Bytes(_) => "BLOB",
            DatabaseValue::Uuid(_) => "UUID",
            DatabaseValue::DateTime(_) => "DATETIME",
            DatabaseValue::Date(_) => "DATE",
            DatabaseValue::Time(_) => "TIME",
            DatabaseValue::Json(_) => "JSON",
        }
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// Abstract database row trait
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by index
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue>;

    /// Get a column value by name
    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue>;

    /// Get column count
    fn column_count(&self) -> usize;

    /// Get column names
    fn column_names(&self) -> Vec<String>;
}

/// Something SQL can be sent to: a pooled connection or an open transaction.
///
/// One executor is borrowed mutably for a whole load, so a single load never
/// runs concurrently on the same connection.
#[async_trait]
pub trait DatabaseExecutor: Send {
    /// Execute a statement and return the affected rows count
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Execute a query and return all result rows
    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Box<dyn DatabaseRow>>>;

    /// Execute a query and yield rows as the cursor advances
    fn fetch_stream<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<DatabaseValue>,
    ) -> BoxStream<'a, OrmResult<Box<dyn DatabaseRow>>>;

    /// Execute a query and return the first result row
    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Option<Box<dyn DatabaseRow>>> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_option_into_database_value() {
        let none: Option<i64> = None;
        assert_eq!(DatabaseValue::from(none), DatabaseValue::Null);
        assert_eq!(DatabaseValue::from(Some(7i64)), DatabaseValue::Int64(7));
    }
}
