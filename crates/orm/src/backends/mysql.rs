//! MySQL Backend Implementation
//!
//! Executors over a pooled sqlx connection or an open sqlx transaction, plus
//! the translation between sqlx rows and [`DatabaseValue`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

use super::core::*;
use crate::conversion::time_text;
use crate::error::{OrmError, OrmResult};

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

/// MySQL connection checked out of a pool
pub struct MySqlConnection {
    conn: sqlx::pool::PoolConnection<MySql>,
}

impl MySqlConnection {
    pub fn new(conn: sqlx::pool::PoolConnection<MySql>) -> Self {
        Self { conn }
    }

    /// Check a connection out of an existing pool
    pub async fn acquire(pool: &sqlx::MySqlPool) -> OrmResult<Self> {
        let conn = pool.acquire().await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl DatabaseExecutor for MySqlConnection {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        tracing::debug!(sql, params = params.len(), "executing statement");
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        tracing::debug!(sql, params = params.len(), "fetching rows");
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(box_rows(rows))
    }

    fn fetch_stream<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<DatabaseValue>,
    ) -> BoxStream<'a, OrmResult<Box<dyn DatabaseRow>>> {
        tracing::debug!(sql, params = params.len(), "streaming rows");
        bind_all(sqlx::query(sql), &params)
            .fetch(&mut *self.conn)
            .map(map_streamed_row)
            .boxed()
    }
}

/// MySQL transaction; commit and rollback stay with the caller
pub struct MySqlTransaction<'c> {
    tx: sqlx::Transaction<'c, MySql>,
}

impl<'c> MySqlTransaction<'c> {
    pub fn new(tx: sqlx::Transaction<'c, MySql>) -> Self {
        Self { tx }
    }

    /// Give the underlying transaction back for commit or rollback
    pub fn into_inner(self) -> sqlx::Transaction<'c, MySql> {
        self.tx
    }
}

#[async_trait]
impl<'c> DatabaseExecutor for MySqlTransaction<'c> {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        tracing::debug!(sql, params = params.len(), "executing statement in transaction");
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        tracing::debug!(sql, params = params.len(), "fetching rows in transaction");
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(box_rows(rows))
    }

    fn fetch_stream<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<DatabaseValue>,
    ) -> BoxStream<'a, OrmResult<Box<dyn DatabaseRow>>> {
        tracing::debug!(sql, params = params.len(), "streaming rows in transaction");
        bind_all(sqlx::query(sql), &params)
            .fetch(&mut *self.tx)
            .map(map_streamed_row)
            .boxed()
    }
}

/// MySQL row implementation
pub struct MySqlDatabaseRow {
    row: MySqlRow,
}

impl MySqlDatabaseRow {
    pub fn new(row: MySqlRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for MySqlDatabaseRow {
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue> {
        mysql_value_to_database_value(&self.row, index)
    }

    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        let index = self
            .row
            .columns()
            .iter()
            .position(|col| col.name() == name)
            .ok_or_else(|| OrmError::ColumnNotFound(name.to_string()))?;

        mysql_value_to_database_value(&self.row, index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.row
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect()
    }
}

fn box_rows(rows: Vec<MySqlRow>) -> Vec<Box<dyn DatabaseRow>> {
    rows.into_iter()
        .map(|row| Box::new(MySqlDatabaseRow::new(row)) as Box<dyn DatabaseRow>)
        .collect()
}

fn map_streamed_row(row: Result<MySqlRow, sqlx::Error>) -> OrmResult<Box<dyn DatabaseRow>> {
    row.map(|r| Box::new(MySqlDatabaseRow::new(r)) as Box<dyn DatabaseRow>)
        .map_err(OrmError::from)
}

fn bind_all<'q>(query: MySqlQuery<'q>, params: &[DatabaseValue]) -> MySqlQuery<'q> {
    params.iter().fold(query, bind_database_value)
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'q>(query: MySqlQuery<'q>, value: &DatabaseValue) -> MySqlQuery<'q> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(i8::from(*b)),
        DatabaseValue::Int8(i) => query.bind(*i),
        DatabaseValue::Int16(i) => query.bind(*i),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::UInt64(u) => query.bind(*u),
        DatabaseValue::Float32(f) => query.bind(*f),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Bytes(b) => query.bind(b.clone()),
        DatabaseValue::Uuid(u) => query.bind(u.hyphenated().to_string()),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Date(d) => query.bind(*d),
        // TIME values outside 00:00..24:00 have no chrono counterpart; the
        // server parses the text form.
        DatabaseValue::Time(t) => query.bind(time_text::format_time_text(*t)),
        DatabaseValue::Json(j) => query.bind(j.clone()),
    }
}

/// Convert a MySQL column value to DatabaseValue
fn mysql_value_to_database_value(row: &MySqlRow, index: usize) -> OrmResult<DatabaseValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOLEAN" => DatabaseValue::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" => DatabaseValue::Int8(row.try_get::<i8, _>(index)?),
        "SMALLINT" => DatabaseValue::Int16(row.try_get::<i16, _>(index)?),
        "INT" | "MEDIUMINT" => DatabaseValue::Int32(row.try_get::<i32, _>(index)?),
        "BIGINT" => DatabaseValue::Int64(row.try_get::<i64, _>(index)?),
        "TINYINT UNSIGNED" => DatabaseValue::Int16(i16::from(row.try_get::<u8, _>(index)?)),
        "SMALLINT UNSIGNED" => DatabaseValue::Int32(i32::from(row.try_get::<u16, _>(index)?)),
        "INT UNSIGNED" | "MEDIUMINT UNSIGNED" => {
            DatabaseValue::Int64(i64::from(row.try_get::<u32, _>(index)?))
        }
        "BIGINT UNSIGNED" | "BIT" => DatabaseValue::UInt64(row.try_get::<u64, _>(index)?),
        "YEAR" => DatabaseValue::Int16(row.try_get_unchecked::<i16, _>(index)?),
        "FLOAT" => DatabaseValue::Float32(row.try_get::<f32, _>(index)?),
        "DOUBLE" => DatabaseValue::Float64(row.try_get::<f64, _>(index)?),
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            DatabaseValue::String(row.try_get::<String, _>(index)?)
        }
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            DatabaseValue::Bytes(row.try_get::<Vec<u8>, _>(index)?)
        }
        "DATETIME" | "TIMESTAMP" => {
            DatabaseValue::DateTime(row.try_get::<chrono::NaiveDateTime, _>(index)?)
        }
        "DATE" => DatabaseValue::Date(row.try_get::<chrono::NaiveDate, _>(index)?),
        "TIME" => {
            let time = row.try_get::<sqlx::mysql::types::MySqlTime, _>(index)?;
            let text = time.to_string();
            let span = time_text::parse_time_text(&text)?;
            DatabaseValue::Time(span)
        }
        "JSON" => DatabaseValue::Json(row.try_get::<serde_json::Value, _>(index)?),
        // DECIMAL and anything unrecognised arrive as length-encoded text
        _ => {
            tracing::debug!(column = index, type_name, "decoding column as text");
            DatabaseValue::String(row.try_get_unchecked::<String, _>(index)?)
        }
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::{Arguments, Execute};

    use super::*;

    #[test]
    fn test_every_value_binds_one_argument() {
        let params = vec![
            DatabaseValue::Null,
            DatabaseValue::Bool(true),
            DatabaseValue::UInt64(u64::MAX),
            DatabaseValue::String("ada".into()),
            DatabaseValue::Time(Duration::hours(-100)),
            DatabaseValue::Json(serde_json::json!({ "tags": ["a"] })),
        ];
        let mut query = bind_all(sqlx::query("SELECT ?, ?, ?, ?, ?, ?"), &params);

        let arguments = query.take_arguments().unwrap().unwrap();
        assert_eq!(arguments.len(), params.len());
    }
}
