//! In-memory executor
//!
//! Answers queries from a script of canned result sets and records every
//! statement it receives. Used by the test suites in place of a live server.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use super::core::*;
use crate::error::{OrmError, OrmResult};

/// Row backed by an ordered list of named values
#[derive(Debug, Clone, Default)]
pub struct MemoryRow {
    columns: Vec<(String, DatabaseValue)>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn with(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.columns.push((column.to_string(), value.into()));
        self
    }
}

impl DatabaseRow for MemoryRow {
    fn get_by_index(&self, index: usize) -> OrmResult<DatabaseValue> {
        self.columns
            .get(index)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| OrmError::ColumnNotFound(format!("#{}", index)))
    }

    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| OrmError::ColumnNotFound(name.to_string()))
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// A statement received by the [`ScriptedExecutor`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

enum Reply {
    Rows(Vec<MemoryRow>),
    Failure(String),
    Delayed(Duration, Vec<MemoryRow>),
}

/// Executor that replays scripted replies in order.
///
/// When the script runs dry every further query returns no rows.
#[derive(Default)]
pub struct ScriptedExecutor {
    replies: VecDeque<Reply>,
    recorded: Vec<RecordedQuery>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next query
    pub fn push_rows(&mut self, rows: Vec<MemoryRow>) -> &mut Self {
        self.replies.push_back(Reply::Rows(rows));
        self
    }

    /// Queue a database failure for the next query
    pub fn push_failure(&mut self, message: &str) -> &mut Self {
        self.replies.push_back(Reply::Failure(message.to_string()));
        self
    }

    /// Queue rows that arrive only after `delay`
    pub fn push_delayed_rows(&mut self, delay: Duration, rows: Vec<MemoryRow>) -> &mut Self {
        self.replies.push_back(Reply::Delayed(delay, rows));
        self
    }

    /// Every statement received so far
    pub fn queries(&self) -> &[RecordedQuery] {
        &self.recorded
    }

    pub fn query_count(&self) -> usize {
        self.recorded.len()
    }

    fn answer(&mut self, sql: &str, params: &[DatabaseValue]) -> Reply {
        self.recorded.push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        self.replies.pop_front().unwrap_or(Reply::Rows(Vec::new()))
    }

    async fn reply(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<MemoryRow>> {
        match self.answer(sql, params) {
            Reply::Rows(rows) => Ok(rows),
            Reply::Failure(message) => Err(OrmError::Database(message)),
            Reply::Delayed(delay, rows) => {
                tokio::time::sleep(delay).await;
                Ok(rows)
            }
        }
    }
}

#[async_trait]
impl DatabaseExecutor for ScriptedExecutor {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.reply(sql, params).await.map(|rows| rows.len() as u64)
    }

    async fn fetch_all(
        &mut self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Box<dyn DatabaseRow>>> {
        let rows = self.reply(sql, params).await?;
        Ok(rows
            .into_iter()
            .map(|row| Box::new(row) as Box<dyn DatabaseRow>)
            .collect())
    }

    fn fetch_stream<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<DatabaseValue>,
    ) -> BoxStream<'a, OrmResult<Box<dyn DatabaseRow>>> {
        match self.answer(sql, &params) {
            Reply::Rows(rows) | Reply::Delayed(_, rows) => stream::iter(
                rows.into_iter()
                    .map(|row| Ok(Box::new(row) as Box<dyn DatabaseRow>)),
            )
            .boxed(),
            Reply::Failure(message) => {
                stream::once(async move { Err(OrmError::Database(message)) }).boxed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let mut executor = ScriptedExecutor::new();
        executor
            .push_rows(vec![MemoryRow::new().with("id", 1i64)])
            .push_failure("table missing");

        let rows = executor.fetch_all("SELECT 1", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("id").unwrap(), DatabaseValue::Int64(1));

        let err = executor.fetch_all("SELECT 2", &[]).await.err().unwrap();
        assert!(matches!(err, OrmError::Database(ref m) if m == "table missing"));

        assert!(executor.fetch_all("SELECT 3", &[]).await.unwrap().is_empty());
        assert_eq!(executor.query_count(), 3);
    }

    #[test]
    fn test_memory_row_missing_column() {
        let row = MemoryRow::new().with("name", "Ann");
        assert!(matches!(
            row.get_by_name("email"),
            Err(OrmError::ColumnNotFound(_))
        ));
        assert_eq!(row.column_names(), vec!["name".to_string()]);
    }
}
