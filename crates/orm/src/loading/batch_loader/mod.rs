//! Batch loading of related rows keyed by parent keys
//!
//! One IN query per batch of at most `max_batch_size` distinct keys; rows are
//! materialized through the converter and grouped by the decoded key.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use crate::conversion::{KeyValue, NativeValue};
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, EntityMetadata, FieldDescriptor, JunctionTable, Record};
use crate::query::{select_through_junction, select_where_in};

use super::include::LoadContext;

pub mod config;
pub mod row_conversion;


pub use config::{LoadStats, LoaderConfig};

/// Where the key linking a related row to its parent comes from
#[derive(Debug, Clone, Copy)]
pub enum KeySource<'m> {
    /// Field on the related entity holding the parent's key
    ForeignKey(&'m FieldDescriptor),
    /// Junction table column, joined on the related entity's primary key
    Junction {
        junction: &'m JunctionTable,
        parent_key: &'m FieldDescriptor,
        related_key_column: &'m str,
    },
}

/// Fetch the related rows of `keys` and group them by parent key
pub async fn load_grouped<C: Entity>(
    ctx: &mut LoadContext<'_>,
    metadata: &EntityMetadata,
    source: KeySource<'_>,
    keys: &[NativeValue],
) -> ModelResult<HashMap<KeyValue, Vec<C>>> {
    let table = metadata.resolve_table();
    let key_field = match source {
        KeySource::ForeignKey(foreign_key) => foreign_key,
        KeySource::Junction { parent_key, .. } => parent_key,
    };

    let mut groups: HashMap<KeyValue, Vec<C>> = HashMap::new();
    for (batch, chunk) in keys.chunks(ctx.config.max_batch_size.max(1)).enumerate() {
        let params = chunk
            .iter()
            .map(|key| ctx.converter.to_storage(key, key_field.native_type, &key_field.hints))
            .collect::<Result<Vec<_>, _>>()?;

        let compiled = match source {
            KeySource::ForeignKey(foreign_key) => select_where_in(table, &foreign_key.column, params),
            KeySource::Junction {
                junction,
                related_key_column,
                ..
            } => select_through_junction(table, related_key_column, junction, params),
        };

        tracing::debug!(table, batch, keys = chunk.len(), "loading related batch");
        let timeout = ctx.config.query_timeout;
        let rows = within_timeout(
            timeout,
            &compiled.sql,
            ctx.executor.fetch_all(&compiled.sql, &compiled.params),
        )
        .await?;
        ctx.stats.queries += 1;
        ctx.stats.rows += rows.len();

        for row in &rows {
            let record = Record::new(row.as_ref(), metadata, ctx.converter);
            let key = row_conversion::group_key(&record, &source, ctx.converter)?;
            let related = C::from_record(&record)?;
            match key {
                Some(key) => groups.entry(key).or_default().push(related),
                None => tracing::warn!(table, "related row without a parent key skipped"),
            }
        }
    }

    Ok(groups)
}

/// Run a round trip, cancelling it when the timeout elapses first
pub async fn within_timeout<T, F>(timeout: Option<Duration>, sql: &str, round_trip: F) -> ModelResult<T>
where
    F: Future<Output = ModelResult<T>>,
{
    match timeout {
        None => round_trip.await,
        Some(limit) => match tokio::time::timeout(limit, round_trip).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(sql, timeout_ms = limit.as_millis() as u64, "query timed out");
                Err(ModelError::Cancelled(format!(
                    "query did not complete within {:?}",
                    limit
                )))
            }
        },
    }
}
