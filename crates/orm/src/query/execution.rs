//! Query Builder execution for entity types

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::backends::{DatabaseExecutor, DatabaseRow};
use crate::conversion::{NativeType, ValueConverter};
use crate::error::{ModelError, ModelResult};
use crate::loading::{within_timeout, EagerLoader};
use crate::model::{Entity, EntityMetadata, Record};

use super::builder::QueryBuilder;
use super::types::CompiledQuery;

/// Build an entity from one result row
pub fn materialize<E: Entity>(
    row: &dyn DatabaseRow,
    metadata: &EntityMetadata,
    converter: &dyn ValueConverter,
) -> ModelResult<E> {
    E::from_record(&Record::new(row, metadata, converter))
}

impl<E: Entity> QueryBuilder<E> {
    /// Execute query and return entities, loading attached includes afterwards
    pub async fn get(self, executor: &mut dyn DatabaseExecutor) -> ModelResult<Vec<E>> {
        let compiled = self.to_sql()?;
        let loader = EagerLoader::new()
            .with_config(self.loader_config.clone())
            .with_converter(Arc::clone(&self.converter));
        if !self.includes.is_empty() {
            loader.validate(&self.includes)?;
        }

        let rows = within_timeout(
            self.loader_config.query_timeout,
            &compiled.sql,
            executor.fetch_all(&compiled.sql, &compiled.params),
        )
        .await?;
        tracing::debug!(
            entity = self.metadata.entity_name(),
            rows = rows.len(),
            "materializing query results"
        );

        let mut entities = rows
            .iter()
            .map(|row| materialize::<E>(row.as_ref(), &self.metadata, self.converter.as_ref()))
            .collect::<ModelResult<Vec<_>>>()?;

        if !self.includes.is_empty() {
            loader.load(executor, &mut entities, &self.includes).await?;
        }
        Ok(entities)
    }

    /// Execute query and return first entity
    pub async fn first(self, executor: &mut dyn DatabaseExecutor) -> ModelResult<Option<E>> {
        let results = self.limit(1).get(executor).await?;
        Ok(results.into_iter().next())
    }

    /// Execute query and return first entity or a not-found error
    pub async fn first_or_fail(self, executor: &mut dyn DatabaseExecutor) -> ModelResult<E> {
        let table = self.metadata.resolve_table().to_string();
        self.first(executor)
            .await?
            .ok_or(ModelError::NotFound(table))
    }

    /// Count matching rows
    pub async fn count(self, executor: &mut dyn DatabaseExecutor) -> ModelResult<i64> {
        let compiled = self.to_count_sql()?;
        let row = within_timeout(
            self.loader_config.query_timeout,
            &compiled.sql,
            executor.fetch_optional(&compiled.sql, &compiled.params),
        )
        .await?
        .ok_or_else(|| ModelError::Database("COUNT(*) returned no row".to_string()))?;

        let stored = row.get_by_index(0)?;
        let count = self
            .converter
            .from_storage(&stored, NativeType::I64, &Default::default())?;
        match count.as_integer().map(i64::try_from) {
            Some(Ok(count)) => Ok(count),
            _ => Err(ModelError::Database(format!("unexpected COUNT(*) value {:?}", count))),
        }
    }

    /// Execute query and return raw rows, e.g. to read window function columns
    pub async fn fetch_rows(
        self,
        executor: &mut dyn DatabaseExecutor,
    ) -> ModelResult<Vec<Box<dyn DatabaseRow>>> {
        let compiled = self.to_sql()?;
        within_timeout(
            self.loader_config.query_timeout,
            &compiled.sql,
            executor.fetch_all(&compiled.sql, &compiled.params),
        )
        .await
    }

    /// Compile the query for streaming
    pub fn prepare(self) -> ModelResult<PreparedQuery<E>> {
        let compiled = self.to_sql()?;
        Ok(PreparedQuery {
            compiled,
            metadata: self.metadata,
            converter: self.converter,
            _entity: std::marker::PhantomData,
        })
    }
}

/// A compiled query whose results can be streamed.
///
/// Includes are not loaded for streamed entities.
pub struct PreparedQuery<E: Entity> {
    compiled: CompiledQuery,
    metadata: Arc<EntityMetadata>,
    converter: Arc<dyn ValueConverter>,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: Entity> PreparedQuery<E> {
    pub fn compiled(&self) -> &CompiledQuery {
        &self.compiled
    }

    /// Lazily materialize entities as the cursor advances; one pass only
    pub fn stream<'a>(
        &'a self,
        executor: &'a mut dyn DatabaseExecutor,
    ) -> BoxStream<'a, ModelResult<E>> {
        let metadata = self.metadata.as_ref();
        let converter = self.converter.as_ref();
        executor
            .fetch_stream(&self.compiled.sql, self.compiled.params.clone())
            .map(move |row| row.and_then(|row| materialize::<E>(row.as_ref(), metadata, converter)))
            .boxed()
    }
}
