//! Query Builder - Core builder implementation

use std::fmt;
use std::sync::Arc;

use crate::conversion::{MySqlTypeConverter, ValueConverter};
use crate::loading::{IncludeTree, LoaderConfig};
use crate::model::{Entity, EntityMetadata};

use super::types::*;

/// Query builder for one entity type.
///
/// Field references are resolved through the entity's metadata as clauses are
/// added; execution consumes the builder.
pub struct QueryBuilder<E: Entity> {
    pub(crate) plan: QueryPlan,
    pub(crate) metadata: Arc<EntityMetadata>,
    pub(crate) converter: Arc<dyn ValueConverter>,
    pub(crate) includes: IncludeTree<E>,
    pub(crate) loader_config: LoaderConfig,
}

impl<E: Entity> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            metadata: Arc::clone(&self.metadata),
            converter: Arc::clone(&self.converter),
            includes: self.includes.clone(),
            loader_config: self.loader_config.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("entity", &self.metadata.entity_name())
            .field("plan", &self.plan)
            .field("includes", &self.includes.len())
            .finish()
    }
}

impl<E: Entity> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Create a new query builder using the MySQL converter
    pub fn new() -> Self {
        Self {
            plan: QueryPlan::default(),
            metadata: E::metadata(),
            converter: Arc::new(MySqlTypeConverter),
            includes: IncludeTree::new(),
            loader_config: LoaderConfig::default(),
        }
    }

    /// Use a different converter for parameters and materialization
    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Loader settings used by `get` for includes and the query timeout
    pub fn with_loader_config(mut self, config: LoaderConfig) -> Self {
        self.loader_config = config;
        self
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    /// Accumulated clauses
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }
}
