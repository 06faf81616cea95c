//! Query Builder WITH Methods - Eager loading integration for QueryBuilder

use crate::loading::IncludeLoader;
use crate::model::Entity;

use super::builder::QueryBuilder;

impl<E: Entity> QueryBuilder<E> {
    /// Add an include node; `get` loads it after the base query
    pub fn include<I>(mut self, node: I) -> Self
    where
        I: IncludeLoader<E> + 'static,
    {
        self.includes = self.includes.include(node);
        self
    }

    /// Add an include node only when `condition` holds
    pub fn include_when<I>(self, condition: bool, node: I) -> Self
    where
        I: IncludeLoader<E> + 'static,
    {
        if condition {
            self.include(node)
        } else {
            self
        }
    }

    /// Set the batch size used for includes
    pub fn batch_size(mut self, size: usize) -> Self {
        self.loader_config = self.loader_config.with_max_batch_size(size);
        self
    }
}
