use std::fmt;
use std::sync::Arc;

use crate::backends::DatabaseExecutor;
use crate::conversion::{MySqlTypeConverter, ValueConverter};
use crate::error::ModelResult;
use crate::model::Entity;

use super::batch_loader::{LoadStats, LoaderConfig};
use super::include::{IncludeTree, LoadContext};

/// Eager loader that fills include trees with one batched query per
/// navigation level instead of one query per parent
#[derive(Clone)]
pub struct EagerLoader {
    config: LoaderConfig,
    converter: Arc<dyn ValueConverter>,
}

impl fmt::Debug for EagerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerLoader")
            .field("config", &self.config)
            .finish()
    }
}

impl Default for EagerLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EagerLoader {
    /// Create a new eager loader with default configuration
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
            converter: Arc::new(MySqlTypeConverter),
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Check every include against metadata without touching the database
    pub fn validate<P: Entity>(&self, tree: &IncludeTree<P>) -> ModelResult<()> {
        self.config.validate()?;
        for node in tree.iter() {
            node.validate(node.name(), 1, &self.config)?;
        }
        Ok(())
    }

    /// Load every include of `tree` onto `roots`.
    ///
    /// Navigations of parents without a key stay unloaded. On error the
    /// roots may be partially populated and should be discarded.
    pub async fn load<P: Entity>(
        &self,
        executor: &mut dyn DatabaseExecutor,
        roots: &mut [P],
        tree: &IncludeTree<P>,
    ) -> ModelResult<LoadStats> {
        self.validate(tree)?;
        let mut ctx = LoadContext::new(executor, self.converter.as_ref(), &self.config);
        if roots.is_empty() || tree.is_empty() {
            return Ok(ctx.stats());
        }

        let mut parents: Vec<&mut P> = roots.iter_mut().collect();
        for node in tree.iter() {
            node.load(&mut ctx, &mut parents, node.name(), 1).await?;
        }

        let stats = ctx.stats();
        let metadata = P::metadata();
        tracing::debug!(
            entity = metadata.entity_name(),
            roots = parents.len(),
            queries = stats.queries,
            rows = stats.rows,
            depth = stats.depth,
            "eager load finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{author_books, book_reviews, Author};
    use crate::loading::Include;

    #[test]
    fn test_default_loader_config() {
        let loader = EagerLoader::new();
        assert_eq!(loader.config().max_batch_size, 1000);
        assert_eq!(loader.config().max_depth, 10);
        assert!(loader.config().query_timeout.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let loader = EagerLoader::new().with_config(LoaderConfig::default().with_max_batch_size(0));
        let tree = IncludeTree::<Author>::new().include(Include::many(author_books()));
        assert!(loader.validate(&tree).unwrap_err().is_configuration());
    }

    #[test]
    fn test_validate_enforces_depth_limit() {
        let tree = IncludeTree::<Author>::new()
            .include(Include::many(author_books()).then_include(Include::many(book_reviews())));

        let shallow = EagerLoader::new().with_config(LoaderConfig::default().with_max_depth(1));
        let err = shallow.validate(&tree).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("books.reviews"));

        let deep_enough = EagerLoader::new().with_config(LoaderConfig::default().with_max_depth(2));
        assert!(deep_enough.validate(&tree).is_ok());
    }
}
