use std::time::Duration;

use crate::error::{ModelError, ModelResult};

/// Configuration for batched include loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum number of keys bound into a single IN list
    pub max_batch_size: usize,
    /// Maximum depth of nested includes
    pub max_depth: usize,
    /// Abort a round trip that takes longer than this
    pub query_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_depth: 10,
            query_timeout: None,
        }
    }
}

impl LoaderConfig {
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.max_batch_size == 0 {
            return Err(ModelError::Configuration(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Work done by one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Round trips issued
    pub queries: usize,
    /// Related rows materialized
    pub rows: usize,
    /// Deepest include level visited
    pub depth: usize,
}
