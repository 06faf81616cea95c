//! Error types for the ORM system
//!
//! Configuration problems surface before any round trip, conversion problems
//! surface while rows are materialized, and driver failures are carried
//! through untouched as the error source.

use thiserror::Error;

use crate::conversion::ConversionError;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for ORM operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid mapping or query construction, detected before execution
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entity has no primary key declared
    #[error("Entity '{0}' has no primary key")]
    MissingPrimaryKey(String),

    /// A field name that resolves to no descriptor
    #[error("Unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    /// A stored value could not be turned into the field's native value
    #[error("Failed to materialize field '{field}' of '{entity}': {source}")]
    Materialization {
        entity: String,
        field: String,
        #[source]
        source: ConversionError,
    },

    /// Stand-alone conversion failure (parameter binding, direct converter use)
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Error reported by the MySQL driver
    #[error("Database error: {0}")]
    Driver(#[from] sqlx::Error),

    /// Database failure reported by a non-sqlx executor
    #[error("Database error: {0}")]
    Database(String),

    /// Failure while loading one include node
    #[error("Failed to load include '{path}': {source}")]
    Loading {
        path: String,
        #[source]
        source: Box<ModelError>,
    },

    /// Round trip aborted before completion
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Record not found
    #[error("Record not found in table '{0}'")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Column missing from a result row
    #[error("Column '{0}' not found in result row")]
    ColumnNotFound(String),
}

impl ModelError {
    /// Wrap this error with the include path it happened under
    pub fn at_path(self, path: &str) -> Self {
        match self {
            already @ ModelError::Loading { .. } => already,
            other => ModelError::Loading {
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Configuration errors are raised at build time and never retried
    pub fn is_configuration(&self) -> bool {
        match self {
            ModelError::Configuration(_)
            | ModelError::MissingPrimaryKey(_)
            | ModelError::UnknownField { .. } => true,
            ModelError::Loading { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Innermost error beneath any include-path wrapping
    pub fn root_cause(&self) -> &ModelError {
        match self {
            ModelError::Loading { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
