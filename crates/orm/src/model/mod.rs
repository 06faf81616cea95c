//! Model System - entity trait and metadata
//!
//! - `metadata`: field, navigation and entity descriptors
//! - `registry`: process-wide metadata cache
//! - `record`: typed access to a result row during materialization
//! - `navigation`: typed handles the loader assigns through

pub mod metadata;
pub mod navigation;
pub mod record;
pub mod registry;

use std::fmt::Debug;
use std::sync::Arc;

pub use metadata::{
    Cardinality, EntityMetadata, EntityMetadataBuilder, FieldDescriptor, JunctionTable,
    NavigationDescriptor, RelationKind,
};
pub use navigation::{HasMany, HasOne};
pub use record::Record;

use crate::conversion::NativeValue;
use crate::error::ModelResult;
use crate::query::QueryBuilder;

/// A type mapped onto a table
pub trait Entity: Clone + Send + Sync + Debug + 'static {
    /// Declare the mapping; called once per type and cached
    fn describe() -> EntityMetadata;

    /// Materialize an entity from a result row. Navigations start unloaded.
    fn from_record(record: &Record<'_>) -> ModelResult<Self>;

    /// Current value of a mapped field, `None` for names the entity does not map
    fn field_value(&self, field: &str) -> Option<NativeValue>;

    /// Cached metadata of this entity type
    fn metadata() -> Arc<EntityMetadata> {
        registry::metadata_for::<Self>()
    }

    /// Start a query over this entity's table
    fn query() -> QueryBuilder<Self> {
        QueryBuilder::new()
    }

    /// Primary-key value, `None` while the key is null
    fn primary_key_value(&self) -> ModelResult<Option<NativeValue>> {
        let metadata = Self::metadata();
        let key = metadata.resolve_primary_key()?;
        Ok(self.field_value(&key.name).filter(|value| !value.is_null()))
    }
}
