//! Metadata Registry - process-wide cache of entity metadata
//!
//! Populated lazily on first access to each entity type and never
//! invalidated. Concurrent first accesses to the same type are serialized by
//! the map's shard lock, so `describe` runs at most once per type.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::metadata::EntityMetadata;
use super::Entity;

static METADATA: Lazy<DashMap<TypeId, Arc<EntityMetadata>>> = Lazy::new(DashMap::new);

/// Cached metadata of `E`, describing the entity on first use.
///
/// `Entity::describe` runs under the shard lock and must not look up other
/// entities' metadata.
pub fn metadata_for<E: Entity>() -> Arc<EntityMetadata> {
    let type_id = TypeId::of::<E>();
    if let Some(cached) = METADATA.get(&type_id) {
        return Arc::clone(cached.value());
    }

    let entry = METADATA.entry(type_id).or_insert_with(|| {
        let metadata = E::describe();
        tracing::debug!(
            entity = metadata.entity_name(),
            table = metadata.resolve_table(),
            fields = metadata.fields().len(),
            "describing entity"
        );
        Arc::new(metadata)
    });
    Arc::clone(entry.value())
}

/// Number of entity types described so far
pub fn cached_entity_count() -> usize {
    METADATA.len()
}
