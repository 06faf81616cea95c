use crate::conversion::{KeyValue, ValueConverter};
use crate::error::{ModelError, ModelResult};
use crate::model::Record;
use crate::query::PARENT_KEY_ALIAS;

use super::KeySource;

/// Decoded key a related row is grouped under; `None` when the key is null
pub(super) fn group_key(
    record: &Record<'_>,
    source: &KeySource<'_>,
    converter: &dyn ValueConverter,
) -> ModelResult<Option<KeyValue>> {
    let value = match source {
        KeySource::ForeignKey(foreign_key) => record.value(&foreign_key.name)?,
        KeySource::Junction { parent_key, .. } => {
            let stored = record.raw(PARENT_KEY_ALIAS)?;
            converter
                .from_storage(&stored, parent_key.native_type, &parent_key.hints)
                .map_err(|source| ModelError::Materialization {
                    entity: record.metadata().entity_name().to_string(),
                    field: PARENT_KEY_ALIAS.to_string(),
                    source,
                })?
        }
    };
    Ok(value.to_key())
}
