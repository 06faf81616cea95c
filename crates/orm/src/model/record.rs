//! Record - typed read access to one result row while materializing an entity

use serde::de::DeserializeOwned;

use crate::backends::{DatabaseRow, DatabaseValue};
use crate::conversion::{ConversionError, FromNative, NativeValue, ValueConverter};
use crate::error::{ModelError, ModelResult};

use super::metadata::{EntityMetadata, FieldDescriptor};

/// One row viewed through an entity's metadata.
///
/// Every getter decodes through the converter; failures name the entity and
/// the field.
pub struct Record<'a> {
    row: &'a dyn DatabaseRow,
    metadata: &'a EntityMetadata,
    converter: &'a dyn ValueConverter,
}

impl<'a> Record<'a> {
    pub fn new(
        row: &'a dyn DatabaseRow,
        metadata: &'a EntityMetadata,
        converter: &'a dyn ValueConverter,
    ) -> Self {
        Self {
            row,
            metadata,
            converter,
        }
    }

    pub fn metadata(&self) -> &EntityMetadata {
        self.metadata
    }

    /// Decoded native value of a field
    pub fn value(&self, field: &str) -> ModelResult<NativeValue> {
        let descriptor = self.metadata.resolve_field(field)?;
        self.decode(descriptor)
    }

    /// Field value extracted as a Rust type
    pub fn get<T: FromNative>(&self, field: &str) -> ModelResult<T> {
        let descriptor = self.metadata.resolve_field(field)?;
        let value = self.decode(descriptor)?;
        T::from_native(value).map_err(|source| self.materialization(descriptor, source))
    }

    /// JSON field deserialized into `T`; a null or empty document gives `None`
    pub fn json<T: DeserializeOwned>(&self, field: &str) -> ModelResult<Option<T>> {
        let descriptor = self.metadata.resolve_field(field)?;
        match self.decode(descriptor)? {
            NativeValue::Null => Ok(None),
            NativeValue::Json(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|e| self.materialization(descriptor, ConversionError::new("json", e.to_string()))),
            other => Err(self.materialization(
                descriptor,
                ConversionError::new("json", format!("found {:?}", other)),
            )),
        }
    }

    /// Undecoded value of a column that is not a mapped field
    pub fn raw(&self, column: &str) -> ModelResult<DatabaseValue> {
        self.row.get_by_name(column)
    }

    fn decode(&self, descriptor: &FieldDescriptor) -> ModelResult<NativeValue> {
        let stored = self.row.get_by_name(&descriptor.column)?;
        self.converter
            .from_storage(&stored, descriptor.native_type, &descriptor.hints)
            .map_err(|source| self.materialization(descriptor, source))
    }

    fn materialization(&self, descriptor: &FieldDescriptor, source: ConversionError) -> ModelError {
        ModelError::Materialization {
            entity: self.metadata.entity_name().to_string(),
            field: descriptor.name.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryRow;
    use crate::conversion::{MySqlTypeConverter, NativeType};

    fn metadata() -> EntityMetadata {
        EntityMetadata::builder("Setting")
            .key("id", NativeType::U32)
            .field("enabled", NativeType::Bool)
            .field("payload", NativeType::Json)
            .build()
    }

    #[test]
    fn test_typed_getters() {
        let metadata = metadata();
        let row = MemoryRow::new()
            .with("id", 9i64)
            .with("enabled", "TRUE")
            .with("payload", r#"["a","b"]"#);
        let record = Record::new(&row, &metadata, &MySqlTypeConverter);

        assert_eq!(record.get::<u32>("id").unwrap(), 9);
        assert!(record.get::<bool>("enabled").unwrap());
        assert_eq!(
            record.json::<Vec<String>>("payload").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_conversion_failure_names_entity_and_field() {
        let metadata = metadata();
        let row = MemoryRow::new().with("id", -1i64).with("enabled", "perhaps");
        let record = Record::new(&row, &metadata, &MySqlTypeConverter);

        match record.get::<bool>("enabled").unwrap_err() {
            ModelError::Materialization { entity, field, .. } => {
                assert_eq!(entity, "Setting");
                assert_eq!(field, "enabled");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            record.get::<u32>("id"),
            Err(ModelError::Materialization { .. })
        ));
    }

    #[test]
    fn test_missing_column_and_unknown_field() {
        let metadata = metadata();
        let row = MemoryRow::new().with("id", 1i64);
        let record = Record::new(&row, &metadata, &MySqlTypeConverter);

        assert!(matches!(record.value("enabled"), Err(ModelError::ColumnNotFound(_))));
        assert!(matches!(record.value("colour"), Err(ModelError::UnknownField { .. })));
    }
}
