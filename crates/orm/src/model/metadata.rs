//! Entity Metadata - statically declared mapping of entities onto tables
//!
//! Entities describe themselves once through [`EntityMetadata::builder`]; the
//! resolved metadata is cached process-wide by the registry.

use std::collections::HashMap;

use crate::conversion::{FieldHints, NativeType};
use crate::error::{ModelError, ModelResult};

/// Binding of a semantic field name to a storage column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub column: String,
    pub native_type: NativeType,
    pub hints: FieldHints,
    pub primary_key: bool,
}

impl FieldDescriptor {
    /// Field stored in the column named after the lower-cased field name
    pub fn new(name: &str, native_type: NativeType) -> Self {
        Self {
            name: name.to_string(),
            column: name.to_lowercase(),
            native_type,
            hints: FieldHints::default(),
            primary_key: false,
        }
    }

    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    pub fn hints(mut self, hints: FieldHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// Whether a navigation holds one related entity or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Collection,
}

/// How the related rows are found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Related rows carry a foreign key to the parent
    OneToMany,
    /// Related rows are linked through a junction table
    ManyToMany,
}

/// Junction table linking both sides of a many-to-many navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionTable {
    pub table: String,
    /// Column referencing the parent's primary key
    pub parent_column: String,
    /// Column referencing the related entity's primary key
    pub child_column: String,
}

impl JunctionTable {
    pub fn new(table: &str, parent_column: &str, child_column: &str) -> Self {
        Self {
            table: table.to_string(),
            parent_column: parent_column.to_string(),
            child_column: child_column.to_string(),
        }
    }
}

/// Navigation property of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
    pub relation: RelationKind,
    pub related_entity: String,
    /// Field on the related entity holding the parent's key (one-to-many)
    pub foreign_key: Option<String>,
    /// Junction table (many-to-many)
    pub junction: Option<JunctionTable>,
}

impl NavigationDescriptor {
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Collection
    }
}

/// Resolved mapping of one entity type
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    entity_name: String,
    table_name: String,
    fields: Vec<FieldDescriptor>,
    field_index: HashMap<String, usize>,
    navigations: Vec<NavigationDescriptor>,
}

impl EntityMetadata {
    /// Start describing an entity; the table defaults to the lower-cased name
    pub fn builder(entity_name: &str) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            entity_name: entity_name.to_string(),
            table_name: None,
            fields: Vec::new(),
            navigations: Vec::new(),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn resolve_table(&self) -> &str {
        &self.table_name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn navigations(&self) -> &[NavigationDescriptor] {
        &self.navigations
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_index.get(name).map(|&index| &self.fields[index])
    }

    pub fn resolve_field(&self, name: &str) -> ModelResult<&FieldDescriptor> {
        self.field(name).ok_or_else(|| ModelError::UnknownField {
            entity: self.entity_name.clone(),
            field: name.to_string(),
        })
    }

    pub fn resolve_column(&self, field: &str) -> ModelResult<&str> {
        self.resolve_field(field).map(|descriptor| descriptor.column.as_str())
    }

    pub fn resolve_primary_key(&self) -> ModelResult<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|field| field.primary_key)
            .ok_or_else(|| ModelError::MissingPrimaryKey(self.entity_name.clone()))
    }

    pub fn navigation(&self, name: &str) -> Option<&NavigationDescriptor> {
        self.navigations.iter().find(|nav| nav.name == name)
    }

    pub fn resolve_navigation(&self, name: &str) -> ModelResult<&NavigationDescriptor> {
        self.navigation(name).ok_or_else(|| {
            ModelError::Configuration(format!(
                "Entity '{}' has no navigation '{}'",
                self.entity_name, name
            ))
        })
    }
}

/// Builder for [`EntityMetadata`]
#[derive(Debug)]
pub struct EntityMetadataBuilder {
    entity_name: String,
    table_name: Option<String>,
    fields: Vec<FieldDescriptor>,
    navigations: Vec<NavigationDescriptor>,
}

impl EntityMetadataBuilder {
    pub fn table(mut self, table: &str) -> Self {
        self.table_name = Some(table.to_string());
        self
    }

    /// Primary-key field
    pub fn key(self, name: &str, native_type: NativeType) -> Self {
        self.with_field(FieldDescriptor::new(name, native_type).primary_key())
    }

    pub fn field(self, name: &str, native_type: NativeType) -> Self {
        self.with_field(FieldDescriptor::new(name, native_type))
    }

    /// Add a fully specified descriptor; a later field with the same name replaces it
    pub fn with_field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.retain(|field| field.name != descriptor.name);
        self.fields.push(descriptor);
        self
    }

    /// Collection navigation whose related rows hold `foreign_key`
    pub fn has_many(mut self, name: &str, related_entity: &str, foreign_key: &str) -> Self {
        self.navigations.push(NavigationDescriptor {
            name: name.to_string(),
            cardinality: Cardinality::Collection,
            relation: RelationKind::OneToMany,
            related_entity: related_entity.to_string(),
            foreign_key: Some(foreign_key.to_string()),
            junction: None,
        });
        self
    }

    /// Collection navigation through a junction table
    pub fn many_to_many(mut self, name: &str, related_entity: &str, junction: JunctionTable) -> Self {
        self.navigations.push(NavigationDescriptor {
            name: name.to_string(),
            cardinality: Cardinality::Collection,
            relation: RelationKind::ManyToMany,
            related_entity: related_entity.to_string(),
            foreign_key: None,
            junction: Some(junction),
        });
        self
    }

    /// Single-valued navigation populated by the caller's own query
    pub fn reference(mut self, name: &str, related_entity: &str) -> Self {
        self.navigations.push(NavigationDescriptor {
            name: name.to_string(),
            cardinality: Cardinality::Single,
            relation: RelationKind::OneToMany,
            related_entity: related_entity.to_string(),
            foreign_key: None,
            junction: None,
        });
        self
    }

    /// Add a navigation descriptor as-is
    pub fn with_navigation(mut self, navigation: NavigationDescriptor) -> Self {
        self.navigations.push(navigation);
        self
    }

    pub fn build(self) -> EntityMetadata {
        let table_name = self
            .table_name
            .unwrap_or_else(|| self.entity_name.to_lowercase());
        let field_index = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.name.clone(), index))
            .collect();

        EntityMetadata {
            entity_name: self.entity_name,
            table_name,
            fields: self.fields,
            field_index,
            navigations: self.navigations,
        }
    }
}
