//! Schema generation - CREATE TABLE statements derived from entity metadata
//!
//! Column types come from the converter's storage type mapping, so the DDL
//! always matches what the converter writes.

use crate::backends::quote_identifier;
use crate::conversion::{MySqlTypeConverter, ValueConverter};
use crate::error::ModelResult;
use crate::model::{EntityMetadata, FieldDescriptor, JunctionTable};

/// Builder for one `CREATE TABLE IF NOT EXISTS` statement
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table_name: String,
    columns: Vec<String>,
    constraints: Vec<String>,
}

impl TableBuilder {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a column
    pub fn column(&mut self, name: &str, column_type: &str, nullable: bool) -> &mut Self {
        let null = if nullable { "NULL" } else { "NOT NULL" };
        self.columns
            .push(format!("{} {} {}", quote_identifier(name), column_type, null));
        self
    }

    /// Declare the primary key columns
    pub fn primary_key(&mut self, columns: &[&str]) -> &mut Self {
        let columns: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        self.constraints
            .push(format!("PRIMARY KEY ({})", columns.join(", ")));
        self
    }

    /// Add a FULLTEXT index over the given columns
    pub fn full_text_index(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        let columns: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        self.constraints.push(format!(
            "FULLTEXT KEY {} ({})",
            quote_identifier(name),
            columns.join(", ")
        ));
        self
    }

    pub fn to_sql(&self) -> String {
        let definitions: Vec<&str> = self
            .columns
            .iter()
            .chain(self.constraints.iter())
            .map(String::as_str)
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.table_name),
            definitions.join(", ")
        )
    }
}

/// `CREATE TABLE IF NOT EXISTS` for an entity using the MySQL converter
pub fn create_table_sql(metadata: &EntityMetadata) -> ModelResult<String> {
    create_table_sql_with(metadata, &MySqlTypeConverter)
}

/// `CREATE TABLE IF NOT EXISTS` for an entity with explicit storage types.
///
/// The primary key column is `NOT NULL`; every other column is nullable.
pub fn create_table_sql_with(
    metadata: &EntityMetadata,
    converter: &dyn ValueConverter,
) -> ModelResult<String> {
    let primary_key = metadata.resolve_primary_key()?;
    let mut table = TableBuilder::new(metadata.resolve_table());
    for field in metadata.fields() {
        let is_key = field.name == primary_key.name;
        table.column(&field.column, &storage_type(converter, field), !is_key);
    }
    table.primary_key(&[primary_key.column.as_str()]);
    Ok(table.to_sql())
}

/// `CREATE TABLE IF NOT EXISTS` for a many-to-many junction table keyed by
/// both columns
pub fn create_junction_table_sql(
    junction: &JunctionTable,
    parent_key: &FieldDescriptor,
    related_key: &FieldDescriptor,
) -> String {
    let converter = MySqlTypeConverter;
    let mut table = TableBuilder::new(&junction.table);
    table
        .column(&junction.parent_column, &storage_type(&converter, parent_key), false)
        .column(&junction.child_column, &storage_type(&converter, related_key), false)
        .primary_key(&[junction.parent_column.as_str(), junction.child_column.as_str()]);
    table.to_sql()
}

fn storage_type(converter: &dyn ValueConverter, field: &FieldDescriptor) -> String {
    converter.storage_type_string(field.native_type, &field.hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{FieldHints, NativeType};
    use crate::fixtures::Book;
    use crate::model::Entity;

    #[test]
    fn test_create_table_from_metadata() {
        let sql = create_table_sql(&Book::metadata()).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `books` (`id` BIGINT NOT NULL, `author_id` BIGINT NULL, \
             `title` VARCHAR(255) NULL, `in_print` TINYINT(1) NULL, PRIMARY KEY (`id`))"
        );
    }

    #[test]
    fn test_hints_shape_column_types() {
        let metadata = EntityMetadata::builder("Article")
            .key("id", NativeType::Uuid)
            .with_field(FieldDescriptor::new("body", NativeType::String).hints(FieldHints::large_text()))
            .with_field(FieldDescriptor::new("slug", NativeType::String).hints(FieldHints::max_length(80)))
            .build();
        let sql = create_table_sql(&metadata).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `article` (`id` CHAR(36) NOT NULL"));
        assert!(sql.contains("`body` LONGTEXT NULL"));
        assert!(sql.contains("`slug` VARCHAR(80) NULL"));
    }

    #[test]
    fn test_table_without_key_is_rejected() {
        let metadata = EntityMetadata::builder("Event").field("name", NativeType::String).build();
        assert!(create_table_sql(&metadata).is_err());
    }

    #[test]
    fn test_junction_table_and_full_text_index() {
        let key = FieldDescriptor::new("id", NativeType::I64).primary_key();
        let sql = create_junction_table_sql(&JunctionTable::new("book_tags", "book_id", "tag_id"), &key, &key);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `book_tags` (`book_id` BIGINT NOT NULL, `tag_id` BIGINT NOT NULL, \
             PRIMARY KEY (`book_id`, `tag_id`))"
        );

        let mut table = TableBuilder::new("notes");
        table
            .column("id", "BIGINT", false)
            .column("body", "TEXT", true)
            .full_text_index("ft_body", &["body"]);
        assert!(table.to_sql().ends_with("FULLTEXT KEY `ft_body` (`body`))"));
    }
}
