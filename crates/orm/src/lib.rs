//! # durable-orm: MySQL data-access core
//!
//! Three cooperating parts:
//!
//! - a type converter mapping native values to MySQL wire values and back,
//!   including the dialect's quirks (`TINYINT(1)` booleans, `TIME` spans beyond
//!   a day, JSON, unsigned 64-bit integers, enums as text or ordinals);
//! - a query compiler for predicates, ordering, full-text matches, window
//!   functions and pagination, always binding values as `?` parameters;
//! - a batched eager loader that fills one-to-many, many-to-many and nested
//!   navigations with one query per navigation level.
//!
//! Entities declare their mapping statically through [`Entity::describe`];
//! the metadata is cached per type for the life of the process.

pub mod backends;
pub mod conversion;
pub mod error;
pub mod loading;
pub mod model;
pub mod query;
pub mod schema;

#[cfg(test)]
mod fixtures;

pub use backends::{
    DatabaseExecutor, DatabaseRow, DatabaseValue, MemoryRow, MySqlConnection, MySqlTransaction,
    ScriptedExecutor,
};
pub use conversion::{
    ConversionError, EnumDescriptor, EnumStorage, EnumValue, FieldHints, FromNative,
    MySqlTypeConverter, NativeType, NativeValue, ValueConverter,
};
pub use error::{ModelError, ModelResult, OrmError, OrmResult};
pub use loading::{EagerLoader, Include, IncludeLoader, IncludeTree, LoadStats, LoaderConfig};
pub use model::{
    Cardinality, Entity, EntityMetadata, FieldDescriptor, HasMany, HasOne, JunctionTable,
    NavigationDescriptor, Record, RelationKind,
};
pub use query::{
    CompiledQuery, ConditionBuilder, FrameBound, FrameUnit, FullTextMode, OrderDirection,
    PreparedQuery, QueryBuilder, QueryOperator, WindowFunction,
};
pub use schema::{create_table_sql, TableBuilder};

/// Everything needed to declare entities and build queries
pub mod prelude {
    pub use crate::conversion::{FieldHints, NativeType, NativeValue};
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::loading::{Include, LoaderConfig};
    pub use crate::model::{Entity, EntityMetadata, HasMany, HasOne, JunctionTable, Record};
    pub use crate::query::{ConditionBuilder, FrameBound, FullTextMode, OrderDirection, QueryBuilder};
    pub use crate::backends::DatabaseExecutor;
}
