//! Query Builder Module - fluent query compiler for MySQL
//!
//! Predicates, ordering, full-text matches, window functions and pagination
//! accumulate in a [`QueryPlan`](types::QueryPlan) and render to SQL text with
//! `?` placeholders plus the parameters in placeholder order.

pub mod builder;
pub mod execution;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod types;
pub mod where_clause;
pub mod window;
pub mod with;


pub use builder::QueryBuilder;
pub use execution::{materialize, PreparedQuery};
pub use sql_generation::{select_through_junction, select_where_in, PARENT_KEY_ALIAS};
pub use types::{
    CompiledQuery, Condition, FullTextClause, FullTextMode, OrderDirection, OrderTerm,
    QueryOperator, QueryPlan,
};
pub use where_clause::{ConditionBuilder, Filter};
pub use window::{
    FrameBound, FrameUnit, WindowBuilder, WindowFrame, WindowFunction, WindowFunctionSpec,
};
