//! Query Builder Types - Core types and enums for query building

use std::fmt;

use crate::backends::DatabaseValue;

use super::window::WindowFunctionSpec;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
            QueryOperator::Between => write!(f, "BETWEEN"),
        }
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Full-text search modes of `MATCH ... AGAINST`
///
/// MySQL has no boolean mode with query expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullTextMode {
    #[default]
    NaturalLanguage,
    NaturalLanguageWithQueryExpansion,
    /// Operators in the phrase (`+`, `-`, `*`, quotes) pass through verbatim
    Boolean,
}

impl fmt::Display for FullTextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FullTextMode::NaturalLanguage => write!(f, "IN NATURAL LANGUAGE MODE"),
            FullTextMode::NaturalLanguageWithQueryExpansion => {
                write!(f, "IN NATURAL LANGUAGE MODE WITH QUERY EXPANSION")
            }
            FullTextMode::Boolean => write!(f, "IN BOOLEAN MODE"),
        }
    }
}

/// `MATCH(columns) AGAINST(phrase mode)`
#[derive(Debug, Clone, PartialEq)]
pub struct FullTextClause {
    pub columns: Vec<String>,
    pub phrase: String,
    pub mode: FullTextMode,
}

/// Filter predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Column compared against bound values
    Compare {
        column: String,
        operator: QueryOperator,
        values: Vec<DatabaseValue>,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    FullText(FullTextClause),
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTerm {
    Column {
        column: String,
        direction: OrderDirection,
    },
    Relevance {
        clause: FullTextClause,
        direction: OrderDirection,
    },
}

/// Accumulated clauses of one SELECT
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    pub conditions: Vec<Condition>,
    pub order_by: Vec<OrderTerm>,
    pub windows: Vec<WindowFunctionSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Rendered SQL and its parameters in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}
