//! Query Builder ORDER BY operations

use crate::error::ModelResult;
use crate::model::Entity;

use super::builder::QueryBuilder;
use super::types::*;
use super::where_clause::full_text_clause;

impl<E: Entity> QueryBuilder<E> {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(self, field: &str) -> ModelResult<Self> {
        self.order_by_direction(field, OrderDirection::Asc)
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(self, field: &str) -> ModelResult<Self> {
        self.order_by_direction(field, OrderDirection::Desc)
    }

    pub fn order_by_direction(self, field: &str, direction: OrderDirection) -> ModelResult<Self> {
        let column = self.metadata.resolve_column(field)?.to_string();
        Ok(self.order_by_column(&column, direction))
    }

    /// Order by an explicit column or window alias, bypassing field resolution
    pub fn order_by_column(mut self, column: &str, direction: OrderDirection) -> Self {
        self.plan.order_by.push(OrderTerm::Column {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Order by full-text relevance, most relevant first
    pub fn order_by_relevance(
        mut self,
        fields: &[&str],
        phrase: &str,
        mode: FullTextMode,
    ) -> ModelResult<Self> {
        let clause = full_text_clause(&self.metadata, fields, phrase, mode)?;
        self.plan.order_by.push(OrderTerm::Relevance {
            clause,
            direction: OrderDirection::Desc,
        });
        Ok(self)
    }
}
