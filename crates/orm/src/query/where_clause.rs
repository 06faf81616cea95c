//! Query Builder WHERE clause operations
//!
//! Predicate methods live on the [`ConditionBuilder`] trait so the query
//! builder and the nested groups of `where_any`/`where_all`/`where_not`
//! share them.

use crate::backends::DatabaseValue;
use crate::conversion::{NativeType, NativeValue, ValueConverter};
use crate::error::{ModelError, ModelResult};
use crate::model::{Entity, EntityMetadata};

use super::builder::QueryBuilder;
use super::types::*;

/// Collector of predicates for one nesting level
pub struct Filter<'a> {
    metadata: &'a EntityMetadata,
    converter: &'a dyn ValueConverter,
    conditions: Vec<Condition>,
}

impl<'a> Filter<'a> {
    pub fn new(metadata: &'a EntityMetadata, converter: &'a dyn ValueConverter) -> Self {
        Self {
            metadata,
            converter,
            conditions: Vec::new(),
        }
    }

    pub fn into_conditions(self) -> Vec<Condition> {
        self.conditions
    }
}

/// Predicate operations shared by [`QueryBuilder`] and [`Filter`]
pub trait ConditionBuilder: Sized {
    fn entity_metadata(&self) -> &EntityMetadata;

    fn value_converter(&self) -> &dyn ValueConverter;

    fn push_condition(&mut self, condition: Condition);

    /// Compare a field against converted values
    fn where_field(
        mut self,
        field: &str,
        operator: QueryOperator,
        values: Vec<NativeValue>,
    ) -> ModelResult<Self> {
        let descriptor = self.entity_metadata().resolve_field(field)?;
        check_value_count(field, operator, values.len())?;
        let column = descriptor.column.clone();
        let (native_type, hints) = match operator {
            QueryOperator::Like | QueryOperator::NotLike => (NativeType::String, Default::default()),
            _ => (descriptor.native_type, descriptor.hints),
        };

        let operator = match (operator, values.as_slice()) {
            (QueryOperator::Equal, [NativeValue::Null]) => QueryOperator::IsNull,
            (QueryOperator::NotEqual, [NativeValue::Null]) => QueryOperator::IsNotNull,
            (operator, _) => operator,
        };

        let stored = match operator {
            QueryOperator::IsNull | QueryOperator::IsNotNull => Vec::new(),
            _ => values
                .iter()
                .map(|value| self.value_converter().to_storage(value, native_type, &hints))
                .collect::<Result<Vec<_>, _>>()?,
        };

        self.push_condition(Condition::Compare {
            column,
            operator,
            values: stored,
        });
        Ok(self)
    }

    /// Compare an explicit column against already-encoded values
    fn where_column(
        mut self,
        column: &str,
        operator: QueryOperator,
        values: Vec<DatabaseValue>,
    ) -> ModelResult<Self> {
        check_value_count(column, operator, values.len())?;
        self.push_condition(Condition::Compare {
            column: column.to_string(),
            operator,
            values,
        });
        Ok(self)
    }

    /// Add WHERE condition with equality
    fn where_eq(self, field: &str, value: impl Into<NativeValue>) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::Equal, vec![value.into()])
    }

    /// Add WHERE condition with not equal
    fn where_ne(self, field: &str, value: impl Into<NativeValue>) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::NotEqual, vec![value.into()])
    }

    /// Add WHERE condition with greater than
    fn where_gt(self, field: &str, value: impl Into<NativeValue>) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::GreaterThan, vec![value.into()])
    }

    /// Add WHERE condition with greater than or equal
    fn where_gte(self, field: &str, value: impl Into<NativeValue>) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::GreaterThanOrEqual, vec![value.into()])
    }

    /// Add WHERE condition with less than
    fn where_lt(self, field: &str, value: impl Into<NativeValue>) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::LessThan, vec![value.into()])
    }

    /// Add WHERE condition with less than or equal
    fn where_lte(self, field: &str, value: impl Into<NativeValue>) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::LessThanOrEqual, vec![value.into()])
    }

    /// Add WHERE condition with LIKE
    fn where_like(self, field: &str, pattern: &str) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::Like, vec![pattern.into()])
    }

    /// Add WHERE condition with NOT LIKE
    fn where_not_like(self, field: &str, pattern: &str) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::NotLike, vec![pattern.into()])
    }

    /// Add WHERE condition with IN; an empty list matches nothing
    fn where_in<I>(self, field: &str, values: I) -> ModelResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<NativeValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.where_field(field, QueryOperator::In, values)
    }

    /// Add WHERE condition with NOT IN; an empty list matches everything
    fn where_not_in<I>(self, field: &str, values: I) -> ModelResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<NativeValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.where_field(field, QueryOperator::NotIn, values)
    }

    /// Add WHERE condition with BETWEEN
    fn where_between(
        self,
        field: &str,
        low: impl Into<NativeValue>,
        high: impl Into<NativeValue>,
    ) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::Between, vec![low.into(), high.into()])
    }

    /// Add WHERE condition with IS NULL
    fn where_null(self, field: &str) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::IsNull, Vec::new())
    }

    /// Add WHERE condition with IS NOT NULL
    fn where_not_null(self, field: &str) -> ModelResult<Self> {
        self.where_field(field, QueryOperator::IsNotNull, Vec::new())
    }

    /// Group predicates with OR
    fn where_any<F>(self, build: F) -> ModelResult<Self>
    where
        F: FnOnce(Filter<'_>) -> ModelResult<Filter<'_>>,
    {
        self.where_group(build, Condition::Any)
    }

    /// Group predicates with AND
    fn where_all<F>(self, build: F) -> ModelResult<Self>
    where
        F: FnOnce(Filter<'_>) -> ModelResult<Filter<'_>>,
    {
        self.where_group(build, Condition::All)
    }

    /// Negate an AND group
    fn where_not<F>(self, build: F) -> ModelResult<Self>
    where
        F: FnOnce(Filter<'_>) -> ModelResult<Filter<'_>>,
    {
        self.where_group(build, |conditions| Condition::Not(Box::new(Condition::All(conditions))))
    }

    #[doc(hidden)]
    fn where_group<F, G>(mut self, build: F, wrap: G) -> ModelResult<Self>
    where
        F: FnOnce(Filter<'_>) -> ModelResult<Filter<'_>>,
        G: FnOnce(Vec<Condition>) -> Condition,
    {
        let conditions = {
            let filter = Filter::new(self.entity_metadata(), self.value_converter());
            build(filter)?.into_conditions()
        };
        self.push_condition(wrap(conditions));
        Ok(self)
    }

    /// Full-text match over one or more fields; the phrase is always bound
    fn where_full_text_match(
        mut self,
        fields: &[&str],
        phrase: &str,
        mode: FullTextMode,
    ) -> ModelResult<Self> {
        let clause = full_text_clause(self.entity_metadata(), fields, phrase, mode)?;
        self.push_condition(Condition::FullText(clause));
        Ok(self)
    }
}

/// Each operator renders a fixed number of placeholders, except the IN lists
fn check_value_count(target: &str, operator: QueryOperator, count: usize) -> ModelResult<()> {
    let expected = match operator {
        QueryOperator::In | QueryOperator::NotIn => return Ok(()),
        QueryOperator::IsNull | QueryOperator::IsNotNull => 0,
        QueryOperator::Between => 2,
        _ => 1,
    };
    if count == expected {
        return Ok(());
    }
    Err(ModelError::Configuration(format!(
        "Operator {} on '{}' takes {} value(s), got {}",
        operator, target, expected, count
    )))
}

/// Resolve the fields of a full-text clause
pub(crate) fn full_text_clause(
    metadata: &EntityMetadata,
    fields: &[&str],
    phrase: &str,
    mode: FullTextMode,
) -> ModelResult<FullTextClause> {
    if fields.is_empty() {
        return Err(ModelError::Configuration(
            "Full-text match needs at least one field".to_string(),
        ));
    }
    let columns = fields
        .iter()
        .map(|field| metadata.resolve_column(field).map(str::to_string))
        .collect::<ModelResult<Vec<_>>>()?;

    Ok(FullTextClause {
        columns,
        phrase: phrase.to_string(),
        mode,
    })
}

impl<'a> ConditionBuilder for Filter<'a> {
    fn entity_metadata(&self) -> &EntityMetadata {
        self.metadata
    }

    fn value_converter(&self) -> &dyn ValueConverter {
        self.converter
    }

    fn push_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }
}

impl<E: Entity> ConditionBuilder for QueryBuilder<E> {
    fn entity_metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn value_converter(&self) -> &dyn ValueConverter {
        self.converter.as_ref()
    }

    fn push_condition(&mut self, condition: Condition) {
        self.plan.conditions.push(condition);
    }
}
