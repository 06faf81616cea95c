//! Query Builder SQL generation
//!
//! Renders a [`QueryPlan`] as MySQL text with `?` placeholders. Identifiers
//! are always backtick-quoted and values always bound.

use crate::backends::{quote_identifier, DatabaseValue};
use crate::error::ModelResult;
use crate::model::{Entity, JunctionTable};

use super::builder::QueryBuilder;
use super::types::*;

/// Row count MySQL documents for "OFFSET without LIMIT"
const MAX_ROW_COUNT: u64 = u64::MAX;

/// Column carrying the junction's parent key in many-to-many batch queries
pub const PARENT_KEY_ALIAS: &str = "__parent_key";

impl<E: Entity> QueryBuilder<E> {
    /// Render the SELECT with parameters in placeholder order
    pub fn to_sql(&self) -> ModelResult<CompiledQuery> {
        let table = quote_identifier(self.metadata.resolve_table());
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();

        if self.plan.windows.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&table);
            sql.push_str(".*");
            for window in &self.plan.windows {
                sql.push_str(", ");
                window.render(&mut sql, &mut params);
            }
        }

        sql.push_str(" FROM ");
        sql.push_str(&table);

        build_where_clause(&mut sql, &mut params, &self.plan.conditions);
        build_order_clause(&mut sql, &mut params, &self.plan.order_by);
        build_limit_clause(&mut sql, &mut params, self.plan.limit, self.plan.offset);

        Ok(CompiledQuery { sql, params })
    }

    /// Render `SELECT COUNT(*)` over the same filters, ignoring ordering and paging
    pub fn to_count_sql(&self) -> ModelResult<CompiledQuery> {
        let mut sql = format!(
            "SELECT COUNT(*) FROM {}",
            quote_identifier(self.metadata.resolve_table())
        );
        let mut params = Vec::new();
        build_where_clause(&mut sql, &mut params, &self.plan.conditions);
        Ok(CompiledQuery { sql, params })
    }
}

fn build_where_clause(sql: &mut String, params: &mut Vec<DatabaseValue>, conditions: &[Condition]) {
    if conditions.is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        render_condition(sql, params, condition, conditions.len() > 1);
    }
}

fn build_order_clause(sql: &mut String, params: &mut Vec<DatabaseValue>, order_by: &[OrderTerm]) {
    if order_by.is_empty() {
        return;
    }
    sql.push_str(" ORDER BY ");
    for (i, term) in order_by.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        match term {
            OrderTerm::Column { column, direction } => {
                sql.push_str(&quote_identifier(column));
                sql.push(' ');
                sql.push_str(&direction.to_string());
            }
            OrderTerm::Relevance { clause, direction } => {
                render_full_text(sql, params, clause);
                sql.push(' ');
                sql.push_str(&direction.to_string());
            }
        }
    }
}

fn build_limit_clause(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    limit: Option<u64>,
    offset: Option<u64>,
) {
    match (limit, offset) {
        (Some(limit), _) => {
            sql.push_str(" LIMIT ?");
            params.push(DatabaseValue::UInt64(limit));
        }
        (None, Some(_)) => {
            sql.push_str(&format!(" LIMIT {}", MAX_ROW_COUNT));
        }
        (None, None) => {}
    }
    if let Some(offset) = offset {
        sql.push_str(" OFFSET ?");
        params.push(DatabaseValue::UInt64(offset));
    }
}

/// Render one predicate; `nested` wraps groups in parentheses
fn render_condition(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    condition: &Condition,
    nested: bool,
) {
    match condition {
        Condition::Compare {
            column,
            operator,
            values,
        } => render_compare(sql, params, column, *operator, values),
        Condition::All(children) => render_group(sql, params, children, " AND ", "1 = 1", nested),
        Condition::Any(children) => render_group(sql, params, children, " OR ", "1 = 0", nested),
        Condition::Not(inner) => {
            sql.push_str("NOT (");
            render_condition(sql, params, inner, false);
            sql.push(')');
        }
        Condition::FullText(clause) => render_full_text(sql, params, clause),
    }
}

fn render_group(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    children: &[Condition],
    separator: &str,
    when_empty: &str,
    nested: bool,
) {
    match children {
        [] => sql.push_str(when_empty),
        [only] => render_condition(sql, params, only, nested),
        _ => {
            if nested {
                sql.push('(');
            }
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    sql.push_str(separator);
                }
                render_condition(sql, params, child, true);
            }
            if nested {
                sql.push(')');
            }
        }
    }
}

fn render_compare(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    column: &str,
    operator: QueryOperator,
    values: &[DatabaseValue],
) {
    let quoted = quote_identifier(column);
    match operator {
        QueryOperator::In | QueryOperator::NotIn if values.is_empty() => {
            sql.push_str(if operator == QueryOperator::In { "1 = 0" } else { "1 = 1" });
        }
        QueryOperator::In | QueryOperator::NotIn => {
            sql.push_str(&format!("{} {} ({})", quoted, operator, placeholders(values.len())));
            params.extend(values.iter().cloned());
        }
        QueryOperator::IsNull | QueryOperator::IsNotNull => {
            sql.push_str(&format!("{} {}", quoted, operator));
        }
        QueryOperator::Between => {
            sql.push_str(&format!("{} BETWEEN ? AND ?", quoted));
            params.extend(values.iter().take(2).cloned());
        }
        _ => {
            sql.push_str(&format!("{} {} ?", quoted, operator));
            params.extend(values.iter().take(1).cloned());
        }
    }
}

fn render_full_text(sql: &mut String, params: &mut Vec<DatabaseValue>, clause: &FullTextClause) {
    let columns: Vec<String> = clause.columns.iter().map(|c| quote_identifier(c)).collect();
    sql.push_str(&format!(
        "MATCH({}) AGAINST(? {})",
        columns.join(", "),
        clause.mode
    ));
    params.push(DatabaseValue::String(clause.phrase.clone()));
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `SELECT * FROM table WHERE column IN (?, ...)`
pub fn select_where_in(table: &str, column: &str, keys: Vec<DatabaseValue>) -> CompiledQuery {
    let sql = format!(
        "SELECT * FROM {} WHERE {} IN ({})",
        quote_identifier(table),
        quote_identifier(column),
        placeholders(keys.len())
    );
    CompiledQuery { sql, params: keys }
}

/// Related rows joined to a junction table, each tagged with the junction's
/// parent key under [`PARENT_KEY_ALIAS`]
pub fn select_through_junction(
    table: &str,
    primary_key_column: &str,
    junction: &JunctionTable,
    keys: Vec<DatabaseValue>,
) -> CompiledQuery {
    let related = quote_identifier(table);
    let link = quote_identifier(&junction.table);
    let parent_column = format!("{}.{}", link, quote_identifier(&junction.parent_column));

    let sql = format!(
        "SELECT {related}.*, {parent_column} AS {alias} FROM {related} \
         INNER JOIN {link} ON {related}.{pk} = {link}.{child} \
         WHERE {parent_column} IN ({placeholders})",
        related = related,
        parent_column = parent_column,
        alias = quote_identifier(PARENT_KEY_ALIAS),
        link = link,
        pk = quote_identifier(primary_key_column),
        child = quote_identifier(&junction.child_column),
        placeholders = placeholders(keys.len()),
    );
    CompiledQuery { sql, params: keys }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_where_in() {
        let query = select_where_in("book", "author_id", vec![1i64.into(), 3i64.into()]);
        assert_eq!(query.sql, "SELECT * FROM `book` WHERE `author_id` IN (?, ?)");
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_select_through_junction() {
        let junction = JunctionTable::new("book_tags", "book_id", "tag_id");
        let query = select_through_junction("tag", "id", &junction, vec![7i64.into()]);
        assert_eq!(
            query.sql,
            "SELECT `tag`.*, `book_tags`.`book_id` AS `__parent_key` FROM `tag` \
             INNER JOIN `book_tags` ON `tag`.`id` = `book_tags`.`tag_id` \
             WHERE `book_tags`.`book_id` IN (?)"
        );
    }

    #[test]
    fn test_offset_without_limit_uses_max_row_count() {
        let mut sql = String::new();
        let mut params = Vec::new();
        build_limit_clause(&mut sql, &mut params, None, Some(20));
        assert_eq!(sql, " LIMIT 18446744073709551615 OFFSET ?");
        assert_eq!(params, vec![DatabaseValue::UInt64(20)]);
    }

    #[test]
    fn test_empty_groups() {
        let mut sql = String::new();
        render_condition(&mut sql, &mut Vec::new(), &Condition::Any(Vec::new()), false);
        assert_eq!(sql, "1 = 0");
    }
}
