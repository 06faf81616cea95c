//! Window functions and OVER clause support.
//!
//! A window is opened on the query builder by choosing a function
//! (`row_number`, `lag`, `window_sum`, ...), refined with partitioning,
//! ordering and an optional frame, and closed with [`WindowBuilder::end_window`]
//! which validates the function and frame and hands the builder back.
//!
//! ```ignore
//! let query = Book::query()
//!     .rank()
//!     .partition_by("genre")
//!     .order_by_desc("price")
//!     .alias("price_rank")
//!     .end_window()?;
//! ```

use std::fmt;
use std::str::FromStr;

use crate::backends::{quote_identifier, DatabaseValue};
use crate::conversion::NativeValue;
use crate::error::{ModelError, ModelResult};
use crate::model::Entity;

use super::builder::QueryBuilder;
use super::types::OrderDirection;

// =============================================================================
// Frame Bounds
// =============================================================================

/// Specifies a bound for a window frame (ROWS/RANGE BETWEEN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    /// UNBOUNDED PRECEDING
    UnboundedPreceding,
    /// N PRECEDING
    Preceding(u64),
    /// CURRENT ROW
    CurrentRow,
    /// N FOLLOWING
    Following(u64),
    /// UNBOUNDED FOLLOWING
    UnboundedFollowing,
}

impl fmt::Display for FrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameBound::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            FrameBound::Preceding(n) => write!(f, "{} PRECEDING", n),
            FrameBound::CurrentRow => write!(f, "CURRENT ROW"),
            FrameBound::Following(n) => write!(f, "{} FOLLOWING", n),
            FrameBound::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}

impl FromStr for FrameBound {
    type Err = ModelError;

    /// Case-insensitive; words may be separated by any whitespace
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|word| word.to_ascii_uppercase())
            .collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        let bound = match words.as_slice() {
            ["UNBOUNDED", "PRECEDING"] => Some(FrameBound::UnboundedPreceding),
            ["CURRENT", "ROW"] => Some(FrameBound::CurrentRow),
            ["UNBOUNDED", "FOLLOWING"] => Some(FrameBound::UnboundedFollowing),
            [n, "PRECEDING"] => n.parse().ok().map(FrameBound::Preceding),
            [n, "FOLLOWING"] => n.parse().ok().map(FrameBound::Following),
            _ => None,
        };

        bound.ok_or_else(|| {
            ModelError::Configuration(format!("Invalid window frame bound '{}'", text))
        })
    }
}

/// ROWS or RANGE framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
}

impl fmt::Display for FrameUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameUnit::Rows => write!(f, "ROWS"),
            FrameUnit::Range => write!(f, "RANGE"),
        }
    }
}

/// `ROWS|RANGE BETWEEN start AND end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFrame {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: FrameBound,
}

impl WindowFrame {
    pub fn new(unit: FrameUnit, start: FrameBound, end: FrameBound) -> ModelResult<Self> {
        if end == FrameBound::UnboundedPreceding {
            return Err(ModelError::Configuration(format!(
                "Window frame cannot end at UNBOUNDED PRECEDING (starts at {})",
                start
            )));
        }
        if start == FrameBound::UnboundedFollowing {
            return Err(ModelError::Configuration(
                "Window frame cannot start at UNBOUNDED FOLLOWING".to_string(),
            ));
        }
        Ok(Self { unit, start, end })
    }
}

impl fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BETWEEN {} AND {}", self.unit, self.start, self.end)
    }
}

// =============================================================================
// Window Functions
// =============================================================================

/// Window function chosen by the caller, referring to entity fields
#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunction {
    RowNumber,
    Rank,
    DenseRank,
    PercentRank,
    CumeDist,
    Ntile(u64),
    Lag {
        field: String,
        offset: u64,
        default: Option<NativeValue>,
    },
    Lead {
        field: String,
        offset: u64,
        default: Option<NativeValue>,
    },
    FirstValue(String),
    LastValue(String),
    NthValue(String, u64),
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
    /// `None` counts every row
    Count(Option<String>),
}

impl WindowFunction {
    pub fn sql_name(&self) -> &'static str {
        match self {
            WindowFunction::RowNumber => "ROW_NUMBER",
            WindowFunction::Rank => "RANK",
            WindowFunction::DenseRank => "DENSE_RANK",
            WindowFunction::PercentRank => "PERCENT_RANK",
            WindowFunction::CumeDist => "CUME_DIST",
            WindowFunction::Ntile(_) => "NTILE",
            WindowFunction::Lag { .. } => "LAG",
            WindowFunction::Lead { .. } => "LEAD",
            WindowFunction::FirstValue(_) => "FIRST_VALUE",
            WindowFunction::LastValue(_) => "LAST_VALUE",
            WindowFunction::NthValue(..) => "NTH_VALUE",
            WindowFunction::Sum(_) => "SUM",
            WindowFunction::Avg(_) => "AVG",
            WindowFunction::Min(_) => "MIN",
            WindowFunction::Max(_) => "MAX",
            WindowFunction::Count(_) => "COUNT",
        }
    }

    fn field(&self) -> Option<&str> {
        match self {
            WindowFunction::Lag { field, .. }
            | WindowFunction::Lead { field, .. }
            | WindowFunction::FirstValue(field)
            | WindowFunction::LastValue(field)
            | WindowFunction::NthValue(field, _)
            | WindowFunction::Sum(field)
            | WindowFunction::Avg(field)
            | WindowFunction::Min(field)
            | WindowFunction::Max(field) => Some(field),
            WindowFunction::Count(field) => field.as_deref(),
            _ => None,
        }
    }
}

/// What the function is applied to
#[derive(Debug, Clone, PartialEq)]
pub enum WindowTarget {
    None,
    Column(String),
    Wildcard,
}

/// Argument after the target column
#[derive(Debug, Clone, PartialEq)]
pub enum WindowArgument {
    /// Validated integer rendered inline
    Literal(u64),
    /// Bound as a `?` parameter
    Param(DatabaseValue),
}

/// Finalized window clause
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFunctionSpec {
    pub function: &'static str,
    pub target: WindowTarget,
    pub arguments: Vec<WindowArgument>,
    pub alias: Option<String>,
    pub partition_by: Vec<String>,
    pub order_by: Vec<(String, OrderDirection)>,
    pub frame: Option<WindowFrame>,
}

impl WindowFunctionSpec {
    /// Append `FUNC(args) OVER (...) [AS alias]`, collecting bound parameters
    pub fn render(&self, sql: &mut String, params: &mut Vec<DatabaseValue>) {
        sql.push_str(self.function);
        sql.push('(');

        let mut args = Vec::new();
        match &self.target {
            WindowTarget::None => {}
            WindowTarget::Column(column) => args.push(quote_identifier(column)),
            WindowTarget::Wildcard => args.push("*".to_string()),
        }
        for argument in &self.arguments {
            match argument {
                WindowArgument::Literal(n) => args.push(n.to_string()),
                WindowArgument::Param(value) => {
                    args.push("?".to_string());
                    params.push(value.clone());
                }
            }
        }
        sql.push_str(&args.join(", "));
        sql.push_str(") OVER (");

        let mut clauses = Vec::new();
        if !self.partition_by.is_empty() {
            let columns: Vec<String> = self.partition_by.iter().map(|c| quote_identifier(c)).collect();
            clauses.push(format!("PARTITION BY {}", columns.join(", ")));
        }
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction))
                .collect();
            clauses.push(format!("ORDER BY {}", terms.join(", ")));
        }
        if let Some(frame) = &self.frame {
            clauses.push(frame.to_string());
        }
        sql.push_str(&clauses.join(" "));
        sql.push(')');

        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&quote_identifier(alias));
        }
    }
}

// =============================================================================
// Window sub-builder
// =============================================================================

/// Builder for one window clause; returns to the query with `end_window`.
///
/// The first error raised while building is kept and reported by `end_window`.
pub struct WindowBuilder<E: Entity> {
    query: QueryBuilder<E>,
    spec: WindowFunctionSpec,
    error: Option<ModelError>,
}

impl<E: Entity> WindowBuilder<E> {
    pub(crate) fn open(query: QueryBuilder<E>, function: WindowFunction) -> Self {
        let mut builder = Self {
            spec: WindowFunctionSpec {
                function: function.sql_name(),
                target: WindowTarget::None,
                arguments: Vec::new(),
                alias: None,
                partition_by: Vec::new(),
                order_by: Vec::new(),
                frame: None,
            },
            query,
            error: None,
        };
        if let Err(e) = builder.resolve_function(&function) {
            builder.error = Some(e);
        }
        builder
    }

    fn resolve_function(&mut self, function: &WindowFunction) -> ModelResult<()> {
        let metadata = self.query.metadata.clone();
        let descriptor = match function.field() {
            Some(field) => Some(metadata.resolve_field(field)?),
            None => None,
        };

        self.spec.target = match (function, descriptor) {
            (WindowFunction::Count(None), _) => WindowTarget::Wildcard,
            (_, Some(descriptor)) => WindowTarget::Column(descriptor.column.clone()),
            (_, None) => WindowTarget::None,
        };

        match function {
            WindowFunction::Ntile(0) => {
                return Err(ModelError::Configuration(
                    "NTILE bucket count must be at least 1".to_string(),
                ));
            }
            WindowFunction::Ntile(buckets) => {
                self.spec.arguments.push(WindowArgument::Literal(*buckets));
            }
            WindowFunction::NthValue(_, 0) => {
                return Err(ModelError::Configuration(
                    "NTH_VALUE position must be at least 1".to_string(),
                ));
            }
            WindowFunction::NthValue(_, position) => {
                self.spec.arguments.push(WindowArgument::Literal(*position));
            }
            WindowFunction::Lag { offset, default, .. } | WindowFunction::Lead { offset, default, .. } => {
                self.spec
                    .arguments
                    .push(WindowArgument::Param(DatabaseValue::UInt64(*offset)));
                if let (Some(value), Some(descriptor)) = (default, descriptor) {
                    let stored = self.query.converter.to_storage(
                        value,
                        descriptor.native_type,
                        &descriptor.hints,
                    )?;
                    self.spec.arguments.push(WindowArgument::Param(stored));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn record(&mut self, result: ModelResult<()>) {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
    }

    fn column_of(&self, field: &str) -> ModelResult<String> {
        self.query.metadata.resolve_column(field).map(str::to_string)
    }

    /// Add a PARTITION BY field
    pub fn partition_by(mut self, field: &str) -> Self {
        let result = self.column_of(field).map(|column| self.spec.partition_by.push(column));
        self.record(result);
        self
    }

    /// Add a PARTITION BY column without field resolution
    pub fn partition_by_column(mut self, column: &str) -> Self {
        self.spec.partition_by.push(column.to_string());
        self
    }

    /// Add an ascending ORDER BY field inside the window
    pub fn order_by(self, field: &str) -> Self {
        self.order_by_direction(field, OrderDirection::Asc)
    }

    /// Add a descending ORDER BY field inside the window
    pub fn order_by_desc(self, field: &str) -> Self {
        self.order_by_direction(field, OrderDirection::Desc)
    }

    pub fn order_by_direction(mut self, field: &str, direction: OrderDirection) -> Self {
        let result = self
            .column_of(field)
            .map(|column| self.spec.order_by.push((column, direction)));
        self.record(result);
        self
    }

    /// Add an ORDER BY column without field resolution
    pub fn order_by_column(mut self, column: &str, direction: OrderDirection) -> Self {
        self.spec.order_by.push((column.to_string(), direction));
        self
    }

    /// Set a ROWS frame
    pub fn rows(self, start: FrameBound, end: FrameBound) -> Self {
        self.frame(FrameUnit::Rows, start, end)
    }

    /// Set a RANGE frame
    pub fn range(self, start: FrameBound, end: FrameBound) -> Self {
        self.frame(FrameUnit::Range, start, end)
    }

    /// Set a ROWS frame from textual bounds such as `"2 PRECEDING"`
    pub fn rows_between(self, start: &str, end: &str) -> Self {
        self.frame_from_text(FrameUnit::Rows, start, end)
    }

    /// Set a RANGE frame from textual bounds
    pub fn range_between(self, start: &str, end: &str) -> Self {
        self.frame_from_text(FrameUnit::Range, start, end)
    }

    fn frame_from_text(mut self, unit: FrameUnit, start: &str, end: &str) -> Self {
        match (start.parse::<FrameBound>(), end.parse::<FrameBound>()) {
            (Ok(start), Ok(end)) => self.frame(unit, start, end),
            (Err(e), _) | (_, Err(e)) => {
                self.record(Err(e));
                self
            }
        }
    }

    fn frame(mut self, unit: FrameUnit, start: FrameBound, end: FrameBound) -> Self {
        let result = WindowFrame::new(unit, start, end).map(|frame| self.spec.frame = Some(frame));
        self.record(result);
        self
    }

    /// Name the result column
    pub fn alias(mut self, alias: &str) -> Self {
        self.spec.alias = Some(alias.to_string());
        self
    }

    /// Finalize the window clause and return to the query
    pub fn end_window(self) -> ModelResult<QueryBuilder<E>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let mut query = self.query;
        query.plan.windows.push(self.spec);
        Ok(query)
    }
}

impl<E: Entity> QueryBuilder<E> {
    /// Open a window clause for any function
    pub fn window(self, function: WindowFunction) -> WindowBuilder<E> {
        WindowBuilder::open(self, function)
    }

    pub fn row_number(self) -> WindowBuilder<E> {
        self.window(WindowFunction::RowNumber)
    }

    pub fn rank(self) -> WindowBuilder<E> {
        self.window(WindowFunction::Rank)
    }

    pub fn dense_rank(self) -> WindowBuilder<E> {
        self.window(WindowFunction::DenseRank)
    }

    pub fn percent_rank(self) -> WindowBuilder<E> {
        self.window(WindowFunction::PercentRank)
    }

    pub fn cume_dist(self) -> WindowBuilder<E> {
        self.window(WindowFunction::CumeDist)
    }

    /// NTILE(buckets); zero buckets is rejected by `end_window`
    pub fn ntile(self, buckets: u64) -> WindowBuilder<E> {
        self.window(WindowFunction::Ntile(buckets))
    }

    pub fn lag(self, field: &str, offset: u64) -> WindowBuilder<E> {
        self.window(WindowFunction::Lag {
            field: field.to_string(),
            offset,
            default: None,
        })
    }

    pub fn lag_with_default(
        self,
        field: &str,
        offset: u64,
        default: impl Into<NativeValue>,
    ) -> WindowBuilder<E> {
        self.window(WindowFunction::Lag {
            field: field.to_string(),
            offset,
            default: Some(default.into()),
        })
    }

    pub fn lead(self, field: &str, offset: u64) -> WindowBuilder<E> {
        self.window(WindowFunction::Lead {
            field: field.to_string(),
            offset,
            default: None,
        })
    }

    pub fn lead_with_default(
        self,
        field: &str,
        offset: u64,
        default: impl Into<NativeValue>,
    ) -> WindowBuilder<E> {
        self.window(WindowFunction::Lead {
            field: field.to_string(),
            offset,
            default: Some(default.into()),
        })
    }

    pub fn first_value(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::FirstValue(field.to_string()))
    }

    pub fn last_value(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::LastValue(field.to_string()))
    }

    /// NTH_VALUE(field, position); positions start at 1
    pub fn nth_value(self, field: &str, position: u64) -> WindowBuilder<E> {
        self.window(WindowFunction::NthValue(field.to_string(), position))
    }

    pub fn window_sum(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::Sum(field.to_string()))
    }

    pub fn window_avg(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::Avg(field.to_string()))
    }

    pub fn window_min(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::Min(field.to_string()))
    }

    pub fn window_max(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::Max(field.to_string()))
    }

    pub fn window_count(self, field: &str) -> WindowBuilder<E> {
        self.window(WindowFunction::Count(Some(field.to_string())))
    }

    /// COUNT(*) over the window
    pub fn window_count_all(self) -> WindowBuilder<E> {
        self.window(WindowFunction::Count(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_bounds() {
        assert_eq!(
            "UNBOUNDED PRECEDING".parse::<FrameBound>().unwrap(),
            FrameBound::UnboundedPreceding
        );
        assert_eq!("3 preceding".parse::<FrameBound>().unwrap(), FrameBound::Preceding(3));
        assert_eq!("Current  Row".parse::<FrameBound>().unwrap(), FrameBound::CurrentRow);
        assert_eq!("10 FOLLOWING".parse::<FrameBound>().unwrap(), FrameBound::Following(10));
        assert_eq!(
            " unbounded following ".parse::<FrameBound>().unwrap(),
            FrameBound::UnboundedFollowing
        );
    }

    #[test]
    fn test_invalid_frame_bound_names_the_text() {
        let err = "BOGUS".parse::<FrameBound>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'BOGUS'"));
        assert!("-1 PRECEDING".parse::<FrameBound>().is_err());
        assert!("ROW CURRENT".parse::<FrameBound>().is_err());
    }

    #[test]
    fn test_frame_rejects_unbounded_preceding_end() {
        assert!(WindowFrame::new(
            FrameUnit::Rows,
            FrameBound::UnboundedPreceding,
            FrameBound::UnboundedPreceding
        )
        .is_err());
        assert!(WindowFrame::new(
            FrameUnit::Range,
            FrameBound::UnboundedFollowing,
            FrameBound::UnboundedFollowing
        )
        .is_err());
        let frame =
            WindowFrame::new(FrameUnit::Rows, FrameBound::Preceding(2), FrameBound::CurrentRow)
                .unwrap();
        assert_eq!(frame.to_string(), "ROWS BETWEEN 2 PRECEDING AND CURRENT ROW");
    }

    #[test]
    fn test_render_spec_with_bound_arguments() {
        let spec = WindowFunctionSpec {
            function: "LAG",
            target: WindowTarget::Column("price".into()),
            arguments: vec![
                WindowArgument::Param(DatabaseValue::UInt64(1)),
                WindowArgument::Param(DatabaseValue::Int64(0)),
            ],
            alias: Some("previous_price".into()),
            partition_by: vec!["genre".into()],
            order_by: vec![("published_on".into(), OrderDirection::Asc)],
            frame: None,
        };

        let mut sql = String::new();
        let mut params = Vec::new();
        spec.render(&mut sql, &mut params);

        assert_eq!(
            sql,
            "LAG(`price`, ?, ?) OVER (PARTITION BY `genre` ORDER BY `published_on` ASC) AS `previous_price`"
        );
        assert_eq!(params, vec![DatabaseValue::UInt64(1), DatabaseValue::Int64(0)]);
    }

    #[test]
    fn test_render_empty_over_clause() {
        let spec = WindowFunctionSpec {
            function: "COUNT",
            target: WindowTarget::Wildcard,
            arguments: Vec::new(),
            alias: None,
            partition_by: Vec::new(),
            order_by: Vec::new(),
            frame: None,
        };
        let mut sql = String::new();
        spec.render(&mut sql, &mut Vec::new());
        assert_eq!(sql, "COUNT(*) OVER ()");
    }
}
