//! Transformation descriptions.
//!
//! A [`Transformation`] is an immutable description of one pipeline stage.
//! [`Transformation::apply`] turns an input table into the stage's output
//! table; the set of stage kinds is closed and dispatched by `match`.

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::monitor::ExecutionMonitor;
use crate::table::{Row, TableRef};
use crate::view::{FilteredTable, ProjectedTable, RowPredicate, SortKey, SortedTable};
use std::fmt;
use std::rc::Rc;

/// Which columns a projection stage keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionInfo {
    columns: Option<Vec<String>>,
}

impl ProjectionInfo {
    /// Keeps every input column.
    pub fn all() -> Self {
        ProjectionInfo { columns: None }
    }

    /// Keeps the named columns, in this order.
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProjectionInfo {
            columns: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// The selected names, or `None` when every column is kept.
    pub fn column_names(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }
}

/// Sort keys of a sort stage, primary key first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortInfo {
    keys: Vec<SortKey>,
}

impl SortInfo {
    pub fn new(keys: Vec<SortKey>) -> Self {
        SortInfo { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}

impl From<Vec<SortKey>> for SortInfo {
    fn from(keys: Vec<SortKey>) -> Self {
        SortInfo::new(keys)
    }
}

impl From<SortKey> for SortInfo {
    fn from(key: SortKey) -> Self {
        SortInfo::new(vec![key])
    }
}

/// Description of a filter stage's predicate.
#[derive(Clone)]
pub enum FilterInfo {
    /// An expression over column names, bound to the input schema when the
    /// stage runs.
    Expression(Expr),
    /// An arbitrary predicate over whole rows.
    Predicate(RowPredicate),
    /// A predicate description this crate cannot evaluate, such as one
    /// produced by another front end. Pipelines refuse it.
    Unsupported { kind: String },
}

impl FilterInfo {
    /// Parses a filter expression such as `score > 90 AND name != 'Bob'`.
    pub fn expression(text: &str) -> Result<Self> {
        Ok(FilterInfo::Expression(Expr::parse(text)?))
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + 'static,
    {
        FilterInfo::Predicate(Rc::new(predicate))
    }

    pub fn kind(&self) -> &str {
        match self {
            FilterInfo::Expression(_) => "expression",
            FilterInfo::Predicate(_) => "predicate",
            FilterInfo::Unsupported { kind } => kind.as_str(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FilterInfo::Unsupported { .. })
    }
}

impl fmt::Debug for FilterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterInfo::Expression(expr) => f.debug_tuple("Expression").field(&expr.to_string()).finish(),
            FilterInfo::Predicate(_) => f.write_str("Predicate(..)"),
            FilterInfo::Unsupported { kind } => f.debug_struct("Unsupported").field("kind", kind).finish(),
        }
    }
}

impl From<Expr> for FilterInfo {
    fn from(expr: Expr) -> Self {
        FilterInfo::Expression(expr)
    }
}

/// One stage of a pipeline.
#[derive(Debug, Clone)]
pub enum Transformation {
    Projection(ProjectionInfo),
    Sort(SortInfo),
    Filter(FilterInfo),
}

impl Transformation {
    pub fn name(&self) -> &'static str {
        match self {
            Transformation::Projection(_) => "projection",
            Transformation::Sort(_) => "sort",
            Transformation::Filter(_) => "filter",
        }
    }

    /// Message reported to the monitor while the stage runs.
    pub fn phase_message(&self) -> &'static str {
        match self {
            Transformation::Projection(_) => "Selecting columns...",
            Transformation::Sort(_) => "Sorting...",
            Transformation::Filter(_) => "Filtering...",
        }
    }

    /// Produces this stage's output table from `input`.
    ///
    /// A projection starts from a fork of `input` when the input can fork,
    /// so reading the output never moves the cursor of a table the caller
    /// still holds. Sorts and filters resolve their whole output before
    /// returning and poll `monitor` while doing so.
    pub fn apply(&self, input: TableRef, monitor: &dyn ExecutionMonitor) -> Result<TableRef> {
        match self {
            Transformation::Projection(info) => {
                let base = input.fork().unwrap_or(input);
                match info.column_names() {
                    Some(columns) => Ok(Rc::new(ProjectedTable::new(base, columns)?)),
                    None => Ok(base),
                }
            }
            Transformation::Sort(info) => Ok(Rc::new(SortedTable::with_monitor(
                input,
                info.keys().to_vec(),
                monitor,
            )?)),
            Transformation::Filter(info) => {
                let filtered = match info {
                    FilterInfo::Expression(expr) => FilteredTable::from_expr(input, expr)?,
                    FilterInfo::Predicate(predicate) => {
                        FilteredTable::with_predicate(input, Rc::clone(predicate))
                    }
                    FilterInfo::Unsupported { kind } => {
                        return Err(Error::invalid(format!("Unsupported filter kind '{}'", kind)))
                    }
                };
                let matched = filtered.scan_all(monitor)?;
                log::debug!("Filter kept {} rows", matched);
                Ok(Rc::new(filtered))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnType, ColumnValue};
    use crate::monitor::NoopMonitor;
    use crate::schema::Schema;
    use crate::table::{MaterializedTable, RandomAccessTable};

    fn scores() -> TableRef {
        let schema = Schema::new(vec![
            ("name".to_string(), ColumnType::String, false),
            ("score".to_string(), ColumnType::Int32, false),
        ]);
        let rows = [("Alice", 92), ("Bob", 85), ("Cara", 97)]
            .iter()
            .map(|(name, score)| {
                Row::new(
                    *name,
                    vec![ColumnValue::String(name.to_string()), ColumnValue::Int32(*score)],
                )
            })
            .collect();
        Rc::new(MaterializedTable::new(schema, rows))
    }

    #[test]
    fn test_projection_all_passes_table_through() {
        let input = scores();
        let output = Transformation::Projection(ProjectionInfo::all())
            .apply(Rc::clone(&input), &NoopMonitor)
            .unwrap();
        assert!(Rc::ptr_eq(&input, &output));
    }

    #[test]
    fn test_projection_named_columns() {
        let output = Transformation::Projection(ProjectionInfo::columns(["score"]))
            .apply(scores(), &NoopMonitor)
            .unwrap();
        assert_eq!(output.schema().get_column_names(), vec!["score"]);
        assert_eq!(output.get_row(2).unwrap().get(0), Some(&ColumnValue::Int32(97)));

        let result = Transformation::Projection(ProjectionInfo::columns(["rank"]))
            .apply(scores(), &NoopMonitor);
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_sort_and_filter_stages() {
        let sorted = Transformation::Sort(SortKey::descending("score").into())
            .apply(scores(), &NoopMonitor)
            .unwrap();
        assert_eq!(sorted.get_row(0).unwrap().key(), "Cara");

        let filtered = Transformation::Filter(FilterInfo::expression("score > 90").unwrap())
            .apply(sorted, &NoopMonitor)
            .unwrap();
        assert_eq!(filtered.row_count(), Some(2));
        assert_eq!(filtered.get_row(1).unwrap().key(), "Alice");
    }

    #[test]
    fn test_predicate_filter_is_resolved_eagerly() {
        let filtered = Transformation::Filter(FilterInfo::predicate(|row| row.key().starts_with('B')))
            .apply(scores(), &NoopMonitor)
            .unwrap();
        assert_eq!(filtered.row_count(), Some(1));
    }

    #[test]
    fn test_unsupported_filter_is_rejected() {
        let info = FilterInfo::Unsupported {
            kind: "regex".to_string(),
        };
        assert!(!info.is_supported());
        assert_eq!(info.kind(), "regex");
        let result = Transformation::Filter(info).apply(scores(), &NoopMonitor);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_names_and_messages() {
        let stage = Transformation::Sort(SortInfo::new(vec![SortKey::ascending("score")]));
        assert_eq!(stage.name(), "sort");
        assert_eq!(stage.phase_message(), "Sorting...");
        assert_eq!(
            format!("{:?}", FilterInfo::predicate(|_| true)),
            "Predicate(..)"
        );
    }
}
