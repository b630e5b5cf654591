//! WindowTable random-access table contract.
//!
//! `RandomAccessTable` is what every stage consumes and produces: a schema,
//! a row count (possibly unknown until the data has been scanned) and
//! row lookup by index. Row indices are stable for the lifetime of a table
//! instance, and the row returned for an index never changes.
//!
//! Tables are shared as [`TableRef`] (`Rc<dyn RandomAccessTable>`); derived
//! tables keep their parent alive through that reference.
//!
//! # Examples
//!
//! ```
//! use windowtable::{ColumnType, ColumnValue, MaterializedTable, RandomAccessTable, Row, Schema};
//!
//! let schema = Schema::new(vec![
//!     ("id".to_string(), ColumnType::Int32, false),
//!     ("score".to_string(), ColumnType::Float64, false),
//! ]);
//!
//! let table = MaterializedTable::new(schema, vec![
//!     Row::new("row_0", vec![ColumnValue::Int32(1), ColumnValue::Float64(95.5)]),
//! ]);
//!
//! assert_eq!(table.row_count(), Some(1));
//! assert_eq!(table.get_row(0).unwrap().get(1), Some(&ColumnValue::Float64(95.5)));
//! ```

use crate::column::ColumnValue;
use crate::error::{Error, Result};
use crate::schema::Schema;
use std::rc::Rc;

/// One row: a key identifying it plus one cell per schema column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    key: String,
    cells: Vec<ColumnValue>,
}

impl Row {
    pub fn new(key: impl Into<String>, cells: Vec<ColumnValue>) -> Self {
        Row {
            key: key.into(),
            cells,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cells(&self) -> &[ColumnValue] {
        &self.cells
    }

    pub fn get(&self, column: usize) -> Option<&ColumnValue> {
        self.cells.get(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// New row with the same key holding the cells at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> Row {
        Row {
            key: self.key.clone(),
            cells: indices
                .iter()
                .map(|&i| self.cells.get(i).cloned().unwrap_or(ColumnValue::Null))
                .collect(),
        }
    }

    pub fn into_cells(self) -> Vec<ColumnValue> {
        self.cells
    }
}

/// Capability contract for retrieving any row by index.
pub trait RandomAccessTable {
    /// Column layout of every row this table returns.
    fn schema(&self) -> &Schema;

    /// Total number of rows, or `None` while it is not yet known.
    fn row_count(&self) -> Option<usize>;

    /// Row at `index`. Fails with `OutOfRange` past the end.
    fn get_row(&self, index: usize) -> Result<Row>;

    /// An independent table over the same data, if this table can produce
    /// one. Reading from the fork never disturbs this table's state.
    fn fork(&self) -> Option<TableRef> {
        None
    }

    fn column_count(&self) -> usize {
        self.schema().len()
    }
}

pub type TableRef = Rc<dyn RandomAccessTable>;

/// Row at `index`, or `None` once `index` is past the end of the table.
///
/// Lets stages walk tables whose row count is not known yet.
pub fn row_or_end(table: &dyn RandomAccessTable, index: usize) -> Result<Option<Row>> {
    if let Some(count) = table.row_count() {
        if index >= count {
            return Ok(None);
        }
    }
    match table.get_row(index) {
        Ok(row) => Ok(Some(row)),
        Err(Error::OutOfRange { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Collects every row of `table` in index order.
pub fn collect_rows(table: &dyn RandomAccessTable) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = row_or_end(table, rows.len())? {
        rows.push(row);
    }
    Ok(rows)
}

/// Fully in-memory random-access table.
#[derive(Debug, Clone)]
pub struct MaterializedTable {
    schema: Schema,
    rows: Vec<Row>,
}

impl MaterializedTable {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        MaterializedTable { schema, rows }
    }

    /// Materializes another table by reading all of its rows.
    pub fn from_table(table: &dyn RandomAccessTable) -> Result<Self> {
        Ok(MaterializedTable {
            schema: table.schema().clone(),
            rows: collect_rows(table)?,
        })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl RandomAccessTable for MaterializedTable {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    fn get_row(&self, index: usize) -> Result<Row> {
        self.rows.get(index).cloned().ok_or(Error::OutOfRange {
            index,
            row_count: Some(self.rows.len()),
        })
    }
}
