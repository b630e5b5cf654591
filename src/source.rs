//! Forward-only data sources.
//!
//! A [`SequentialSource`] can only be read front to back. Each call to
//! [`SequentialSource::open`] hands out a fresh, lazy, finite iterator that
//! starts at row 0; an iterator can never be rewound. Restarting a scan means
//! opening the source again, which is how the
//! [`WindowCache`](crate::cache::WindowCache) serves backward access.

use crate::column::{ColumnType, ColumnValue};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::table::Row;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::cell::Cell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A lazy forward cursor over the rows of a source.
pub type RowIter = Box<dyn Iterator<Item = Result<Row>>>;

/// A dataset exposing only forward iteration.
pub trait SequentialSource {
    /// Column layout of the rows the iterator yields.
    fn schema(&self) -> &Schema;

    /// Starts a new scan from the first row.
    fn open(&self) -> Result<RowIter>;

    /// Number of rows, when the source knows it up front.
    fn row_count_hint(&self) -> Option<usize> {
        None
    }
}

/// In-memory source. Rows are shared between all open iterators.
#[derive(Debug, Clone)]
pub struct VecSource {
    schema: Schema,
    rows: Rc<Vec<Row>>,
    known_length: bool,
    opens: Rc<Cell<usize>>,
}

impl VecSource {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        VecSource {
            schema,
            rows: Rc::new(rows),
            known_length: true,
            opens: Rc::new(Cell::new(0)),
        }
    }

    /// Hides the row count, so consumers only learn it by running off the end.
    pub fn with_unknown_length(mut self) -> Self {
        self.known_length = false;
        self
    }

    /// How many scans have been started on this source (shared by clones).
    pub fn open_count(&self) -> usize {
        self.opens.get()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl SequentialSource for VecSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&self) -> Result<RowIter> {
        self.opens.set(self.opens.get() + 1);
        let rows = Rc::clone(&self.rows);
        Ok(Box::new((0..rows.len()).map(move |i| Ok(rows[i].clone()))))
    }

    fn row_count_hint(&self) -> Option<usize> {
        if self.known_length {
            Some(self.rows.len())
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRow {
    #[serde(default)]
    key: Option<String>,
    cells: Vec<JsonValue>,
}

/// File-backed source: one JSON object per line,
/// `{"key": "row_0", "cells": [1.5, "a", null]}`.
///
/// Cells are converted to the schema's column types while reading. Rows
/// without a key are keyed `row_<n>`. Blank lines are skipped. The row count
/// is never known up front.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
    schema: Schema,
}

impl JsonLinesSource {
    pub fn new(path: impl AsRef<Path>, schema: Schema) -> Self {
        JsonLinesSource {
            path: path.as_ref().to_path_buf(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SequentialSource for JsonLinesSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open(&self) -> Result<RowIter> {
        let file = File::open(&self.path)?;
        let types: Vec<ColumnType> = self.schema.columns().iter().map(|c| c.column_type).collect();
        let lines = BufReader::new(file)
            .lines()
            .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()));
        Ok(Box::new(lines.enumerate().map(move |(n, line)| {
            let line = line?;
            parse_json_row(&line, n, &types)
        })))
    }
}

fn parse_json_row(line: &str, n: usize, types: &[ColumnType]) -> Result<Row> {
    let raw: JsonRow = serde_json::from_str(line)?;
    if raw.cells.len() != types.len() {
        return Err(Error::Source(format!(
            "Row {} has {} cells, schema has {} columns",
            n,
            raw.cells.len(),
            types.len()
        )));
    }
    let cells = raw
        .cells
        .iter()
        .zip(types)
        .enumerate()
        .map(|(col, (value, ty))| {
            ColumnValue::from_json(value, *ty).ok_or_else(|| {
                Error::Source(format!(
                    "Row {} column {}: {} is not a valid {:?}",
                    n, col, value, ty
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let key = raw.key.unwrap_or_else(|| format!("row_{}", n));
    Ok(Row::new(key, cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn schema() -> Schema {
        Schema::new(vec![
            ("x".to_string(), ColumnType::Float64, false),
            ("label".to_string(), ColumnType::String, true),
        ])
    }

    #[test]
    fn test_vec_source_restarts_from_zero() {
        let rows: Vec<Row> = (0..4)
            .map(|i| Row::new(format!("row_{}", i), vec![ColumnValue::Float64(i as f64), ColumnValue::Null]))
            .collect();
        let source = VecSource::new(schema(), rows);

        let mut first = source.open().unwrap();
        first.next();
        first.next();
        let mut second = source.open().unwrap();
        assert_eq!(second.next().unwrap().unwrap().key(), "row_0");
        assert_eq!(source.open_count(), 2);
        assert_eq!(source.row_count_hint(), Some(4));
        assert_eq!(source.clone().with_unknown_length().row_count_hint(), None);
    }

    #[test]
    fn test_json_lines_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"key": "a", "cells": [1, "one"]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"cells": [2.5, null]}}"#).unwrap();
        file.flush().unwrap();

        let source = JsonLinesSource::new(file.path(), schema());
        let rows: Vec<Row> = source.open().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(), "a");
        assert_eq!(rows[0].get(0), Some(&ColumnValue::Float64(1.0)));
        assert_eq!(rows[1].key(), "row_1");
        assert!(rows[1].get(1).unwrap().is_null());
        assert_eq!(source.row_count_hint(), None);
    }

    #[test]
    fn test_json_lines_bad_cell() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"cells": ["oops", "x"]}}"#).unwrap();
        file.flush().unwrap();

        let source = JsonLinesSource::new(file.path(), schema());
        let first = source.open().unwrap().next().unwrap();
        assert!(matches!(first, Err(Error::Source(_))));
    }

    #[test]
    fn test_json_lines_missing_file() {
        let source = JsonLinesSource::new("/nonexistent/rows.jsonl", schema());
        assert!(matches!(source.open(), Err(Error::Io(_))));
    }
}
