//! WindowTable Schema
//!
//! An ordered list of column descriptors. Column positions in the schema are
//! the positions of the cells in every row of the table it describes.
//!
//! # Examples
//!
//! ```
//! use windowtable::{ColumnType, Schema};
//!
//! let schema = Schema::new(vec![
//!     ("id".to_string(), ColumnType::Int32, false),
//!     ("email".to_string(), ColumnType::String, false),
//!     ("age".to_string(), ColumnType::Int32, true),
//! ]);
//!
//! assert_eq!(schema.len(), 3);
//! assert_eq!(schema.get_column_index("email"), Some(1));
//! ```

use crate::column::ColumnType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name, type and nullability of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        ColumnSpec {
            name: name.into(),
            column_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Creates a new schema from `(column_name, column_type, is_nullable)` tuples.
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        Schema {
            columns: columns
                .into_iter()
                .map(|(name, ty, nullable)| ColumnSpec::new(name, ty, nullable))
                .collect(),
        }
    }

    pub fn from_specs(columns: Vec<ColumnSpec>) -> Self {
        Schema { columns }
    }

    /// Returns the number of columns in the schema.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns a list of all column names.
    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the index of a column by name, or None if not found.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get_column(&self, index: usize) -> Option<&ColumnSpec> {
        self.columns.get(index)
    }

    /// Returns the type of a column by name, or None if not found.
    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Resolves column names to positions, preserving the requested order.
    ///
    /// Fails with `UnknownColumn` for an absent name and `DuplicateColumn` for
    /// a name requested twice.
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut seen = HashSet::with_capacity(names.len());
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if !seen.insert(name) {
                    return Err(Error::DuplicateColumn(name.to_string()));
                }
                self.get_column_index(name)
                    .ok_or_else(|| Error::UnknownColumn(name.to_string()))
            })
            .collect()
    }

    /// Validates a list of column positions: each must be in range and
    /// appear only once.
    pub fn check_indices(&self, indices: &[usize]) -> Result<()> {
        let mut seen = HashSet::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.len() {
                return Err(Error::invalid(format!(
                    "Column index {} out of range [0, {})",
                    idx,
                    self.len()
                )));
            }
            if !seen.insert(idx) {
                return Err(Error::invalid(format!("Column index {} found twice", idx)));
            }
        }
        Ok(())
    }

    /// Schema made of the columns at `indices`, in that order. Indices must
    /// already be validated.
    pub fn project(&self, indices: &[usize]) -> Schema {
        Schema {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }
}
