/// WindowTable cell values and column types.
///
/// Every row handed out by a table is a list of `ColumnValue` cells, one per
/// column of the table's schema. A `ColumnType` tags each column.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bool,
}

impl ColumnType {
    /// Returns true if values of this type can stand in where `requested` is
    /// expected. Numeric types widen: an `Int32` column is compatible with an
    /// `Int64` or `Float64` request, a `Float32` column with `Float64`.
    pub fn is_compatible_with(&self, requested: ColumnType) -> bool {
        use ColumnType::*;
        match (*self, requested) {
            (a, b) if a == b => true,
            (Int32, Int64) | (Int32, Float64) | (Int64, Float64) => true,
            (Int32, Float32) | (Float32, Float64) => true,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::String | ColumnType::Bool)
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ColumnValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int32(v) => Some(*v as i64),
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the cell, widening integers and `f32`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int32(v) => Some(*v as f64),
            ColumnValue::Int64(v) => Some(*v as f64),
            ColumnValue::Float32(v) => Some(*v as f64),
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Type of a non-null cell.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Int32(_) => Some(ColumnType::Int32),
            ColumnValue::Int64(_) => Some(ColumnType::Int64),
            ColumnValue::Float32(_) => Some(ColumnType::Float32),
            ColumnValue::Float64(_) => Some(ColumnType::Float64),
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::Bool(_) => Some(ColumnType::Bool),
            ColumnValue::Null => None,
        }
    }

    /// Total order over non-null cells.
    ///
    /// Numbers compare numerically across widths (NaN sorts after every other
    /// number), strings lexicographically, `false < true`. Cells of unrelated
    /// types order by type rank so the result stays deterministic.
    /// Null handling is left to the caller.
    pub fn total_cmp(&self, other: &ColumnValue) -> Ordering {
        match (self, other) {
            (ColumnValue::Int32(a), ColumnValue::Int32(b)) => a.cmp(b),
            (ColumnValue::Int64(a), ColumnValue::Int64(b)) => a.cmp(b),
            (ColumnValue::String(a), ColumnValue::String(b)) => a.cmp(b),
            (ColumnValue::Bool(a), ColumnValue::Bool(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            ColumnValue::Bool(_) => 0,
            ColumnValue::Int32(_)
            | ColumnValue::Int64(_)
            | ColumnValue::Float32(_)
            | ColumnValue::Float64(_) => 1,
            ColumnValue::String(_) => 2,
            ColumnValue::Null => 3,
        }
    }

    /// Convert a JSON value into a cell of the given column type.
    ///
    /// Returns `None` when the JSON value cannot represent that type.
    pub fn from_json(value: &JsonValue, column_type: ColumnType) -> Option<ColumnValue> {
        if value.is_null() {
            return Some(ColumnValue::Null);
        }
        match column_type {
            ColumnType::Int32 => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(ColumnValue::Int32),
            ColumnType::Int64 => value.as_i64().map(ColumnValue::Int64),
            ColumnType::Float32 => value.as_f64().map(|v| ColumnValue::Float32(v as f32)),
            ColumnType::Float64 => value.as_f64().map(ColumnValue::Float64),
            ColumnType::String => value.as_str().map(|s| ColumnValue::String(s.to_string())),
            ColumnType::Bool => value.as_bool().map(ColumnValue::Bool),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ColumnValue::Int32(n) => JsonValue::Number((*n).into()),
            ColumnValue::Int64(n) => JsonValue::Number((*n).into()),
            ColumnValue::Float32(f) => serde_json::Number::from_f64(*f as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ColumnValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ColumnValue::String(s) => JsonValue::String(s.clone()),
            ColumnValue::Bool(b) => JsonValue::Bool(*b),
            ColumnValue::Null => JsonValue::Null,
        }
    }
}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnValue::Int32(v) => write!(f, "{}", v),
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float32(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(v) => write!(f, "{}", v),
            ColumnValue::Bool(v) => write!(f, "{}", v),
            ColumnValue::Null => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_compatibility() {
        assert!(ColumnType::Int32.is_compatible_with(ColumnType::Float64));
        assert!(ColumnType::Float32.is_compatible_with(ColumnType::Float64));
        assert!(ColumnType::String.is_compatible_with(ColumnType::String));
        assert!(!ColumnType::Float64.is_compatible_with(ColumnType::Int32));
        assert!(!ColumnType::String.is_compatible_with(ColumnType::Float64));
        assert!(!ColumnType::Bool.is_numeric());
    }

    #[test]
    fn test_total_cmp_across_widths() {
        let a = ColumnValue::Int32(3);
        let b = ColumnValue::Float64(2.5);
        assert_eq!(a.total_cmp(&b), Ordering::Greater);
        assert_eq!(
            ColumnValue::String("a".into()).total_cmp(&ColumnValue::String("b".into())),
            Ordering::Less
        );
        assert_eq!(
            ColumnValue::Float64(f64::NAN).total_cmp(&ColumnValue::Float64(1.0)),
            Ordering::Greater
        );
        // Unrelated types still order deterministically.
        assert_eq!(
            ColumnValue::Bool(true).total_cmp(&ColumnValue::String("x".into())),
            Ordering::Less
        );
    }

    #[test]
    fn test_from_json_respects_type() {
        assert_eq!(
            ColumnValue::from_json(&json!(7), ColumnType::Int32),
            Some(ColumnValue::Int32(7))
        );
        assert_eq!(
            ColumnValue::from_json(&json!(7), ColumnType::Float64),
            Some(ColumnValue::Float64(7.0))
        );
        assert_eq!(
            ColumnValue::from_json(&json!(null), ColumnType::String),
            Some(ColumnValue::Null)
        );
        assert_eq!(ColumnValue::from_json(&json!("x"), ColumnType::Int64), None);
        assert_eq!(
            ColumnValue::from_json(&json!(5_000_000_000i64), ColumnType::Int32),
            None
        );
    }

    #[test]
    fn test_to_json() {
        assert_eq!(ColumnValue::Int64(-4).to_json(), json!(-4));
        assert_eq!(ColumnValue::String("s".into()).to_json(), json!("s"));
        assert_eq!(ColumnValue::Float64(f64::NAN).to_json(), json!(null));
    }
}
