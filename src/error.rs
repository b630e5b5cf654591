//! Error types for WindowTable.
//!
//! Every fallible operation returns [`Result<T>`], aliased to
//! `Result<T, Error>`, so failures propagate with `?`.
//!
//! ## Error categories
//!
//! - `OutOfRange`: a row index outside `[0, row_count)`. When the index ran past
//!   the end of a source of unknown length, the error carries the row count
//!   discovered while scanning.
//! - `InvalidArgument`: non-positive cache/look-ahead sizes, bad column indices,
//!   malformed or unsupported transformation parameters.
//! - `UnknownColumn` / `DuplicateColumn`: a projection names a column that is
//!   absent, or names one twice.
//! - `Cancelled`: an [`ExecutionMonitor`](crate::monitor::ExecutionMonitor)
//!   requested an abort. Never swallowed.
//! - `Source`, `Io`, `Json`: the underlying sequential source failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Row index {index} out of range{}", fmt_row_count(.row_count))]
    OutOfRange {
        index: usize,
        row_count: Option<usize>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    #[error("Duplicate column: '{0}'")]
    DuplicateColumn(String),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn fmt_row_count(row_count: &Option<usize>) -> String {
    match row_count {
        Some(n) => format!(" [0, {})", n),
        None => " (row count not yet known)".to_string(),
    }
}

impl Error {
    /// Returns true if this error came from a monitor-requested abort.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns true for index errors.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::OutOfRange { .. })
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
