/// WindowTable derived tables.
///
/// Each view wraps a parent [`TableRef`] and is itself a
/// [`RandomAccessTable`], so views stack: a projection over a window cache,
/// a sort over the projection, a filter over the sort.
///
/// - [`ProjectedTable`] selects and reorders columns, row for row.
/// - [`SortedTable`] presents the parent's rows in key order.
/// - [`FilteredTable`] exposes only the rows matching a predicate,
///   renumbered from 0.

use crate::column::{ColumnType, ColumnValue};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::monitor::{ExecutionMonitor, NoopMonitor};
use crate::schema::Schema;
use crate::table::{row_or_end, MaterializedTable, RandomAccessTable, Row, TableRef};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Rows whose sort keys are spooled and sorted as one run.
pub const SORT_CHUNK_SIZE: usize = 4096;

/// Input rows a full filter scan reads between cancellation checks.
pub const FILTER_CHECK_INTERVAL: usize = 1024;

/// A ProjectedTable presents a subset of the parent's columns, in a chosen
/// order. Row count and row order are the parent's.
pub struct ProjectedTable {
    parent: TableRef,
    indices: Rc<[usize]>,
    schema: Schema,
}

impl ProjectedTable {
    /// Projects the named columns. The order of `columns` is the output order.
    ///
    /// Fails with `UnknownColumn` for a name the parent does not have and
    /// `DuplicateColumn` for a name listed twice.
    pub fn new<S: AsRef<str>>(parent: TableRef, columns: &[S]) -> Result<Self> {
        let indices = parent.schema().resolve_names(columns)?;
        Ok(Self::build(parent, indices))
    }

    /// Projects the columns at `indices`, in that order.
    ///
    /// Fails with `InvalidArgument` for an index past the last column or an
    /// index listed twice.
    pub fn from_indices(parent: TableRef, indices: &[usize]) -> Result<Self> {
        parent.schema().check_indices(indices)?;
        Ok(Self::build(parent, indices.to_vec()))
    }

    /// Keeps every column except the ones at `excluded`, in parent order.
    pub fn exclude_indices(parent: TableRef, excluded: &[usize]) -> Result<Self> {
        parent.schema().check_indices(excluded)?;
        let kept = (0..parent.schema().len())
            .filter(|i| !excluded.contains(i))
            .collect();
        Ok(Self::build(parent, kept))
    }

    /// Keeps every column whose type can stand in for `column_type`, so a
    /// `Float64` request also keeps `Int32` columns.
    pub fn by_type(parent: TableRef, column_type: ColumnType) -> Self {
        let kept = parent
            .schema()
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.column_type.is_compatible_with(column_type))
            .map(|(i, _)| i)
            .collect();
        Self::build(parent, kept)
    }

    fn build(parent: TableRef, indices: Vec<usize>) -> Self {
        let schema = parent.schema().project(&indices);
        ProjectedTable {
            parent,
            indices: indices.into(),
            schema,
        }
    }

    /// Parent column position of each output column.
    pub fn column_indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn parent(&self) -> &TableRef {
        &self.parent
    }
}

impl fmt::Debug for ProjectedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectedTable")
            .field("indices", &self.indices)
            .field("schema", &self.schema)
            .finish()
    }
}

impl RandomAccessTable for ProjectedTable {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> Option<usize> {
        self.parent.row_count()
    }

    fn get_row(&self, index: usize) -> Result<Row> {
        Ok(self.parent.get_row(index)?.project(&self.indices))
    }

    fn fork(&self) -> Option<TableRef> {
        let parent = self.parent.fork()?;
        Some(Rc::new(ProjectedTable {
            parent,
            indices: Rc::clone(&self.indices),
            schema: self.schema.clone(),
        }))
    }
}

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (smallest first)
    #[default]
    Ascending,
    /// Descending order (largest first)
    Descending,
}

/// A single sort key specifying a column and order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Column name to sort by
    pub column: String,
    #[serde(default)]
    pub order: SortOrder,
    /// Whether NULL values should be placed first or last
    #[serde(default)]
    pub nulls_first: bool,
}

impl SortKey {
    /// Create a new sort key with ascending order (nulls last)
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey::new(column, SortOrder::Ascending, false)
    }

    /// Create a new sort key with descending order (nulls last)
    pub fn descending(column: impl Into<String>) -> Self {
        SortKey::new(column, SortOrder::Descending, false)
    }

    pub fn new(column: impl Into<String>, order: SortOrder, nulls_first: bool) -> Self {
        SortKey {
            column: column.into(),
            order,
            nulls_first,
        }
    }

    /// Compare two cells of this key's column. Null placement does not
    /// depend on the sort order.
    fn compare(&self, a: &ColumnValue, b: &ColumnValue) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if self.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if self.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self.order {
                SortOrder::Ascending => a.total_cmp(b),
                SortOrder::Descending => a.total_cmp(b).reverse(),
            },
        }
    }
}

/// Spooled sort keys of one input row, with its parent index.
type SortEntry = (Vec<ColumnValue>, usize);

fn compare_entries(a: &SortEntry, b: &SortEntry, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .zip(a.0.iter().zip(&b.0))
        .map(|(key, (x, y))| key.compare(x, y))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// A SortedTable presents rows from the parent table in sorted order.
///
/// Construction reads the parent once, front to back, spooling only the sort
/// key cells of each row. Keys are sorted in runs of [`SORT_CHUNK_SIZE`]
/// rows and the runs are merged into a permutation of parent indices.
/// Rows with equal keys keep their input order.
///
/// The monitor is checked before every run and every merge pass; a
/// cancelled sort returns `Cancelled` and produces no table.
///
/// Only the permutation is kept, so each `get_row` is a random lookup into
/// the parent. Over a [`WindowCache`](crate::WindowCache) a full pass in
/// sorted order can cost a rescan per row; wrap the output with
/// [`SortedTable::materialize`] when it will be read end to end.
///
/// # Examples
///
/// ```
/// use windowtable::{ColumnType, ColumnValue, MaterializedTable, RandomAccessTable, Row, Schema};
/// use windowtable::{SortKey, SortedTable, TableRef};
/// use std::rc::Rc;
///
/// let schema = Schema::new(vec![
///     ("name".to_string(), ColumnType::String, false),
///     ("score".to_string(), ColumnType::Int32, false),
/// ]);
/// let table: TableRef = Rc::new(MaterializedTable::new(schema, vec![
///     Row::new("bob", vec![ColumnValue::String("Bob".into()), ColumnValue::Int32(85)]),
///     Row::new("alice", vec![ColumnValue::String("Alice".into()), ColumnValue::Int32(92)]),
/// ]));
///
/// let sorted = SortedTable::new(table, vec![SortKey::descending("score")]).unwrap();
/// assert_eq!(sorted.row_count(), Some(2));
/// assert_eq!(sorted.get_row(0).unwrap().key(), "alice");
/// ```
pub struct SortedTable {
    parent: TableRef,
    sort_keys: Vec<SortKey>,
    /// Sorted index: sorted_index[view_pos] = parent_row_index
    sorted_index: Rc<[usize]>,
}

impl SortedTable {
    /// Sorts without progress reporting or cancellation.
    pub fn new(parent: TableRef, sort_keys: Vec<SortKey>) -> Result<Self> {
        Self::with_monitor(parent, sort_keys, &NoopMonitor)
    }

    /// Sorts, reporting progress to `monitor` and stopping with `Cancelled`
    /// at the next checkpoint once it is cancelled.
    ///
    /// # Arguments
    ///
    /// * `parent` - The table to sort
    /// * `sort_keys` - List of sort keys (first key is primary, etc.)
    /// * `monitor` - Receives progress and is polled for cancellation
    pub fn with_monitor(
        parent: TableRef,
        sort_keys: Vec<SortKey>,
        monitor: &dyn ExecutionMonitor,
    ) -> Result<Self> {
        Self::sort(parent, sort_keys, monitor, SORT_CHUNK_SIZE)
    }

    fn sort(
        parent: TableRef,
        sort_keys: Vec<SortKey>,
        monitor: &dyn ExecutionMonitor,
        chunk_size: usize,
    ) -> Result<Self> {
        if sort_keys.is_empty() {
            return Err(Error::invalid("At least one sort key is required"));
        }
        let columns = sort_keys
            .iter()
            .map(|key| {
                parent
                    .schema()
                    .get_column_index(&key.column)
                    .ok_or_else(|| Error::UnknownColumn(key.column.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        monitor.set_message("Reading sort keys...");
        let runs = spool_runs(&*parent, &columns, &sort_keys, monitor, chunk_size)?;
        log::debug!("Merging {} sorted runs", runs.len());
        monitor.set_message("Sorting...");
        let sorted_index = merge_runs(runs, &sort_keys, monitor)?;

        Ok(SortedTable {
            parent,
            sort_keys,
            sorted_index: sorted_index.into(),
        })
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    /// Returns the parent table row index for a given view position
    pub fn get_parent_index(&self, view_index: usize) -> Option<usize> {
        self.sorted_index.get(view_index).copied()
    }

    pub fn len(&self) -> usize {
        self.sorted_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_index.is_empty()
    }

    /// Copies the sorted rows out in one forward pass over the parent.
    ///
    /// Checks the monitor every [`FILTER_CHECK_INTERVAL`] parent rows.
    pub fn materialize(&self, monitor: &dyn ExecutionMonitor) -> Result<MaterializedTable> {
        let mut position = vec![0; self.sorted_index.len()];
        for (view_index, &parent_index) in self.sorted_index.iter().enumerate() {
            position[parent_index] = view_index;
        }

        let mut slots: Vec<Option<Row>> = vec![None; position.len()];
        for (parent_index, &view_index) in position.iter().enumerate() {
            if parent_index % FILTER_CHECK_INTERVAL == 0 {
                monitor.check_cancelled()?;
            }
            slots[view_index] = Some(self.parent.get_row(parent_index)?);
        }
        Ok(MaterializedTable::new(
            self.parent.schema().clone(),
            slots.into_iter().flatten().collect(),
        ))
    }
}

/// Reads the parent front to back in chunks, returning each chunk's sort
/// entries stably sorted. Progress covers the first half of the sort.
fn spool_runs(
    parent: &dyn RandomAccessTable,
    columns: &[usize],
    keys: &[SortKey],
    monitor: &dyn ExecutionMonitor,
    chunk_size: usize,
) -> Result<Vec<Vec<SortEntry>>> {
    let total = parent.row_count();
    let mut runs = Vec::new();
    let mut next = 0;
    loop {
        monitor.check_cancelled()?;
        let mut run: Vec<SortEntry> = Vec::with_capacity(chunk_size.min(total.unwrap_or(chunk_size)));
        while run.len() < chunk_size {
            let Some(row) = row_or_end(parent, next)? else {
                break;
            };
            let cells = columns
                .iter()
                .map(|&c| row.get(c).cloned().unwrap_or(ColumnValue::Null))
                .collect();
            run.push((cells, next));
            next += 1;
        }
        let exhausted = run.len() < chunk_size;
        if !run.is_empty() {
            run.sort_by(|a, b| compare_entries(a, b, keys));
            runs.push(run);
        }
        if let Some(total) = total.filter(|&t| t > 0) {
            monitor.set_progress(0.5 * next as f64 / total as f64);
        }
        if exhausted {
            return Ok(runs);
        }
    }
}

/// Merges adjacent runs pairwise until one remains. On equal keys the
/// left run wins, which keeps equal rows in input order.
fn merge_runs(
    mut runs: Vec<Vec<SortEntry>>,
    keys: &[SortKey],
    monitor: &dyn ExecutionMonitor,
) -> Result<Vec<usize>> {
    let passes = (runs.len().max(2) as f64).log2().ceil();
    let mut pass = 0;
    while runs.len() > 1 {
        monitor.check_cancelled()?;
        let mut merged = Vec::with_capacity((runs.len() + 1) / 2);
        let mut pairs = runs.into_iter();
        while let Some(left) = pairs.next() {
            match pairs.next() {
                Some(right) => merged.push(merge_pair(left, right, keys)),
                None => merged.push(left),
            }
        }
        runs = merged;
        pass += 1;
        monitor.set_progress(0.5 + 0.5 * (pass as f64 / passes).min(1.0));
    }
    monitor.set_progress(1.0);
    Ok(runs
        .pop()
        .map(|run| run.into_iter().map(|(_, index)| index).collect())
        .unwrap_or_default())
}

fn merge_pair(left: Vec<SortEntry>, right: Vec<SortEntry>, keys: &[SortKey]) -> Vec<SortEntry> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare_entries(l, r, keys) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return out,
        };
        out.extend(if take_left { left.next() } else { right.next() });
    }
}

impl fmt::Debug for SortedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedTable")
            .field("sort_keys", &self.sort_keys)
            .field("rows", &self.sorted_index.len())
            .finish()
    }
}

impl RandomAccessTable for SortedTable {
    fn schema(&self) -> &Schema {
        self.parent.schema()
    }

    fn row_count(&self) -> Option<usize> {
        Some(self.sorted_index.len())
    }

    fn get_row(&self, index: usize) -> Result<Row> {
        let parent_index = self.get_parent_index(index).ok_or(Error::OutOfRange {
            index,
            row_count: Some(self.len()),
        })?;
        self.parent.get_row(parent_index)
    }

    fn fork(&self) -> Option<TableRef> {
        let parent = self.parent.fork()?;
        Some(Rc::new(SortedTable {
            parent,
            sort_keys: self.sort_keys.clone(),
            sorted_index: Rc::clone(&self.sorted_index),
        }))
    }
}

/// A row predicate shared between a filter and its forks.
pub type RowPredicate = Rc<dyn Fn(&Row) -> bool>;

#[derive(Debug, Clone, Default)]
struct FilterState {
    view_to_parent: Vec<usize>,
    /// Parent rows examined so far.
    scanned: usize,
    complete: bool,
}

/// A FilteredTable exposes the parent rows matching a predicate, numbered
/// contiguously from 0 in parent order.
///
/// The parent is scanned lazily: a lookup reads just far enough to find the
/// requested match, and [`row_count`](RandomAccessTable::row_count) stays
/// `None` until the whole parent has been scanned once.
/// [`scan_all`](FilteredTable::scan_all) forces the full scan.
pub struct FilteredTable {
    parent: TableRef,
    predicate: RowPredicate,
    state: RefCell<FilterState>,
}

impl FilteredTable {
    pub fn new<F>(parent: TableRef, predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + 'static,
    {
        Self::with_predicate(parent, Rc::new(predicate))
    }

    pub fn with_predicate(parent: TableRef, predicate: RowPredicate) -> Self {
        FilteredTable {
            parent,
            predicate,
            state: RefCell::new(FilterState::default()),
        }
    }

    /// Filter by an expression over the parent's columns.
    ///
    /// Fails with `UnknownColumn` if the expression names a missing column.
    pub fn from_expr(parent: TableRef, expr: &Expr) -> Result<Self> {
        let bound = expr.bind(parent.schema())?;
        Ok(Self::new(parent, move |row| bound.eval(row)))
    }

    /// True once every parent row has been examined.
    pub fn is_complete(&self) -> bool {
        self.state.borrow().complete
    }

    /// Matches found so far.
    pub fn matched(&self) -> usize {
        self.state.borrow().view_to_parent.len()
    }

    /// Parent index of an already resolved output row.
    pub fn get_parent_index(&self, view_index: usize) -> Option<usize> {
        self.state.borrow().view_to_parent.get(view_index).copied()
    }

    /// Scans the rest of the parent, checking `monitor` every
    /// [`FILTER_CHECK_INTERVAL`] rows. Returns the number of matching rows.
    ///
    /// Rows already scanned stay resolved when the scan is cancelled, and a
    /// later call picks up where it stopped.
    pub fn scan_all(&self, monitor: &dyn ExecutionMonitor) -> Result<usize> {
        let total = self.parent.row_count();
        let mut state = self.state.borrow_mut();
        let mut since_check = 0;
        while !state.complete {
            if since_check == 0 {
                monitor.check_cancelled()?;
                if let Some(total) = total.filter(|&t| t > 0) {
                    monitor.set_progress(state.scanned as f64 / total as f64);
                }
            }
            self.advance(&mut state)?;
            since_check = (since_check + 1) % FILTER_CHECK_INTERVAL;
        }
        monitor.set_progress(1.0);
        Ok(state.view_to_parent.len())
    }

    /// Examines the next parent row. A failed read leaves the state as it was.
    fn advance(&self, state: &mut FilterState) -> Result<()> {
        match row_or_end(&*self.parent, state.scanned)? {
            Some(row) => {
                if (self.predicate)(&row) {
                    state.view_to_parent.push(state.scanned);
                }
                state.scanned += 1;
            }
            None => {
                state.complete = true;
                log::debug!(
                    "Filter matched {} of {} rows",
                    state.view_to_parent.len(),
                    state.scanned
                );
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FilteredTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredTable")
            .field("state", &self.state)
            .finish()
    }
}

impl RandomAccessTable for FilteredTable {
    fn schema(&self) -> &Schema {
        self.parent.schema()
    }

    fn row_count(&self) -> Option<usize> {
        let state = self.state.borrow();
        if state.complete {
            Some(state.view_to_parent.len())
        } else {
            None
        }
    }

    fn get_row(&self, index: usize) -> Result<Row> {
        let parent_index = {
            let mut state = self.state.borrow_mut();
            while state.view_to_parent.len() <= index && !state.complete {
                self.advance(&mut state)?;
            }
            match state.view_to_parent.get(index) {
                Some(&parent_index) => parent_index,
                None => {
                    return Err(Error::OutOfRange {
                        index,
                        row_count: Some(state.view_to_parent.len()),
                    })
                }
            }
        };
        self.parent.get_row(parent_index)
    }

    fn fork(&self) -> Option<TableRef> {
        let parent = self.parent.fork()?;
        Some(Rc::new(FilteredTable {
            parent,
            predicate: Rc::clone(&self.predicate),
            state: RefCell::new(self.state.borrow().clone()),
        }))
    }
}
