//! Windowed random-access cache over a forward-only source.
//!
//! [`WindowCache`] turns a [`SequentialSource`] into a [`RandomAccessTable`].
//! It keeps a contiguous window `[start, end)` of at most `cache_size`
//! recently read rows, plus the source cursor positioned at `end`:
//!
//! - an index inside the window is answered from memory;
//! - an index at most `look_ahead` rows past the window extends it by
//!   reading forward, prefetching up to `look_ahead` rows past the request
//!   and dropping the oldest rows to stay within `cache_size`;
//! - anything else (a backward jump, or a jump far ahead) restarts the scan
//!   from row 0 and rebuilds the window around the requested index.
//!
//! Rows are projected to the included columns before they are stored, so the
//! buffer holds at most `cache_size` projected rows whatever the width of the
//! source.
//!
//! A cache is meant for one logical reader at a time. It uses interior
//! mutability and is neither `Send` nor `Sync`.

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::source::{RowIter, SequentialSource};
use crate::table::{RandomAccessTable, Row, TableRef};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ops::Range;
use std::rc::Rc;

/// Rows kept in memory unless configured otherwise.
pub const DEFAULT_CACHE_SIZE: usize = 2000;

/// Rows prefetched past a request unless configured otherwise.
pub const DEFAULT_LOOK_AHEAD: usize = 200;

/// Upper bound on buffer preallocation; windows grow past it as rows arrive.
const INITIAL_CAPACITY: usize = 1024;

/// Tunable parameters of a [`WindowCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowCacheConfig {
    pub cache_size: usize,
    pub look_ahead: usize,
    /// Columns to keep, in output order. `None` keeps every source column.
    pub included_columns: Option<Vec<String>>,
}

impl Default for WindowCacheConfig {
    fn default() -> Self {
        WindowCacheConfig {
            cache_size: DEFAULT_CACHE_SIZE,
            look_ahead: DEFAULT_LOOK_AHEAD,
            included_columns: None,
        }
    }
}

impl WindowCacheConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("cache size", self.cache_size)?;
        check_positive("look-ahead size", self.look_ahead)
    }
}

fn check_positive(what: &str, n: usize) -> Result<()> {
    if n == 0 {
        return Err(Error::invalid(format!("{} must be positive, got 0", what)));
    }
    Ok(())
}

/// Counters describing how requests were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the window.
    pub hits: u64,
    /// Requests served by reading forward from the current cursor.
    pub extensions: u64,
    /// Scans restarted from row 0.
    pub rescans: u64,
    /// Rows pulled from the source in total.
    pub rows_read: u64,
}

struct CacheState {
    cursor: Option<RowIter>,
    window: VecDeque<Row>,
    start: usize,
    /// Memoized once known; the source is treated as fixed-length from then on.
    row_count: Option<usize>,
    stats: CacheStats,
}

impl CacheState {
    fn end(&self) -> usize {
        self.start + self.window.len()
    }

    fn cached(&self, index: usize) -> Option<&Row> {
        if index >= self.start {
            self.window.get(index - self.start)
        } else {
            None
        }
    }
}

/// How a forward read ended.
enum Fill {
    /// Read up to the requested end.
    Complete,
    /// The source ran out after this many rows in total.
    Exhausted(usize),
}

pub struct WindowCache {
    source: Rc<dyn SequentialSource>,
    schema: Schema,
    included_columns: Vec<String>,
    /// Source positions of the included columns; `None` when all columns are
    /// kept in source order.
    projection: Option<Vec<usize>>,
    cache_size: Cell<usize>,
    look_ahead: Cell<usize>,
    state: RefCell<CacheState>,
}

impl std::fmt::Debug for WindowCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WindowCache")
            .field("included_columns", &self.included_columns)
            .field("cache_size", &self.cache_size.get())
            .field("look_ahead", &self.look_ahead.get())
            .field("window", &(state.start..state.end()))
            .field("row_count", &state.row_count)
            .field("stats", &state.stats)
            .finish()
    }
}

impl WindowCache {
    /// Cache over every column of `source` with default sizes.
    pub fn new(source: Rc<dyn SequentialSource>) -> Self {
        Self::build(source, None, DEFAULT_CACHE_SIZE, DEFAULT_LOOK_AHEAD)
    }

    /// Cache keeping only `columns`, in that order.
    ///
    /// Fails with `UnknownColumn` or `DuplicateColumn` for a bad name list.
    pub fn with_columns<S: AsRef<str>>(source: Rc<dyn SequentialSource>, columns: &[S]) -> Result<Self> {
        let indices = source.schema().resolve_names(columns)?;
        Ok(Self::build(source, Some(indices), DEFAULT_CACHE_SIZE, DEFAULT_LOOK_AHEAD))
    }

    pub fn with_config(source: Rc<dyn SequentialSource>, config: &WindowCacheConfig) -> Result<Self> {
        config.validate()?;
        let projection = match &config.included_columns {
            Some(columns) => Some(source.schema().resolve_names(columns)?),
            None => None,
        };
        Ok(Self::build(source, projection, config.cache_size, config.look_ahead))
    }

    fn build(
        source: Rc<dyn SequentialSource>,
        projection: Option<Vec<usize>>,
        cache_size: usize,
        look_ahead: usize,
    ) -> Self {
        let full = source.schema();
        // An identity projection needs no per-row copying.
        let projection = projection.filter(|p| p.len() != full.len() || p.iter().enumerate().any(|(i, &c)| i != c));
        let schema = match &projection {
            Some(indices) => full.project(indices),
            None => full.clone(),
        };
        let included_columns = schema.get_column_names().into_iter().map(String::from).collect();
        let row_count = source.row_count_hint();

        WindowCache {
            source,
            schema,
            included_columns,
            projection,
            cache_size: Cell::new(cache_size),
            look_ahead: Cell::new(look_ahead),
            state: RefCell::new(CacheState {
                cursor: None,
                window: VecDeque::new(),
                start: 0,
                row_count,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn source(&self) -> &Rc<dyn SequentialSource> {
        &self.source
    }

    /// Names of the cached columns, in output order.
    pub fn included_columns(&self) -> &[String] {
        &self.included_columns
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size.get()
    }

    pub fn look_ahead(&self) -> usize {
        self.look_ahead.get()
    }

    /// Sets the number of rows kept in memory. Shrinking drops the oldest rows
    /// of the current window.
    pub fn set_cache_size(&self, size: usize) -> Result<()> {
        check_positive("cache size", size)?;
        self.cache_size.set(size);
        let mut state = self.state.borrow_mut();
        while state.window.len() > size {
            state.window.pop_front();
            state.start += 1;
        }
        Ok(())
    }

    pub fn set_look_ahead_size(&self, size: usize) -> Result<()> {
        check_positive("look-ahead size", size)?;
        self.look_ahead.set(size);
        Ok(())
    }

    pub fn config(&self) -> WindowCacheConfig {
        WindowCacheConfig {
            cache_size: self.cache_size(),
            look_ahead: self.look_ahead(),
            included_columns: Some(self.included_columns.clone()),
        }
    }

    /// Index range currently held in memory.
    pub fn window(&self) -> Range<usize> {
        let state = self.state.borrow();
        state.start..state.end()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.borrow().stats
    }

    /// Drops the window and the cursor. A known row count is kept.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.cursor = None;
        state.window.clear();
        state.start = 0;
    }

    fn project(&self, row: Row) -> Row {
        match &self.projection {
            Some(indices) => row.project(indices),
            None => row,
        }
    }

    /// Reads forward from the current cursor until `target_end`.
    ///
    /// On a source error the cursor is reset and the previous window is kept.
    fn extend(&self, state: &mut CacheState, mut cursor: RowIter, target_end: usize) -> Result<Fill> {
        let mut pos = state.end();
        let mut fetched = Vec::with_capacity(target_end.saturating_sub(pos).min(INITIAL_CAPACITY));
        let mut fill = Fill::Complete;
        while pos < target_end {
            match cursor.next() {
                Some(Ok(row)) => {
                    fetched.push(self.project(row));
                    pos += 1;
                }
                Some(Err(e)) => return Err(e),
                None => {
                    fill = Fill::Exhausted(pos);
                    break;
                }
            }
        }

        log::trace!(
            "window cache: extended [{}, {}) by {} rows",
            state.start,
            state.end(),
            fetched.len()
        );
        state.stats.extensions += 1;
        state.stats.rows_read += fetched.len() as u64;
        let cache_size = self.cache_size.get();
        for row in fetched {
            state.window.push_back(row);
            if state.window.len() > cache_size {
                state.window.pop_front();
                state.start += 1;
            }
        }
        if let Fill::Complete = fill {
            state.cursor = Some(cursor);
        }
        Ok(fill)
    }

    /// Restarts the source from row 0 and rebuilds the window so that it ends
    /// at `target_end` (or at the end of the source).
    ///
    /// The new window is installed only once the scan has succeeded.
    fn rescan(&self, state: &mut CacheState, target_end: usize) -> Result<Fill> {
        state.stats.rescans += 1;
        log::debug!(
            "window cache: rescanning from row 0 up to {} (previous window [{}, {}))",
            target_end,
            state.start,
            state.end()
        );

        let cache_size = self.cache_size.get();
        let mut cursor = self.source.open()?;
        let mut window = VecDeque::with_capacity(cache_size.min(target_end).min(INITIAL_CAPACITY));
        let mut pos = 0;
        let mut fill = Fill::Complete;
        while pos < target_end {
            match cursor.next() {
                Some(Ok(row)) => {
                    window.push_back(self.project(row));
                    if window.len() > cache_size {
                        window.pop_front();
                    }
                    pos += 1;
                }
                Some(Err(e)) => {
                    state.stats.rows_read += pos as u64;
                    return Err(e);
                }
                None => {
                    fill = Fill::Exhausted(pos);
                    break;
                }
            }
        }

        state.stats.rows_read += pos as u64;
        state.start = pos - window.len();
        state.window = window;
        state.cursor = match fill {
            Fill::Complete => Some(cursor),
            Fill::Exhausted(_) => None,
        };
        Ok(fill)
    }
}

impl RandomAccessTable for WindowCache {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn row_count(&self) -> Option<usize> {
        self.state.borrow().row_count
    }

    fn get_row(&self, index: usize) -> Result<Row> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;

        if let Some(count) = state.row_count {
            if index >= count {
                return Err(Error::OutOfRange {
                    index,
                    row_count: Some(count),
                });
            }
        }

        if let Some(row) = state.cached(index) {
            let row = row.clone();
            state.stats.hits += 1;
            return Ok(row);
        }

        let cache_size = self.cache_size.get();
        let look_ahead = self.look_ahead.get();
        // Prefetch past the request, but never so far that the request itself
        // would fall out of the window.
        let target_end = match index.checked_add(1) {
            Some(next) => next.saturating_add(look_ahead.min(cache_size - 1)),
            None => {
                return Err(Error::OutOfRange {
                    index,
                    row_count: state.row_count,
                })
            }
        };

        let end = state.end();
        let within_horizon = index >= end && index - end < look_ahead;
        let fill = match state.cursor.take() {
            Some(cursor) if within_horizon => self.extend(state, cursor, target_end),
            _ => self.rescan(state, target_end),
        }?;

        if let Fill::Exhausted(count) = fill {
            log::debug!("window cache: source exhausted after {} rows", count);
            state.row_count = Some(count);
        }

        match state.cached(index) {
            Some(row) => Ok(row.clone()),
            None => Err(Error::OutOfRange {
                index,
                row_count: state.row_count,
            }),
        }
    }

    /// A fresh cache over the same source with the same columns and sizes.
    fn fork(&self) -> Option<TableRef> {
        let fork = WindowCache::build(
            Rc::clone(&self.source),
            self.projection.clone(),
            self.cache_size.get(),
            self.look_ahead.get(),
        );
        // The row count is a property of the source, safe to share.
        fork.state.borrow_mut().row_count = self.state.borrow().row_count;
        Some(Rc::new(fork))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnType, ColumnValue};
    use crate::source::VecSource;

    const COLUMNS: [&str; 5] = ["Col_A", "Col_B", "Col_C", "Col_D", "Col_E"];

    fn make_rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let cells = (0..COLUMNS.len())
                    .map(|c| ColumnValue::String(format!("[{},{}]", i, c)))
                    .collect();
                Row::new(format!("row_{}", i), cells)
            })
            .collect()
    }

    fn make_source(n: usize) -> VecSource {
        let schema = Schema::new(
            COLUMNS
                .iter()
                .map(|name| (name.to_string(), ColumnType::String, false))
                .collect(),
        );
        VecSource::new(schema, make_rows(n))
    }

    fn small_cache(source: &VecSource, cache_size: usize, look_ahead: usize) -> WindowCache {
        let cache = WindowCache::new(Rc::new(source.clone()));
        cache.set_cache_size(cache_size).unwrap();
        cache.set_look_ahead_size(look_ahead).unwrap();
        cache
    }

    #[test]
    fn test_scenario_backward_and_far_jumps() {
        let source = make_source(42);
        let reference = make_rows(42);
        let cache = small_cache(&source, 10, 5);

        assert_eq!(cache.get_row(41).unwrap(), reference[41]);
        assert_eq!(cache.stats().rescans, 1);
        assert_eq!(cache.window(), 32..42);

        assert_eq!(cache.get_row(0).unwrap(), reference[0]);
        assert_eq!(cache.stats().rescans, 2);
        assert_eq!(cache.window(), 0..6);

        assert_eq!(cache.get_row(20).unwrap(), reference[20]);
        assert_eq!(cache.stats().rescans, 3);
        assert!(cache.window().contains(&20));
        assert_eq!(source.open_count(), 3);
    }

    #[test]
    fn test_sequential_access_scans_once() {
        let source = make_source(500);
        let reference = make_rows(500);
        let cache = small_cache(&source, 16, 4);

        for (i, expected) in reference.iter().enumerate() {
            assert_eq!(&cache.get_row(i).unwrap(), expected);
            assert!(cache.window().len() <= 16);
        }
        let stats = cache.stats();
        assert_eq!(stats.rescans, 1);
        assert!(stats.extensions > 0);
        assert_eq!(stats.rows_read, 500);
        assert_eq!(source.open_count(), 1);
    }

    #[test]
    fn test_backward_jump_rescans_exactly_once() {
        let source = make_source(300);
        let reference = make_rows(300);
        let cache = small_cache(&source, 20, 10);

        cache.get_row(150).unwrap();
        let before = cache.stats().rescans;
        assert_eq!(cache.get_row(50).unwrap(), reference[50]);
        assert_eq!(cache.stats().rescans, before + 1);
    }

    #[test]
    fn test_random_access_matches_forward_scan() {
        let source = make_source(257);
        let reference = make_rows(257);
        let cache = small_cache(&source, 13, 7);

        // Deterministic pseudo-random walk over all indices.
        let mut state: u64 = 0x2545_f491;
        for _ in 0..2_000 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let idx = (state >> 33) as usize % 257;
            assert_eq!(cache.get_row(idx).unwrap(), reference[idx]);
            let window = cache.window();
            assert!(window.end - window.start <= 13);
        }
    }

    #[test]
    fn test_out_of_range_with_known_count() {
        let source = make_source(42);
        let cache = WindowCache::new(Rc::new(source.clone()));
        assert_eq!(cache.row_count(), Some(42));
        assert!(matches!(
            cache.get_row(42),
            Err(Error::OutOfRange { index: 42, row_count: Some(42) })
        ));
        // Rejected without touching the source.
        assert_eq!(source.open_count(), 0);
    }

    #[test]
    fn test_unknown_length_is_memoized_on_exhaustion() {
        let source = make_source(30).with_unknown_length();
        let reference = make_rows(30);
        let cache = small_cache(&source, 8, 4);
        assert_eq!(cache.row_count(), None);

        match cache.get_row(35) {
            Err(Error::OutOfRange { index, row_count }) => {
                assert_eq!(index, 35);
                assert_eq!(row_count, Some(30));
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        assert_eq!(cache.row_count(), Some(30));
        let opens = source.open_count();

        // Past the end is now rejected up front.
        assert!(cache.get_row(31).is_err());
        assert_eq!(source.open_count(), opens);

        // The window built while scanning is still usable.
        assert_eq!(cache.get_row(29).unwrap(), reference[29]);
    }

    #[test]
    fn test_huge_index_on_unknown_length_is_out_of_range() {
        let source = make_source(10).with_unknown_length();
        let cache = small_cache(&source, 8, 4);

        match cache.get_row(usize::MAX) {
            Err(Error::OutOfRange { index, .. }) => assert_eq!(index, usize::MAX),
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        assert_eq!(source.open_count(), 0);

        match cache.get_row(usize::MAX - 1) {
            Err(Error::OutOfRange { row_count, .. }) => assert_eq!(row_count, Some(10)),
            other => panic!("expected OutOfRange, got {:?}", other),
        }
        assert_eq!(cache.get_row(9).unwrap(), make_rows(10)[9]);
    }

    #[test]
    fn test_unbounded_look_ahead_does_not_overflow() {
        let source = make_source(100);
        let reference = make_rows(100);
        let cache = small_cache(&source, 2, 1);
        cache.set_look_ahead_size(usize::MAX).unwrap();

        assert_eq!(cache.get_row(0).unwrap(), reference[0]);
        assert_eq!(cache.get_row(50).unwrap(), reference[50]);
        assert_eq!(cache.get_row(99).unwrap(), reference[99]);
        assert_eq!(cache.window().len(), 2);
    }

    #[test]
    fn test_huge_sizes_over_small_source() {
        let source = make_source(10);
        let reference = make_rows(10);
        let cache = small_cache(&source, 2, 1);
        cache.set_cache_size(1 << 40).unwrap();
        cache.set_look_ahead_size(1 << 40).unwrap();

        assert_eq!(cache.get_row(0).unwrap(), reference[0]);
        assert_eq!(cache.window(), 0..10);
        assert_eq!(cache.get_row(7).unwrap(), reference[7]);
        assert_eq!(source.open_count(), 1);
    }

    #[test]
    fn test_lookahead_runs_past_end_of_unknown_source() {
        let source = make_source(10).with_unknown_length();
        let cache = small_cache(&source, 50, 20);
        cache.get_row(3).unwrap();
        // The prefetch hit the end, so the count became known.
        assert_eq!(cache.row_count(), Some(10));
        assert_eq!(cache.window(), 0..10);
    }

    #[test]
    fn test_set_sizes_reject_zero() {
        let source = make_source(5);
        let cache = small_cache(&source, 7, 3);
        assert!(matches!(cache.set_cache_size(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(cache.set_look_ahead_size(0), Err(Error::InvalidArgument(_))));
        assert_eq!(cache.cache_size(), 7);
        assert_eq!(cache.look_ahead(), 3);
    }

    #[test]
    fn test_shrinking_cache_trims_window() {
        let source = make_source(100);
        let cache = small_cache(&source, 20, 5);
        cache.get_row(30).unwrap();
        cache.set_cache_size(4).unwrap();
        let window = cache.window();
        assert_eq!(window.len(), 4);
        assert_eq!(window.end, 36);
    }

    #[test]
    fn test_lookahead_larger_than_cache() {
        let source = make_source(100);
        let reference = make_rows(100);
        let cache = small_cache(&source, 3, 50);
        for i in [10, 11, 12, 13, 60, 61, 2] {
            assert_eq!(cache.get_row(i).unwrap(), reference[i]);
            assert!(cache.window().len() <= 3);
        }
    }

    #[test]
    fn test_included_columns_are_projected_on_read() {
        let source = make_source(12);
        let cache = WindowCache::with_columns(Rc::new(source), &["Col_E", "Col_B"]).unwrap();
        assert_eq!(cache.included_columns(), &["Col_E".to_string(), "Col_B".to_string()]);
        assert_eq!(cache.schema().get_column_names(), vec!["Col_E", "Col_B"]);

        let row = cache.get_row(7).unwrap();
        assert_eq!(row.key(), "row_7");
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0).unwrap().as_string(), Some("[7,4]"));
        assert_eq!(row.get(1).unwrap().as_string(), Some("[7,1]"));
    }

    #[test]
    fn test_included_columns_validation() {
        let source: Rc<dyn SequentialSource> = Rc::new(make_source(1));
        assert!(matches!(
            WindowCache::with_columns(Rc::clone(&source), &["Col_Z"]),
            Err(Error::UnknownColumn(_))
        ));
        assert!(matches!(
            WindowCache::with_columns(source, &["Col_A", "Col_A"]),
            Err(Error::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config: WindowCacheConfig =
            serde_json::from_str(r#"{"cache_size": 64, "included_columns": ["Col_C"]}"#).unwrap();
        assert_eq!(config.look_ahead, DEFAULT_LOOK_AHEAD);

        let cache = WindowCache::with_config(Rc::new(make_source(3)), &config).unwrap();
        assert_eq!(cache.cache_size(), 64);
        assert_eq!(cache.column_count(), 1);

        let bad = WindowCacheConfig {
            look_ahead: 0,
            ..WindowCacheConfig::default()
        };
        assert!(matches!(
            WindowCache::with_config(Rc::new(make_source(3)), &bad),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fork_is_independent() {
        let source = make_source(50);
        let cache = small_cache(&source, 10, 5);
        cache.get_row(40).unwrap();

        let fork = cache.fork().unwrap();
        assert_eq!(fork.get_row(0).unwrap().key(), "row_0");
        assert_eq!(cache.window(), 36..46);
        assert_eq!(cache.stats().rescans, 1);
        assert_eq!(fork.column_count(), 5);
    }

    /// Source whose scans fail at a fixed row.
    struct FlakySource {
        inner: VecSource,
        fail_at: Rc<Cell<Option<usize>>>,
    }

    impl SequentialSource for FlakySource {
        fn schema(&self) -> &Schema {
            self.inner.schema()
        }

        fn open(&self) -> Result<RowIter> {
            let fail_at = self.fail_at.get();
            let rows = self.inner.open()?;
            Ok(Box::new(rows.enumerate().map(move |(i, row)| {
                if Some(i) == fail_at {
                    Err(Error::Source(format!("read error at row {}", i)))
                } else {
                    row
                }
            })))
        }
    }

    #[test]
    fn test_source_error_keeps_previous_window() {
        let fail_at = Rc::new(Cell::new(None));
        let source = FlakySource {
            inner: make_source(100),
            fail_at: Rc::clone(&fail_at),
        };
        let cache = WindowCache::new(Rc::new(source));
        cache.set_cache_size(10).unwrap();
        cache.set_look_ahead_size(5).unwrap();

        cache.get_row(50).unwrap();
        let window = cache.window();

        // A rescan that fails halfway leaves the old window installed.
        fail_at.set(Some(3));
        assert!(matches!(cache.get_row(8), Err(Error::Source(_))));
        assert_eq!(cache.window(), window);
        assert_eq!(cache.get_row(50).unwrap().key(), "row_50");

        // Once the source recovers the same request succeeds.
        fail_at.set(None);
        assert_eq!(cache.get_row(8).unwrap().key(), "row_8");
    }

    #[test]
    fn test_extension_error_resets_cursor() {
        let fail_at = Rc::new(Cell::new(Some(12)));
        let source = FlakySource {
            inner: make_source(40),
            fail_at: Rc::clone(&fail_at),
        };
        let cache = WindowCache::new(Rc::new(source));
        cache.set_cache_size(10).unwrap();
        cache.set_look_ahead_size(5).unwrap();

        cache.get_row(0).unwrap();
        assert_eq!(cache.window(), 0..6);
        cache.get_row(6).unwrap();
        assert_eq!(cache.window(), 2..12);

        assert!(cache.get_row(12).is_err());
        assert_eq!(cache.window(), 2..12);

        fail_at.set(None);
        let rescans = cache.stats().rescans;
        assert_eq!(cache.get_row(12).unwrap().key(), "row_12");
        assert_eq!(cache.stats().rescans, rescans + 1);
    }

    #[test]
    fn test_clear_keeps_row_count() {
        let source = make_source(9).with_unknown_length();
        let cache = small_cache(&source, 4, 2);
        assert!(cache.get_row(20).is_err());
        cache.clear();
        assert_eq!(cache.window(), 0..0);
        assert_eq!(cache.row_count(), Some(9));
    }
}
