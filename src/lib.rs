//! WindowTable - Random-access tables over forward-only data
//!
//! A [`WindowCache`] turns a dataset that can only be read front to back into
//! a table that answers any row by index, keeping a bounded window of rows in
//! memory. Derived tables (projections, sorts, filters) stack on top of it and
//! are assembled into pipelines with [`TransformationPipeline`].

pub mod error;
pub mod column;
pub mod schema;
pub mod table;
pub mod source;
pub mod cache;
pub mod monitor;
pub mod expr;
pub mod view;
pub mod transform;
pub mod pipeline;
pub mod config;

pub use error::{Error, Result};
pub use column::{ColumnType, ColumnValue};
pub use schema::{ColumnSpec, Schema};
pub use table::{collect_rows, MaterializedTable, RandomAccessTable, Row, TableRef};
pub use source::{JsonLinesSource, RowIter, SequentialSource, VecSource};
pub use cache::{CacheStats, WindowCache, WindowCacheConfig, DEFAULT_CACHE_SIZE, DEFAULT_LOOK_AHEAD};
pub use monitor::{CancelHandle, ExecutionMonitor, NoopMonitor, ProgressEvent, ProgressListener, ProgressMonitor};
pub use expr::{BoundExpr, CompareOp, Expr, Literal, MAX_EXPR_DEPTH};
pub use view::{FilteredTable, ProjectedTable, RowPredicate, SortKey, SortOrder, SortedTable};
pub use transform::{FilterInfo, ProjectionInfo, SortInfo, Transformation};
pub use pipeline::{PipelineBuilder, TransformationExecutor, TransformationPipeline};
pub use config::PipelineConfig;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::io::Write;
    use std::rc::Rc;

    const NAMES: [&str; 5] = ["Col_A", "Col_B", "Col_C", "Col_D", "Col_E"];

    /// 42 rows by 5 columns, cell (i, c) = "[i,c]", keys "row_i".
    fn reference_source() -> VecSource {
        let schema = Schema::new(
            NAMES
                .iter()
                .map(|name| (name.to_string(), ColumnType::String, false))
                .collect(),
        );
        let rows = (0..42)
            .map(|i| {
                Row::new(
                    format!("row_{}", i),
                    (0..5).map(|c| ColumnValue::String(format!("[{},{}]", i, c))).collect(),
                )
            })
            .collect();
        VecSource::new(schema, rows)
    }

    #[test]
    fn test_window_cache_scenario() {
        let source = reference_source();
        let reference = source.rows().to_vec();

        let cache = WindowCache::new(Rc::new(source.clone()));
        cache.set_cache_size(10).unwrap();
        cache.set_look_ahead_size(5).unwrap();

        assert_eq!(cache.get_row(41).unwrap(), reference[41]);
        assert_eq!(cache.stats().rescans, 1);

        assert_eq!(cache.get_row(0).unwrap(), reference[0]);
        assert_eq!(cache.stats().rescans, 2);

        assert_eq!(cache.get_row(20).unwrap(), reference[20]);
        assert_eq!(cache.stats().rescans, 3);
        assert_eq!(source.open_count(), 3);
    }

    #[test]
    fn test_random_access_matches_forward_scan() {
        let source = reference_source().with_unknown_length();
        let reference = source.rows().to_vec();
        let cache = WindowCache::new(Rc::new(source));
        cache.set_cache_size(7).unwrap();
        cache.set_look_ahead_size(3).unwrap();

        for &i in &[5, 6, 40, 2, 41, 13, 14, 15, 0, 33, 21, 9] {
            assert_eq!(cache.get_row(i).unwrap(), reference[i]);
        }
        assert!(cache.get_row(42).is_err());
        assert_eq!(cache.row_count(), Some(42));
    }

    #[test]
    fn test_complete_workflow() {
        // Scores in a JSON lines file, read through a cache into a pipeline
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..200 {
            let score = if i % 10 == 2 {
                "null".to_string()
            } else {
                (i * 7 % 200).to_string()
            };
            writeln!(file, r#"{{"key": "player_{}", "cells": [{}, "team_{}", {}]}}"#, i, i, i % 4, score).unwrap();
        }
        file.flush().unwrap();

        let schema = Schema::new(vec![
            ("id".to_string(), ColumnType::Int64, false),
            ("team".to_string(), ColumnType::String, false),
            ("score".to_string(), ColumnType::Int32, true),
        ]);
        let config = PipelineConfig::from_json_str(
            r#"{
                "cache": { "cache_size": 32, "look_ahead": 8 },
                "columns": ["team", "score"],
                "sort": [{ "column": "score", "order": "descending" }],
                "filter": "team == 'team_1' AND score IS NOT NULL"
            }"#,
        )
        .unwrap();

        let source = Rc::new(JsonLinesSource::new(file.path(), schema));
        let cache = Rc::new(config.open_cache(source).unwrap());
        let executor = config.to_builder().unwrap().build();

        let monitor = ProgressMonitor::new();
        let result = executor.transform(cache, &monitor).unwrap();
        assert_eq!(monitor.progress(), 1.0);

        let rows = collect_rows(&*result).unwrap();
        // team_1 is every i with i % 4 == 1, all of them scored
        assert_eq!(rows.len(), 50);
        let scores: Vec<i32> = rows
            .iter()
            .map(|r| r.get(1).and_then(ColumnValue::as_i32).unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(rows.iter().all(|r| r.get(0) == Some(&ColumnValue::String("team_1".to_string()))));
    }

    #[test]
    fn test_cancel_handle_aborts_pipeline() {
        let source = reference_source();
        let cache = Rc::new(WindowCache::new(Rc::new(source.clone())));

        let mut builder = TransformationPipeline::builder();
        builder.sort(SortKey::descending("Col_A"));
        let executor = builder.build();

        let handle = CancelHandle::new();
        let monitor = ProgressMonitor::with_cancel_handle(handle.clone());
        std::thread::spawn(move || handle.cancel()).join().unwrap();

        let result = executor.transform(cache, &monitor);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(source.open_count(), 0);
    }

    #[test]
    fn test_stacked_views_over_cache() {
        let source = reference_source();
        let cache: TableRef = Rc::new(WindowCache::with_columns(Rc::new(source), &["Col_E", "Col_B"]).unwrap());

        let filtered: TableRef = Rc::new(FilteredTable::new(Rc::clone(&cache), |row| {
            row.key().ends_with('7')
        }));
        let sorted = SortedTable::new(filtered, vec![SortKey::descending("Col_B")]).unwrap();

        let keys: Vec<String> = collect_rows(&sorted)
            .unwrap()
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(keys, vec!["row_7", "row_37", "row_27", "row_17"]);
        assert_eq!(sorted.get_row(0).unwrap().get(0), Some(&ColumnValue::String("[7,4]".to_string())));
    }
}
