//! Building and running transformation pipelines.
//!
//! A pipeline is assembled with [`PipelineBuilder`] and frozen by
//! [`PipelineBuilder::build`] into a [`TransformationExecutor`]. Every
//! pipeline starts with a projection stage, so the output column set is
//! always known; sorts and filters run after it in the order they were added.
//!
//! # Examples
//!
//! ```
//! use windowtable::{FilterInfo, NoopMonitor, RandomAccessTable, Schema, SortKey};
//! use windowtable::{ColumnType, ColumnValue, Row, TransformationPipeline, VecSource, WindowCache};
//! use std::rc::Rc;
//!
//! let schema = Schema::new(vec![
//!     ("name".to_string(), ColumnType::String, false),
//!     ("score".to_string(), ColumnType::Int32, false),
//! ]);
//! let rows = vec![
//!     Row::new("row_0", vec![ColumnValue::String("Bob".into()), ColumnValue::Int32(85)]),
//!     Row::new("row_1", vec![ColumnValue::String("Alice".into()), ColumnValue::Int32(92)]),
//!     Row::new("row_2", vec![ColumnValue::String("Cara".into()), ColumnValue::Int32(97)]),
//! ];
//! let cache = Rc::new(WindowCache::new(Rc::new(VecSource::new(schema, rows))));
//!
//! let mut builder = TransformationPipeline::builder();
//! builder
//!     .columns(["name", "score"])
//!     .sort(SortKey::descending("score"))
//!     .filter(FilterInfo::expression("score > 90").unwrap())
//!     .unwrap();
//! let executor = builder.build();
//!
//! let result = executor.transform(cache, &NoopMonitor).unwrap();
//! assert_eq!(result.row_count(), Some(2));
//! assert_eq!(result.get_row(0).unwrap().get(0), Some(&ColumnValue::String("Cara".into())));
//! ```

use crate::error::{Error, Result};
use crate::monitor::ExecutionMonitor;
use crate::table::TableRef;
use crate::transform::{FilterInfo, ProjectionInfo, SortInfo, Transformation};
use std::rc::Rc;

/// Entry point for assembling pipelines.
pub struct TransformationPipeline;

impl TransformationPipeline {
    /// A builder seeded with a projection of all input columns.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder {
            transformations: vec![Transformation::Projection(ProjectionInfo::all())],
        }
    }
}

/// Collects stages until [`build`](PipelineBuilder::build) is called.
///
/// The builder stays usable after `build`, but later changes only affect
/// executors built afterwards.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    transformations: Vec<Transformation>,
}

impl PipelineBuilder {
    /// Narrows the leading projection to `names`, in that order.
    pub fn columns<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transformations[0] = Transformation::Projection(ProjectionInfo::columns(names));
        self
    }

    /// Appends a sort stage.
    pub fn sort(&mut self, info: impl Into<SortInfo>) -> &mut Self {
        self.transformations.push(Transformation::Sort(info.into()));
        self
    }

    /// Appends a filter stage.
    ///
    /// Fails with `InvalidArgument`, leaving the builder unchanged, when the
    /// filter description is of a kind this pipeline cannot evaluate.
    pub fn filter(&mut self, info: impl Into<FilterInfo>) -> Result<&mut Self> {
        let info = info.into();
        if !info.is_supported() {
            return Err(Error::invalid(format!(
                "Filter kind '{}' is not supported by this pipeline",
                info.kind()
            )));
        }
        self.transformations.push(Transformation::Filter(info));
        Ok(self)
    }

    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    /// Freezes the current stages into an executor.
    pub fn build(&self) -> TransformationExecutor {
        TransformationExecutor {
            transformations: self.transformations.clone().into(),
        }
    }
}

/// Applies a frozen list of stages to input tables.
///
/// Executions are independent of each other; an executor can be run any
/// number of times, against different inputs.
#[derive(Debug, Clone)]
pub struct TransformationExecutor {
    transformations: Rc<[Transformation]>,
}

impl TransformationExecutor {
    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    /// Runs every stage in order, each consuming the previous stage's output.
    ///
    /// The monitor is checked before each stage starts, and each stage
    /// reports its phase message and progress. Intermediate tables are kept
    /// only as far as the final table references them.
    pub fn transform(&self, input: TableRef, monitor: &dyn ExecutionMonitor) -> Result<TableRef> {
        let stages = self.transformations.len();
        let mut table = input;
        for (i, stage) in self.transformations.iter().enumerate() {
            monitor.check_cancelled()?;
            log::debug!("Running stage {}/{}: {}", i + 1, stages, stage.name());
            monitor.set_message(stage.phase_message());
            monitor.set_progress(0.0);
            table = stage.apply(table, monitor)?;
            monitor.set_progress(1.0);
        }
        Ok(table)
    }
}
