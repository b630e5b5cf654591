//! Pipeline configuration files.
//!
//! A configuration is a JSON document describing the cache in front of a
//! source and the stages applied to it:
//!
//! ```json
//! {
//!   "cache": { "cache_size": 500, "look_ahead": 50 },
//!   "columns": ["name", "score"],
//!   "sort": [{ "column": "score", "order": "descending" }],
//!   "filter": "score > 90"
//! }
//! ```
//!
//! Every field is optional.

use crate::cache::{WindowCache, WindowCacheConfig};
use crate::error::Result;
use crate::pipeline::{PipelineBuilder, TransformationPipeline};
use crate::source::SequentialSource;
use crate::transform::FilterInfo;
use crate::view::SortKey;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub cache: WindowCacheConfig,
    /// Output columns, in order. `None` keeps every column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    /// Filter expression, e.g. `score > 90 AND name != 'Bob'`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl PipelineConfig {
    /// Parses and validates a configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.cache.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A window cache over `source` configured by the `cache` section.
    pub fn open_cache(&self, source: Rc<dyn SequentialSource>) -> Result<WindowCache> {
        WindowCache::with_config(source, &self.cache)
    }

    /// A pipeline builder holding the configured stages: the column
    /// projection, then the sort if any keys are given, then the filter.
    pub fn to_builder(&self) -> Result<PipelineBuilder> {
        let mut builder = TransformationPipeline::builder();
        if let Some(columns) = &self.columns {
            builder.columns(columns.iter().cloned());
        }
        if !self.sort.is_empty() {
            builder.sort(self.sort.clone());
        }
        if let Some(filter) = &self.filter {
            builder.filter(FilterInfo::expression(filter)?)?;
        }
        Ok(builder)
    }
}
