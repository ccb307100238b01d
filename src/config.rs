//! Adapter configuration

use crate::data::{UnmappedPolicy, DEFAULT_LABEL_COLUMN};
use crate::selection::VarianceEstimator;
use crate::task::{Resampling, TaskKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Configuration for one table-building run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Sample identifier column in the sample sheet
    pub sample_column: String,
    /// Class label column in the sample sheet, reused as the table's label column
    pub label_column: String,
    /// Number of features to keep (None = all)
    pub top_k: Option<i64>,
    /// Variance estimator for ranking
    pub estimator: VarianceEstimator,
    /// Restrict samples to these classes (empty = all)
    pub classes: Vec<String>,
    /// Features without annotation
    pub unmapped: UnmappedPolicy,
    /// Task identifier
    pub task_id: String,
    /// Task flavor
    pub task_kind: TaskKind,
    /// Resampling strategy
    pub resampling: Resampling,
    /// Random seed for resampling
    pub seed: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            sample_column: "sample".to_string(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            top_k: None,
            estimator: VarianceEstimator::default(),
            classes: Vec::new(),
            unmapped: UnmappedPolicy::default(),
            task_id: "expression".to_string(),
            task_kind: TaskKind::default(),
            resampling: Resampling::default(),
            seed: 2026,
        }
    }
}

impl AdapterConfig {
    /// Load configuration from a JSON file; absent fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
