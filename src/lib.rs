//! # exprtask: expression feature tables for learner tasks
//!
//! exprtask turns an annotated gene-expression matrix into the flat,
//! labelled table a learning framework expects.
//!
//! ## Features
//!
//! - Features-by-samples matrices from CSV/TSV (optionally gzipped)
//! - Annotation-based feature renaming that refuses identifier collisions
//! - Transposition into a samples-by-features table with a `Class` column
//! - Label-blind variance ranking with deterministic top-K selection
//! - Classification and clustering tasks with seeded holdout / k-fold splits
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use exprtask::data::{DataLoader, FeatureTable, DEFAULT_LABEL_COLUMN};
//! use exprtask::selection::{rank_by_variance, VarianceEstimator};
//! use exprtask::task::{Resampling, Task, TaskId};
//!
//! // Load matrix and sample labels
//! let container = DataLoader::new().load("expr.tsv.gz", "samples.csv").unwrap();
//!
//! // Build the labelled table
//! let build = FeatureTable::from_container(&container, DEFAULT_LABEL_COLUMN).unwrap();
//!
//! // Keep the 500 most variable genes
//! let ranking = rank_by_variance(&build.table, VarianceEstimator::Population);
//! let selection = ranking.select_top(500).unwrap();
//! let reduced = build.table.project(&selection).unwrap();
//!
//! // Wrap as a task and instantiate 5-fold cross-validation
//! let task = Task::classification(TaskId::new("brca").unwrap(), reduced, DEFAULT_LABEL_COLUMN).unwrap();
//! let splits = Resampling::CrossValidation { folds: 5 }.instantiate(&task, 2026).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod selection;
pub mod task;
pub mod utils;

/// Re-export commonly used types
pub use config::AdapterConfig;
pub use data::{FeatureTable, MeasurementContainer};
pub use error::{AdapterError, AdapterResult};
pub use pipeline::{Pipeline, PipelineOutput};
pub use selection::{FeatureRanking, SelectedFeatureSet, VarianceEstimator};
pub use task::{Task, TaskId, TaskKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!(
        "{} v{} - expression feature tables for learner tasks",
        NAME, VERSION
    )
}
