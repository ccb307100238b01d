use crate::config::AdapterConfig;
use crate::task::Resampling;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// exprtask: expression feature tables and learner tasks
#[derive(Parser, Debug)]
#[command(name = "exprtask")]
#[command(about = "Build labelled, variance-filtered feature tables from expression matrices")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a labelled feature table and select the most variable features
    Build(BuildArgs),

    /// Rank matrix features by variance
    Rank(RankArgs),

    /// Instantiate train/test splits over a feature table
    Split(SplitArgs),
}

/// Build arguments
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Expression matrix (features x samples; CSV, TSV, optionally gzipped)
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Sample sheet with sample identifiers and class labels
    #[arg(short, long, required = true)]
    pub samples: PathBuf,

    /// Two-column annotation map used to rename features
    #[arg(short, long)]
    pub annotation: Option<PathBuf>,

    /// Output file for the reduced table
    #[arg(short, long, default_value = "table.csv")]
    pub output: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of most variable features to keep
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    pub top_k: Option<i64>,

    /// Label column in the sample sheet
    #[arg(long)]
    pub label_column: Option<String>,

    /// Sample identifier column in the sample sheet
    #[arg(long)]
    pub sample_column: Option<String>,

    /// Keep only these classes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub classes: Vec<String>,

    /// Drop features missing from the annotation map
    #[arg(long)]
    pub drop_unmapped: bool,

    /// Score with sample variance instead of population variance
    #[arg(long)]
    pub sample_variance: bool,

    /// Task identifier
    #[arg(long)]
    pub task_id: Option<String>,

    /// Build a clustering task instead of a classification task
    #[arg(long)]
    pub clustering: bool,

    /// Write the full feature ranking here
    #[arg(long)]
    pub ranking: Option<PathBuf>,

    /// Write a JSON run summary here
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Write splits of the configured resampling here (JSON)
    #[arg(long)]
    pub splits: Option<PathBuf>,

    /// Random seed for the splits
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Rank arguments
#[derive(Args, Debug)]
pub struct RankArgs {
    /// Expression matrix (features x samples)
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Output file for the ranking
    #[arg(short, long, default_value = "ranking.csv")]
    pub output: PathBuf,

    /// Score with sample variance instead of population variance
    #[arg(long)]
    pub sample_variance: bool,
}

/// Split arguments
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Feature table written by `build`
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Output file for the splits (JSON)
    #[arg(short, long, default_value = "splits.json")]
    pub output: PathBuf,

    /// Configuration file (JSON); flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Label column of the table
    #[arg(long)]
    pub label_column: Option<String>,

    /// Number of cross-validation folds
    #[arg(long, conflicts_with = "holdout")]
    pub folds: Option<usize>,

    /// Training fraction for a single holdout split
    #[arg(long)]
    pub holdout: Option<f64>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Task identifier
    #[arg(long)]
    pub task_id: Option<String>,

    /// Also write train_<i>/test_<i> tables into this directory
    #[arg(long)]
    pub tables_dir: Option<PathBuf>,

    /// File extension of the split tables
    #[arg(long, default_value = "csv")]
    pub tables_format: String,
}

impl SplitArgs {
    /// Apply the flags given on the command line on top of `config`
    pub fn apply_to(&self, config: &mut AdapterConfig) {
        if let Some(column) = &self.label_column {
            config.label_column = column.clone();
        }
        if let Some(folds) = self.folds {
            config.resampling = Resampling::CrossValidation { folds };
        }
        if let Some(ratio) = self.holdout {
            config.resampling = Resampling::Holdout { ratio };
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(id) = &self.task_id {
            config.task_id = id.clone();
        }
    }
}

/// Parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Setup logging based on verbosity
pub fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
