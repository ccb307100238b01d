use crate::data::{FeatureTable, MeasurementContainer};
use crate::selection::FeatureRanking;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Variance estimator used as the variability score
///
/// Both estimators give the same rank order on a complete matrix; they differ
/// only in scale, and in ordering when features have different numbers of
/// missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceEstimator {
    /// Divide by n
    #[default]
    Population,
    /// Divide by n - 1 (Bessel's correction)
    Sample,
}

impl VarianceEstimator {
    /// Variance of the finite values, 0 when too few are present
    pub fn variance<I: IntoIterator<Item = f64>>(&self, values: I) -> f64 {
        let present: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        let n = present.len();
        let denominator = match self {
            VarianceEstimator::Population => n,
            VarianceEstimator::Sample => n.saturating_sub(1),
        };
        if denominator == 0 {
            return 0.0;
        }

        let mean = present.iter().sum::<f64>() / n as f64;
        let sum_sq: f64 = present.iter().map(|v| (v - mean) * (v - mean)).sum();
        sum_sq / denominator as f64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VarianceEstimator::Population => "population",
            VarianceEstimator::Sample => "sample",
        }
    }
}

impl std::fmt::Display for VarianceEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rank the feature columns of a table by variance across samples
///
/// The label column is not part of the scored block.
pub fn rank_by_variance(table: &FeatureTable, estimator: VarianceEstimator) -> FeatureRanking {
    let scores: Vec<f64> = (0..table.n_features())
        .map(|feature| estimator.variance(table.column(feature)))
        .collect();

    log_ranking(&scores, estimator);
    FeatureRanking::from_scores(estimator, table.feature_ids(), scores)
}

/// Rank the feature rows of a container by variance across all its samples
pub fn rank_container(
    container: &MeasurementContainer,
    estimator: VarianceEstimator,
) -> FeatureRanking {
    let scores: Vec<f64> = (0..container.n_features())
        .map(|feature| estimator.variance(container.feature_row(feature).iter().copied()))
        .collect();

    log_ranking(&scores, estimator);
    FeatureRanking::from_scores(estimator, container.feature_ids(), scores)
}

fn log_ranking(scores: &[f64], estimator: VarianceEstimator) {
    let constant = scores.iter().filter(|&&s| s == 0.0).count();
    info!(
        "Scored {} features by {} variance ({} constant)",
        scores.len(),
        estimator,
        constant
    );
    debug!("Scores: {:?}", scores);
}
