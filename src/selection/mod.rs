//! Variance-based feature ranking and top-K selection
//!
//! Scoring only reads the numeric block of a table. Labels are never consulted,
//! so a selection computed on a full dataset carries no class information into
//! a later train/test partition.

pub mod variance;

use crate::error::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use variance::{rank_by_variance, rank_container, VarianceEstimator};

/// One entry of a feature ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    /// Feature identifier
    pub feature: String,
    /// Column index in the scored table
    pub column: usize,
    /// Variability score
    pub score: f64,
}

/// Features ordered by descending score, ties by ascending column index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRanking {
    /// Estimator that produced the scores
    pub estimator: VarianceEstimator,
    entries: Vec<RankedFeature>,
}

impl FeatureRanking {
    /// Order scored features into a ranking
    pub(crate) fn from_scores(
        estimator: VarianceEstimator,
        feature_ids: &[String],
        scores: Vec<f64>,
    ) -> Self {
        let mut entries: Vec<RankedFeature> = feature_ids
            .iter()
            .zip(scores)
            .enumerate()
            .map(|(column, (feature, score))| RankedFeature {
                feature: feature.clone(),
                column,
                score,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.column.cmp(&b.column))
        });

        Self { estimator, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RankedFeature] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedFeature> {
        self.entries.iter()
    }

    /// Number of features with a strictly positive score
    pub fn n_variable(&self) -> usize {
        self.entries.iter().filter(|e| e.score > 0.0).count()
    }

    /// 1-based rank of a feature
    pub fn rank_of(&self, feature: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.feature == feature)
            .map(|i| i + 1)
    }

    /// Take the `k` highest-ranked features
    ///
    /// Zero-variance features fill the tail when fewer than `k` features vary.
    pub fn select_top(&self, k: usize) -> AdapterResult<SelectedFeatureSet> {
        let k = checked_feature_count(k as i64, self.len())?;
        let n_variable = self.n_variable();
        if k > n_variable {
            debug!(
                "Requested {} features but only {} vary; padding with constant features",
                k, n_variable
            );
        }

        Ok(SelectedFeatureSet {
            entries: self.entries[..k].to_vec(),
        })
    }
}

/// Validate a requested feature count against the number available
///
/// Accepts a signed value so that counts coming from configuration files or
/// the command line can be checked before conversion.
pub fn checked_feature_count(requested: i64, available: usize) -> AdapterResult<usize> {
    if requested <= 0 || (requested as u64) > (available as u64) {
        return Err(AdapterError::InvalidFeatureCount {
            requested,
            available,
        });
    }
    Ok(requested as usize)
}

/// Top-K slice of a feature ranking, in rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeatureSet {
    entries: Vec<RankedFeature>,
}

impl SelectedFeatureSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RankedFeature] {
        &self.entries
    }

    /// Selected identifiers in rank order
    pub fn features(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.feature.clone()).collect()
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.entries.iter().any(|e| e.feature == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(scores: &[f64]) -> FeatureRanking {
        let ids: Vec<String> = (0..scores.len()).map(|i| format!("g{}", i)).collect();
        FeatureRanking::from_scores(VarianceEstimator::Population, &ids, scores.to_vec())
    }

    #[test]
    fn test_ties_break_by_column() {
        let ranking = ranking(&[0.5, 2.0, 0.5, 2.0]);
        let order: Vec<usize> = ranking.iter().map(|e| e.column).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert_eq!(ranking.rank_of("g3"), Some(2));
    }

    #[test]
    fn test_select_pads_with_constant_features() {
        let ranking = ranking(&[0.0, 3.0, 0.0]);
        let selected = ranking.select_top(3).unwrap();

        assert_eq!(ranking.n_variable(), 1);
        assert_eq!(selected.features(), vec!["g1", "g0", "g2"]);
    }

    #[test]
    fn test_feature_count_bounds() {
        let ranking = ranking(&[1.0, 2.0]);

        assert_eq!(
            ranking.select_top(0),
            Err(AdapterError::InvalidFeatureCount { requested: 0, available: 2 })
        );
        assert_eq!(
            ranking.select_top(3),
            Err(AdapterError::InvalidFeatureCount { requested: 3, available: 2 })
        );
        assert_eq!(ranking.select_top(2).unwrap().len(), 2);
        assert!(checked_feature_count(-1, 2).is_err());
        assert_eq!(checked_feature_count(1, 2), Ok(1));
    }
}
