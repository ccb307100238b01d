pub mod loader;
pub mod table;

use crate::error::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub use loader::DataLoader;
pub use table::{transpose_with_labels, FeatureTable, TableBuild};

/// Name of the trailing label column in a feature table
pub const DEFAULT_LABEL_COLUMN: &str = "Class";

/// Cell values treated as missing in numeric and label fields
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Check whether a raw cell denotes a missing value
pub fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_TOKENS.iter().any(|&token| token == trimmed)
}

/// Return the first identifier that occurs more than once
pub(crate) fn check_unique_ids(ids: &[String]) -> AdapterResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(AdapterError::DuplicateFeatureIdentifier(id.clone()));
        }
    }
    Ok(())
}

/// What to do with features absent from an annotation map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Keep the original identifier
    #[default]
    Keep,
    /// Remove the feature row
    Drop,
}

/// Features-by-samples measurement matrix with per-sample class labels
///
/// Values are stored row-major, one row per feature. Every method that changes
/// the shape or the identifiers returns a new container.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementContainer {
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
    values: Vec<f64>,
    labels: Vec<Option<String>>,
}

impl MeasurementContainer {
    /// Create a container from per-feature rows
    ///
    /// Any numeric type that widens losslessly into `f64` is accepted, so
    /// integer counts are never truncated. NaN marks a missing measurement;
    /// infinities are rejected. Labels start out missing; attach
    /// them with [`MeasurementContainer::with_labels`].
    pub fn from_rows<T: Copy + Into<f64>>(
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        rows: &[Vec<T>],
    ) -> AdapterResult<Self> {
        if rows.len() != feature_ids.len() {
            return Err(AdapterError::MalformedMatrix {
                what: "feature rows",
                expected: feature_ids.len(),
                found: rows.len(),
            });
        }
        check_unique_ids(&feature_ids)?;

        let n_samples = sample_ids.len();
        let mut values = Vec::with_capacity(feature_ids.len() * n_samples);
        for (feature, row) in rows.iter().enumerate() {
            if row.len() != n_samples {
                return Err(AdapterError::MalformedMatrix {
                    what: "values per row",
                    expected: n_samples,
                    found: row.len(),
                });
            }
            for (sample, &v) in row.iter().enumerate() {
                let v: f64 = v.into();
                if v.is_infinite() {
                    return Err(AdapterError::NonFiniteValue {
                        feature: feature_ids[feature].clone(),
                        sample: sample_ids[sample].clone(),
                    });
                }
                values.push(v);
            }
        }

        Ok(Self {
            feature_ids,
            sample_ids,
            values,
            labels: vec![None; n_samples],
        })
    }

    /// Attach one optional class label per sample
    pub fn with_labels(mut self, labels: Vec<Option<String>>) -> AdapterResult<Self> {
        if labels.len() != self.sample_ids.len() {
            return Err(AdapterError::ShapeMismatch {
                samples: self.sample_ids.len(),
                labels: labels.len(),
            });
        }
        self.labels = labels;
        Ok(self)
    }

    /// Number of feature rows
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Number of sample columns
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn labels(&self) -> &[Option<String>] {
        &self.labels
    }

    /// Measurements of one feature across all samples
    pub fn feature_row(&self, feature: usize) -> &[f64] {
        let n = self.n_samples();
        &self.values[feature * n..(feature + 1) * n]
    }

    /// Single measurement
    pub fn value(&self, feature: usize, sample: usize) -> f64 {
        self.values[feature * self.n_samples() + sample]
    }

    /// Rename feature rows through an annotation map
    ///
    /// Two rows mapping to the same identifier is an error rather than a merge.
    pub fn rename_features(
        &self,
        mapping: &HashMap<String, String>,
        policy: UnmappedPolicy,
    ) -> AdapterResult<Self> {
        let mut feature_ids = Vec::with_capacity(self.n_features());
        let mut kept_rows = Vec::with_capacity(self.n_features());
        let mut unmapped = 0usize;

        for (row, id) in self.feature_ids.iter().enumerate() {
            match mapping.get(id) {
                Some(renamed) => {
                    feature_ids.push(renamed.clone());
                    kept_rows.push(row);
                }
                None => {
                    unmapped += 1;
                    if policy == UnmappedPolicy::Keep {
                        feature_ids.push(id.clone());
                        kept_rows.push(row);
                    }
                }
            }
        }

        if unmapped > 0 {
            match policy {
                UnmappedPolicy::Keep => debug!("{} features kept their original identifier", unmapped),
                UnmappedPolicy::Drop => warn!("Dropped {} features without annotation", unmapped),
            }
        }

        check_unique_ids(&feature_ids)?;

        let mut values = Vec::with_capacity(kept_rows.len() * self.n_samples());
        for &row in &kept_rows {
            values.extend_from_slice(self.feature_row(row));
        }

        Ok(Self {
            feature_ids,
            sample_ids: self.sample_ids.clone(),
            values,
            labels: self.labels.clone(),
        })
    }

    /// Keep the samples accepted by `keep`, in original order
    ///
    /// The predicate receives the sample identifier and its label.
    pub fn retain_samples<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str, Option<&str>) -> bool,
    {
        let kept: Vec<usize> = (0..self.n_samples())
            .filter(|&s| keep(&self.sample_ids[s], self.labels[s].as_deref()))
            .collect();

        let mut values = Vec::with_capacity(self.n_features() * kept.len());
        for feature in 0..self.n_features() {
            let row = self.feature_row(feature);
            values.extend(kept.iter().map(|&s| row[s]));
        }

        Self {
            feature_ids: self.feature_ids.clone(),
            sample_ids: kept.iter().map(|&s| self.sample_ids[s].clone()).collect(),
            values,
            labels: kept.iter().map(|&s| self.labels[s].clone()).collect(),
        }
    }

    /// Keep samples whose label is one of `classes`
    pub fn retain_classes<S: AsRef<str>>(&self, classes: &[S]) -> Self {
        self.retain_samples(|_, label| {
            label.map_or(false, |l| classes.iter().any(|c| c.as_ref() == l))
        })
    }
}
