//! Samples-by-features table construction

use crate::data::{check_unique_ids, MeasurementContainer};
use crate::error::{AdapterError, AdapterResult};
use crate::selection::SelectedFeatureSet;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Samples-by-features table with a trailing label column
///
/// Rows follow the sample order of the source container and columns follow its
/// feature order. Every row carries a label.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    sample_ids: Vec<String>,
    feature_ids: Vec<String>,
    /// Row-major, one row per sample
    values: Vec<f64>,
    labels: Vec<String>,
    label_column: String,
}

/// Result of building a feature table
#[derive(Debug, Clone, PartialEq)]
pub struct TableBuild {
    /// The labelled table
    pub table: FeatureTable,
    /// Samples excluded because their label was missing
    pub dropped_samples: Vec<String>,
}

impl TableBuild {
    /// Number of samples excluded for a missing label
    pub fn dropped(&self) -> usize {
        self.dropped_samples.len()
    }
}

/// Transpose a features-by-samples container and append `labels` as the last column
///
/// `labels` must hold one entry per container sample. Samples whose label is
/// `None` are excluded and listed in the result.
pub fn transpose_with_labels<S: AsRef<str>>(
    container: &MeasurementContainer,
    labels: &[Option<S>],
    label_column: &str,
) -> AdapterResult<TableBuild> {
    let n_samples = container.n_samples();
    if labels.len() != n_samples {
        return Err(AdapterError::ShapeMismatch {
            samples: n_samples,
            labels: labels.len(),
        });
    }
    check_unique_ids(container.feature_ids())?;
    if container.feature_ids().iter().any(|id| id == label_column) {
        return Err(AdapterError::DuplicateFeatureIdentifier(label_column.to_string()));
    }

    let n_features = container.n_features();
    let mut sample_ids = Vec::with_capacity(n_samples);
    let mut row_labels = Vec::with_capacity(n_samples);
    let mut values = Vec::with_capacity(n_samples * n_features);
    let mut dropped_samples = Vec::new();

    for (sample, label) in labels.iter().enumerate() {
        let sample_id = &container.sample_ids()[sample];
        let Some(label) = label else {
            dropped_samples.push(sample_id.clone());
            continue;
        };

        sample_ids.push(sample_id.clone());
        row_labels.push(label.as_ref().to_string());
        values.extend((0..n_features).map(|feature| container.value(feature, sample)));
    }

    if !dropped_samples.is_empty() {
        warn!(
            "Dropped {} of {} samples with missing label",
            dropped_samples.len(),
            n_samples
        );
        debug!("Dropped samples: {:?}", dropped_samples);
    }

    info!(
        "Built feature table: {} samples x {} features + {}",
        sample_ids.len(),
        n_features,
        label_column
    );

    Ok(TableBuild {
        table: FeatureTable {
            sample_ids,
            feature_ids: container.feature_ids().to_vec(),
            values,
            labels: row_labels,
            label_column: label_column.to_string(),
        },
        dropped_samples,
    })
}

impl FeatureTable {
    /// Build a table from the labels already attached to `container`
    pub fn from_container(
        container: &MeasurementContainer,
        label_column: &str,
    ) -> AdapterResult<TableBuild> {
        transpose_with_labels(container, container.labels(), label_column)
    }

    /// Create a table directly from per-sample rows
    pub fn new(
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
        rows: &[Vec<f64>],
        labels: Vec<String>,
        label_column: impl Into<String>,
    ) -> AdapterResult<Self> {
        let label_column = label_column.into();
        if rows.len() != sample_ids.len() {
            return Err(AdapterError::MalformedMatrix {
                what: "sample rows",
                expected: sample_ids.len(),
                found: rows.len(),
            });
        }
        if labels.len() != sample_ids.len() {
            return Err(AdapterError::ShapeMismatch {
                samples: sample_ids.len(),
                labels: labels.len(),
            });
        }
        check_unique_ids(&feature_ids)?;
        if feature_ids.contains(&label_column) {
            return Err(AdapterError::DuplicateFeatureIdentifier(label_column));
        }

        let mut values = Vec::with_capacity(rows.len() * feature_ids.len());
        for (sample, row) in rows.iter().enumerate() {
            if row.len() != feature_ids.len() {
                return Err(AdapterError::MalformedMatrix {
                    what: "values per row",
                    expected: feature_ids.len(),
                    found: row.len(),
                });
            }
            if let Some(feature) = row.iter().position(|v| v.is_infinite()) {
                return Err(AdapterError::NonFiniteValue {
                    feature: feature_ids[feature].clone(),
                    sample: sample_ids[sample].clone(),
                });
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            sample_ids,
            feature_ids,
            values,
            labels,
            label_column,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Feature columns plus the label column
    pub fn n_columns(&self) -> usize {
        self.n_features() + 1
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// All column names, label last
    pub fn column_names(&self) -> Vec<&str> {
        self.feature_ids
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.label_column.as_str()))
            .collect()
    }

    /// Index of a feature column
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_ids.iter().position(|id| id == name)
    }

    /// Measurements of one sample
    pub fn row(&self, sample: usize) -> &[f64] {
        let n = self.n_features();
        &self.values[sample * n..(sample + 1) * n]
    }

    pub fn value(&self, sample: usize, feature: usize) -> f64 {
        self.values[sample * self.n_features() + feature]
    }

    /// Iterate over the measurements of one feature column
    pub fn column(&self, feature: usize) -> impl Iterator<Item = f64> + '_ {
        let n = self.n_features();
        self.values.iter().skip(feature).step_by(n.max(1)).copied()
    }

    /// Same measurements with a different label vector
    pub fn with_labels(&self, labels: Vec<String>) -> AdapterResult<Self> {
        if labels.len() != self.n_samples() {
            return Err(AdapterError::ShapeMismatch {
                samples: self.n_samples(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            labels,
            ..self.clone()
        })
    }

    /// Keep the given feature columns, in original column order
    pub fn select_columns(&self, columns: &[usize]) -> AdapterResult<Self> {
        let mut columns = columns.to_vec();
        columns.sort_unstable();
        columns.dedup();
        if let Some(&bad) = columns.iter().find(|&&c| c >= self.n_features()) {
            return Err(AdapterError::ColumnNotFound(format!("#{}", bad)));
        }

        let mut values = Vec::with_capacity(self.n_samples() * columns.len());
        for sample in 0..self.n_samples() {
            let row = self.row(sample);
            values.extend(columns.iter().map(|&c| row[c]));
        }

        Ok(Self {
            sample_ids: self.sample_ids.clone(),
            feature_ids: columns.iter().map(|&c| self.feature_ids[c].clone()).collect(),
            values,
            labels: self.labels.clone(),
            label_column: self.label_column.clone(),
        })
    }

    /// Reduce the table to a selected feature set, keeping the label column
    pub fn project(&self, selection: &SelectedFeatureSet) -> AdapterResult<Self> {
        let index: HashMap<&str, usize> = self
            .feature_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let columns = selection
            .features()
            .iter()
            .map(|name| {
                index
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| AdapterError::ColumnNotFound(name.clone()))
            })
            .collect::<AdapterResult<Vec<_>>>()?;

        debug!(
            "Projecting {} features onto {} selected",
            self.n_features(),
            columns.len()
        );
        self.select_columns(&columns)
    }

    /// Keep the given rows, in the order given
    pub fn subset_rows(&self, rows: &[usize]) -> AdapterResult<Self> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.n_samples()) {
            return Err(AdapterError::MalformedMatrix {
                what: "row index bound",
                expected: self.n_samples(),
                found: bad,
            });
        }

        let mut values = Vec::with_capacity(rows.len() * self.n_features());
        for &r in rows {
            values.extend_from_slice(self.row(r));
        }

        Ok(Self {
            sample_ids: rows.iter().map(|&r| self.sample_ids[r].clone()).collect(),
            feature_ids: self.feature_ids.clone(),
            values,
            labels: rows.iter().map(|&r| self.labels[r].clone()).collect(),
            label_column: self.label_column.clone(),
        })
    }
}
