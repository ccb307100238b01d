//! End-to-end table building: container to reduced learner task

use crate::config::AdapterConfig;
use crate::data::{FeatureTable, MeasurementContainer};
use crate::error::{AdapterError, AdapterResult};
use crate::selection::{
    checked_feature_count, rank_by_variance, FeatureRanking, RankedFeature, SelectedFeatureSet,
    VarianceEstimator,
};
use crate::task::{ResampleInstance, Task, TaskId, TaskKind};
use serde::Serialize;
use tracing::info;

/// Everything produced by one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Labelled table over all features
    pub full_table: FeatureTable,
    /// Samples excluded for a missing label
    pub dropped_samples: Vec<String>,
    pub ranking: FeatureRanking,
    pub selection: SelectedFeatureSet,
    /// Task over the selected features
    pub task: Task,
}

/// Serializable report of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub task_id: String,
    pub task_kind: TaskKind,
    pub samples: usize,
    pub dropped_samples: Vec<String>,
    pub features_total: usize,
    pub features_selected: usize,
    pub estimator: VarianceEstimator,
    pub selected: Vec<RankedFeature>,
    pub class_counts: Vec<(String, usize)>,
}

impl PipelineOutput {
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            task_id: self.task.id().to_string(),
            task_kind: self.task.kind(),
            samples: self.task.n_rows(),
            dropped_samples: self.dropped_samples.clone(),
            features_total: self.full_table.n_features(),
            features_selected: self.selection.len(),
            estimator: self.ranking.estimator,
            selected: self.selection.entries().to_vec(),
            class_counts: self.task.class_counts(),
        }
    }
}

/// Table-building pipeline driven by an [`AdapterConfig`]
pub struct Pipeline {
    config: AdapterConfig,
}

impl Pipeline {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Run class filter, transposition, ranking, selection and task wrapping
    ///
    /// `container` is not modified.
    pub fn run(&self, container: &MeasurementContainer) -> AdapterResult<PipelineOutput> {
        let config = &self.config;
        let task_id = TaskId::new(config.task_id.clone())?;

        let filtered;
        let container = if config.classes.is_empty() {
            container
        } else {
            filtered = container.retain_classes(config.classes.as_slice());
            info!(
                "Kept {} of {} samples in classes {:?}",
                filtered.n_samples(),
                container.n_samples(),
                config.classes
            );
            &filtered
        };

        let build = FeatureTable::from_container(container, &config.label_column)?;
        let full_table = build.table;
        if full_table.n_samples() == 0 {
            return Err(AdapterError::EmptyTable("no labelled samples"));
        }
        if full_table.n_features() == 0 {
            return Err(AdapterError::EmptyTable("no features"));
        }

        let ranking = rank_by_variance(&full_table, config.estimator);
        let k = match config.top_k {
            Some(k) => checked_feature_count(k, ranking.len())?,
            None => ranking.len(),
        };
        let selection = ranking.select_top(k)?;
        let reduced = full_table.project(&selection)?;

        let task = Task::from_kind(config.task_kind, task_id, reduced, &config.label_column)?;
        info!(
            "Task {} ({}): {} samples x {} features",
            task.id(),
            task.kind(),
            task.n_rows(),
            task.feature_names().len()
        );

        Ok(PipelineOutput {
            full_table,
            dropped_samples: build.dropped_samples,
            ranking,
            selection,
            task,
        })
    }

    /// Instantiate the configured resampling on `task` with the configured seed
    pub fn resample(&self, task: &Task) -> AdapterResult<ResampleInstance> {
        self.config.resampling.instantiate(task, self.config.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnmappedPolicy;
    use crate::export;
    use crate::task::Resampling;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_test_container() -> MeasurementContainer {
        MeasurementContainer::from_rows(
            vec!["f1".into(), "f2".into(), "f3".into()],
            vec!["S1".into(), "S2".into(), "S3".into(), "S4".into(), "S5".into()],
            &[
                vec![1i32, 1, 1, 1, 9],
                vec![1, 2, 3, 4, 0],
                vec![4, 3, 2, 1, 0],
            ],
        )
        .unwrap()
        .with_labels(vec![
            Some("A".into()),
            Some("A".into()),
            Some("B".into()),
            Some("B".into()),
            None,
        ])
        .unwrap()
    }

    #[test]
    fn test_pipeline_selects_top_features() {
        let pipeline = Pipeline::new(AdapterConfig {
            top_k: Some(2),
            task_id: "toy".into(),
            ..AdapterConfig::default()
        });
        let output = pipeline.run(&create_test_container()).unwrap();

        assert_eq!(output.dropped_samples, vec!["S5".to_string()]);
        assert_eq!(output.full_table.n_columns(), 4);
        assert_eq!(output.selection.features(), vec!["f2", "f3"]);
        assert_eq!(output.task.table().column_names(), vec!["f2", "f3", "Class"]);
        assert_eq!(output.task.n_rows(), 4);

        let summary = output.summary();
        assert_eq!(summary.features_total, 3);
        assert_eq!(summary.features_selected, 2);
        assert_eq!(summary.class_counts, vec![("A".to_string(), 2), ("B".to_string(), 2)]);
    }

    #[test]
    fn test_pipeline_defaults_to_all_features() {
        let output = Pipeline::new(AdapterConfig::default())
            .run(&create_test_container())
            .unwrap();
        assert_eq!(output.selection.features(), vec!["f2", "f3", "f1"]);
    }

    #[test]
    fn test_pipeline_rejects_bad_feature_count() {
        for k in [0, -3, 4] {
            let pipeline = Pipeline::new(AdapterConfig {
                top_k: Some(k),
                ..AdapterConfig::default()
            });
            assert_eq!(
                pipeline.run(&create_test_container()).unwrap_err(),
                AdapterError::InvalidFeatureCount { requested: k, available: 3 }
            );
        }
    }

    #[test]
    fn test_pipeline_class_filter_and_clustering() {
        let pipeline = Pipeline::new(AdapterConfig {
            classes: vec!["B".into()],
            task_kind: TaskKind::Clustering,
            ..AdapterConfig::default()
        });
        let output = pipeline.run(&create_test_container()).unwrap();

        assert_eq!(output.task.kind(), TaskKind::Clustering);
        assert_eq!(output.task.n_rows(), 2);
        assert!(output.dropped_samples.is_empty());
        assert_eq!(output.task.target(), None);
    }

    #[test]
    fn test_pipeline_without_labels() {
        let container = MeasurementContainer::from_rows(
            vec!["f1".into()],
            vec!["S1".into()],
            &[vec![1.0]],
        )
        .unwrap();

        let result = Pipeline::new(AdapterConfig::default()).run(&container);
        assert_eq!(result.unwrap_err(), AdapterError::EmptyTable("no labelled samples"));
    }

    #[test]
    fn test_pipeline_without_features() {
        let container = create_test_container()
            .rename_features(&HashMap::new(), UnmappedPolicy::Drop)
            .unwrap();
        assert_eq!(container.n_features(), 0);

        let result = Pipeline::new(AdapterConfig::default()).run(&container);
        assert_eq!(result.unwrap_err(), AdapterError::EmptyTable("no features"));
    }

    #[test]
    fn test_resample_uses_configured_seed() {
        let config = AdapterConfig {
            resampling: Resampling::CrossValidation { folds: 2 },
            seed: 99,
            ..AdapterConfig::default()
        };
        let pipeline = Pipeline::new(config);
        let output = pipeline.run(&create_test_container()).unwrap();

        let instance = pipeline.resample(&output.task).unwrap();
        assert_eq!(instance.seed, 99);
        assert_eq!(instance.resampling, Resampling::CrossValidation { folds: 2 });
        assert_eq!(
            instance.splits,
            Resampling::CrossValidation { folds: 2 }.split_rows(4, 99).unwrap()
        );
    }

    #[test]
    fn test_config_file_seed_reaches_split_output() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        let splits_path = dir.path().join("splits.json");
        std::fs::write(
            &config_path,
            r#"{"seed": 123, "resampling": {"method": "holdout", "ratio": 0.5}}"#,
        )
        .unwrap();

        let pipeline = Pipeline::new(AdapterConfig::from_json_file(&config_path).unwrap());
        let output = pipeline.run(&create_test_container()).unwrap();
        let instance = pipeline.resample(&output.task).unwrap();
        export::save_json(&instance, &splits_path).unwrap();

        let written: ResampleInstance =
            serde_json::from_str(&std::fs::read_to_string(&splits_path).unwrap()).unwrap();
        assert_eq!(written.seed, 123);
        assert_eq!(
            written.splits,
            Resampling::Holdout { ratio: 0.5 }.split_rows(4, 123).unwrap()
        );
    }
}
