use crate::data::FeatureTable;
use crate::error::{AdapterError, AdapterResult};
use crate::task::Task;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Resampling strategy over the rows of a task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Resampling {
    /// Single train/test split, `ratio` of rows in training
    Holdout { ratio: f64 },
    /// k-fold cross-validation
    CrossValidation { folds: usize },
}

impl Default for Resampling {
    fn default() -> Self {
        Resampling::Holdout { ratio: 0.7 }
    }
}

/// One train/test partition, row indices ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits instantiated for a specific task and seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleInstance {
    pub task_id: String,
    pub resampling: Resampling,
    pub seed: u64,
    pub splits: Vec<Split>,
}

impl ResampleInstance {
    /// Number of train/test iterations
    pub fn iters(&self) -> usize {
        self.splits.len()
    }

    /// Cut `table` into one `(train, test)` pair of tables per split
    pub fn partition(&self, table: &FeatureTable) -> AdapterResult<Vec<(FeatureTable, FeatureTable)>> {
        self.splits
            .iter()
            .map(|split| Ok((table.subset_rows(&split.train)?, table.subset_rows(&split.test)?)))
            .collect()
    }
}

impl Resampling {
    /// Instantiate the splits for `task`
    pub fn instantiate(&self, task: &Task, seed: u64) -> AdapterResult<ResampleInstance> {
        let splits = self.split_rows(task.n_rows(), seed)?;
        info!(
            "Instantiated {} split(s) for task {} with seed {}",
            splits.len(),
            task.id(),
            seed
        );

        Ok(ResampleInstance {
            task_id: task.id().to_string(),
            resampling: *self,
            seed,
            splits,
        })
    }

    /// Partition `0..n_rows` according to this strategy
    pub fn split_rows(&self, n_rows: usize, seed: u64) -> AdapterResult<Vec<Split>> {
        let mut rows: Vec<usize> = (0..n_rows).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        match *self {
            Resampling::Holdout { ratio } => {
                if !(ratio > 0.0 && ratio < 1.0) {
                    return Err(AdapterError::InvalidResampling(format!(
                        "holdout ratio {} must lie strictly between 0 and 1",
                        ratio
                    )));
                }
                if n_rows < 2 {
                    return Err(AdapterError::InvalidResampling(format!(
                        "holdout needs at least 2 rows, task has {}",
                        n_rows
                    )));
                }

                rows.shuffle(&mut rng);
                let n_train = ((n_rows as f64 * ratio) as usize).clamp(1, n_rows - 1);
                debug!("Holdout: {} train, {} test", n_train, n_rows - n_train);

                let mut train = rows[..n_train].to_vec();
                let mut test = rows[n_train..].to_vec();
                train.sort_unstable();
                test.sort_unstable();
                Ok(vec![Split { train, test }])
            }
            Resampling::CrossValidation { folds } => {
                if folds < 2 || folds > n_rows {
                    return Err(AdapterError::InvalidResampling(format!(
                        "{} folds requested for {} rows",
                        folds, n_rows
                    )));
                }

                rows.shuffle(&mut rng);
                let mut assignment = vec![0usize; n_rows];
                for (position, &row) in rows.iter().enumerate() {
                    assignment[row] = position % folds;
                }

                let splits = (0..folds)
                    .map(|fold| {
                        let (test, train): (Vec<usize>, Vec<usize>) =
                            (0..n_rows).partition(|&row| assignment[row] == fold);
                        Split { train, test }
                    })
                    .collect();
                Ok(splits)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureTable, DEFAULT_LABEL_COLUMN};
    use crate::task::TaskId;

    fn create_test_task(n_rows: usize) -> Task {
        let table = FeatureTable::new(
            (0..n_rows).map(|i| format!("S{}", i)).collect(),
            vec!["g1".into()],
            &(0..n_rows).map(|i| vec![i as f64]).collect::<Vec<_>>(),
            (0..n_rows).map(|i| if i % 2 == 0 { "A".into() } else { "B".into() }).collect(),
            DEFAULT_LABEL_COLUMN,
        )
        .unwrap();
        Task::classification(TaskId::new("cv").unwrap(), table, DEFAULT_LABEL_COLUMN).unwrap()
    }

    #[test]
    fn test_cross_validation_partitions_rows() {
        let task = create_test_task(10);
        let instance = Resampling::CrossValidation { folds: 3 }
            .instantiate(&task, 42)
            .unwrap();

        assert_eq!(instance.iters(), 3);
        let mut seen: Vec<usize> = instance.splits.iter().flat_map(|s| s.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        for split in &instance.splits {
            assert_eq!(split.train.len() + split.test.len(), 10);
            assert!(split.test.len() == 3 || split.test.len() == 4);
            assert!(split.train.iter().all(|r| !split.test.contains(r)));
        }
    }

    #[test]
    fn test_holdout_sizes() {
        let splits = Resampling::Holdout { ratio: 0.7 }.split_rows(10, 2026).unwrap();

        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].train.len(), 7);
        assert_eq!(splits[0].test.len(), 3);
    }

    #[test]
    fn test_same_seed_same_splits() {
        let cv = Resampling::CrossValidation { folds: 5 };
        assert_eq!(cv.split_rows(20, 7).unwrap(), cv.split_rows(20, 7).unwrap());
        assert_ne!(cv.split_rows(20, 7).unwrap(), cv.split_rows(20, 8).unwrap());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Resampling::Holdout { ratio: 1.0 }.split_rows(10, 1).is_err());
        assert!(Resampling::Holdout { ratio: f64::NAN }.split_rows(10, 1).is_err());
        assert!(Resampling::Holdout { ratio: 0.5 }.split_rows(1, 1).is_err());
        assert!(Resampling::CrossValidation { folds: 1 }.split_rows(10, 1).is_err());
        assert!(Resampling::CrossValidation { folds: 11 }.split_rows(10, 1).is_err());
    }

    #[test]
    fn test_partition_tables() {
        let task = create_test_task(6);
        let instance = Resampling::CrossValidation { folds: 3 }
            .instantiate(&task, 11)
            .unwrap();
        let parts = instance.partition(task.table()).unwrap();

        assert_eq!(parts.len(), 3);
        for ((train, test), split) in parts.iter().zip(&instance.splits) {
            assert_eq!(train.n_samples(), split.train.len());
            assert_eq!(test.n_samples(), 2);
            let expected: Vec<String> = split.test.iter().map(|&r| format!("S{}", r)).collect();
            assert_eq!(test.sample_ids(), &expected[..]);
            assert_eq!(test.row(0), &[split.test[0] as f64]);
            assert_eq!(train.column_names(), vec!["g1", DEFAULT_LABEL_COLUMN]);
        }

        // Splits from a larger task do not fit a smaller table
        let small = create_test_task(3);
        assert!(instance.partition(small.table()).is_err());
    }
}
