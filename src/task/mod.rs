//! Learner-task adapter
//!
//! Wraps a feature table for an external learning procedure. A task holds the
//! data and the role of each column; it computes nothing itself.

pub mod resampling;

use crate::data::FeatureTable;
use crate::error::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use resampling::{ResampleInstance, Resampling, Split};

/// Caller-chosen task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> AdapterResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AdapterError::InvalidTaskId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Label column is the supervised target
    #[default]
    Classification,
    /// Label column is ignored
    Clustering,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Classification => "classification",
            TaskKind::Clustering => "clustering",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Feature table bound to a task flavor
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    table: FeatureTable,
}

impl Task {
    /// Classification task with `target` as the supervised column
    ///
    /// `target` must name the table's label column.
    pub fn classification(id: TaskId, table: FeatureTable, target: &str) -> AdapterResult<Self> {
        if target != table.label_column() {
            if table.feature_index(target).is_some() {
                return Err(AdapterError::NonCategoricalTarget(target.to_string()));
            }
            return Err(AdapterError::ColumnNotFound(target.to_string()));
        }

        Ok(Self {
            id,
            kind: TaskKind::Classification,
            table,
        })
    }

    /// Clustering task; the label column is carried but not exposed as a target
    pub fn clustering(id: TaskId, table: FeatureTable) -> Self {
        Self {
            id,
            kind: TaskKind::Clustering,
            table,
        }
    }

    /// Build either flavor from a kind value
    pub fn from_kind(
        kind: TaskKind,
        id: TaskId,
        table: FeatureTable,
        target: &str,
    ) -> AdapterResult<Self> {
        match kind {
            TaskKind::Classification => Self::classification(id, table, target),
            TaskKind::Clustering => Ok(Self::clustering(id, table)),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    pub fn into_table(self) -> FeatureTable {
        self.table
    }

    pub fn n_rows(&self) -> usize {
        self.table.n_samples()
    }

    /// Input columns, label excluded
    pub fn feature_names(&self) -> &[String] {
        self.table.feature_ids()
    }

    /// Target column name, classification only
    pub fn target_name(&self) -> Option<&str> {
        match self.kind {
            TaskKind::Classification => Some(self.table.label_column()),
            TaskKind::Clustering => None,
        }
    }

    /// Target values, classification only
    pub fn target(&self) -> Option<&[String]> {
        match self.kind {
            TaskKind::Classification => Some(self.table.labels()),
            TaskKind::Clustering => None,
        }
    }

    /// Distinct classes in order of first appearance
    pub fn class_levels(&self) -> Vec<String> {
        let Some(target) = self.target() else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        target
            .iter()
            .filter(|label| seen.insert(label.as_str()))
            .cloned()
            .collect()
    }

    /// Row count per class, in level order
    pub fn class_counts(&self) -> Vec<(String, usize)> {
        let target = self.target().unwrap_or(&[]);
        self.class_levels()
            .into_iter()
            .map(|level| {
                let count = target.iter().filter(|label| **label == level).count();
                (level, count)
            })
            .collect()
    }
}

/// Tasks registered by one caller, identifiers unique
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task, rejecting an identifier already present
    pub fn insert(&mut self, task: Task) -> AdapterResult<()> {
        if self.get(task.id().as_str()).is_some() {
            return Err(AdapterError::DuplicateTaskId(task.id().to_string()));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id().as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DEFAULT_LABEL_COLUMN;

    fn create_test_table() -> FeatureTable {
        FeatureTable::new(
            vec!["S1".into(), "S2".into(), "S3".into()],
            vec!["g1".into(), "g2".into()],
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            vec!["B".into(), "A".into(), "B".into()],
            DEFAULT_LABEL_COLUMN,
        )
        .unwrap()
    }

    #[test]
    fn test_classification_task() {
        let task = Task::classification(
            TaskId::new("brca").unwrap(),
            create_test_table(),
            DEFAULT_LABEL_COLUMN,
        )
        .unwrap();

        assert_eq!(task.kind(), TaskKind::Classification);
        assert_eq!(task.n_rows(), 3);
        assert_eq!(task.feature_names(), &["g1".to_string(), "g2".to_string()]);
        assert_eq!(task.target_name(), Some("Class"));
        assert_eq!(task.class_levels(), vec!["B", "A"]);
        assert_eq!(
            task.class_counts(),
            vec![("B".to_string(), 2), ("A".to_string(), 1)]
        );
    }

    #[test]
    fn test_missing_target_column() {
        let result = Task::classification(
            TaskId::new("brca").unwrap(),
            create_test_table(),
            "subtype",
        );
        assert_eq!(result, Err(AdapterError::ColumnNotFound("subtype".into())));

        let result = Task::classification(TaskId::new("brca").unwrap(), create_test_table(), "g1");
        assert_eq!(result, Err(AdapterError::NonCategoricalTarget("g1".into())));
    }

    #[test]
    fn test_clustering_task_hides_target() {
        let task = Task::clustering(TaskId::new("unsup").unwrap(), create_test_table());

        assert_eq!(task.target(), None);
        assert!(task.class_levels().is_empty());
        assert_eq!(task.feature_names().len(), 2);
    }

    #[test]
    fn test_task_ids() {
        assert_eq!(TaskId::new("  "), Err(AdapterError::InvalidTaskId));

        let mut tasks = TaskSet::new();
        tasks
            .insert(Task::clustering(TaskId::new("t1").unwrap(), create_test_table()))
            .unwrap();
        let result =
            tasks.insert(Task::clustering(TaskId::new("t1").unwrap(), create_test_table()));

        assert_eq!(result, Err(AdapterError::DuplicateTaskId("t1".into())));
        assert_eq!(tasks.len(), 1);
        assert!(tasks.get("t1").is_some());
    }
}
