//! Named registry of loaded datasets.

use crate::error::{AnalysisError, Result};
use crate::models::Dataset;
use std::collections::BTreeMap;
use tracing::debug;

/// In-process mapping from dataset name to dataset. Lives as long as the
/// server instance that owns it.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, Dataset>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dataset, replacing any dataset already held under `name`.
    /// Returns `true` when an existing dataset was replaced.
    pub fn put(&mut self, name: impl Into<String>, dataset: Dataset) -> bool {
        let name = name.into();
        let replaced = self.datasets.insert(name.clone(), dataset).is_some();
        if replaced {
            debug!("Replaced dataset '{}'", name);
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Result<&Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| AnalysisError::DatasetNotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Names of held datasets, sorted.
    pub fn names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Dataset)> {
        self.datasets.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnType, Value};

    fn one_column(v: f64) -> Dataset {
        Dataset::new(vec![Column::new(
            "x",
            ColumnType::Numeric,
            vec![Value::Number(v)],
        )])
        .unwrap()
    }

    #[test]
    fn test_put_get_exists() {
        let mut registry = DatasetRegistry::new();
        assert!(!registry.exists("a"));
        assert!(!registry.put("a", one_column(1.0)));
        assert!(registry.exists("a"));
        assert_eq!(registry.get("a").unwrap().row_count(), 1);
    }

    #[test]
    fn test_put_overwrites() {
        let mut registry = DatasetRegistry::new();
        registry.put("a", one_column(1.0));
        assert!(registry.put("a", one_column(2.0)));
        assert_eq!(registry.len(), 1);
        let x = registry.get("a").unwrap().column("x").unwrap();
        assert_eq!(x.values[0], Value::Number(2.0));
    }

    #[test]
    fn test_missing_dataset() {
        let registry = DatasetRegistry::new();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, AnalysisError::DatasetNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = DatasetRegistry::new();
        registry.put("zeta", one_column(1.0));
        registry.put("alpha", one_column(1.0));
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
