//! Append-only analysis history.

use crate::models::HistoryRecord;

/// Ordered log of executed history-producing operations, oldest first.
/// Records are never edited or removed.
#[derive(Debug, Default)]
pub struct AnalysisHistory {
    records: Vec<HistoryRecord>,
}

impl AnalysisHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    pub fn all(&self) -> &[HistoryRecord] {
        &self.records
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;
    use serde_json::Map;

    #[test]
    fn test_append_keeps_creation_order() {
        let mut history = AnalysisHistory::new();
        history.append(HistoryRecord::new(
            ActionKind::LoadDataset,
            vec!["a".into()],
            Map::new(),
        ));
        history.append(HistoryRecord::new(
            ActionKind::GenerateInsights,
            vec!["a".into()],
            Map::new(),
        ));

        assert_eq!(history.len(), 2);
        assert_eq!(history.all()[0].action, ActionKind::LoadDataset);
        assert_eq!(history.all()[1].action, ActionKind::GenerateInsights);
    }

    #[test]
    fn test_records_serialize_as_array() {
        let mut history = AnalysisHistory::new();
        assert_eq!(serde_json::to_string(history.all()).unwrap(), "[]");
        history.append(HistoryRecord::new(
            ActionKind::FilterData,
            vec!["a".into(), "b".into()],
            Map::new(),
        ));
        let parsed = serde_json::to_value(history.all()).unwrap();
        assert_eq!(parsed[0]["action"], "filter_data");
        assert_eq!(parsed[0]["datasets"], serde_json::json!(["a", "b"]));
    }
}
