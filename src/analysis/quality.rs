//! Data quality assessment: missing values, duplicate rows, and
//! per-column heuristics.

use crate::models::{ColumnType, Dataset, ValueKey};
use std::collections::HashSet;

/// Null percentage above which a column is flagged.
pub const MISSING_ISSUE_PERCENT: f64 = 50.0;

/// Quality metrics for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnQuality {
    pub name: String,
    pub dtype: ColumnType,
    pub null_count: usize,
    pub null_percentage: f64,
    pub distinct_count: usize,
}

/// Result of a quality check.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub dataset: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<ColumnQuality>,
    pub total_missing_values: usize,
    pub duplicate_rows: usize,
    pub duplicate_percentage: f64,
    pub potential_issues: Vec<String>,
}

impl QualityReport {
    pub fn columns_with_missing(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.null_count > 0)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Count rows identical, across all columns, to an earlier row.
pub fn count_duplicate_rows(dataset: &Dataset) -> usize {
    let mut seen: HashSet<Vec<ValueKey<'_>>> = HashSet::with_capacity(dataset.row_count());
    (0..dataset.row_count())
        .filter(|&i| {
            let key: Vec<ValueKey<'_>> = dataset.row(i).into_iter().map(|v| v.key()).collect();
            !seen.insert(key)
        })
        .count()
}

/// Assess `dataset`. Issues are reported per column, in column order.
pub fn data_quality_check(dataset: &Dataset, dataset_name: &str) -> QualityReport {
    let rows = dataset.row_count();

    let columns: Vec<ColumnQuality> = dataset
        .columns()
        .iter()
        .map(|c| {
            let null_count = c.null_count();
            ColumnQuality {
                name: c.name.clone(),
                dtype: c.dtype,
                null_count,
                null_percentage: round2(percent(null_count, rows)),
                distinct_count: c.distinct_count(),
            }
        })
        .collect();

    let mut potential_issues = Vec::new();
    for column in &columns {
        let missing = percent(column.null_count, rows);
        if missing > MISSING_ISSUE_PERCENT {
            potential_issues.push(format!(
                "Column '{}' has {:.1}% missing values",
                column.name, missing
            ));
        }
        if column.distinct_count == 1 {
            potential_issues.push(format!("Column '{}' has only one unique value", column.name));
        }
        if rows > 0 && column.distinct_count == rows {
            potential_issues.push(format!(
                "Column '{}' has all unique values (potential identifier)",
                column.name
            ));
        }
    }

    let duplicate_rows = count_duplicate_rows(dataset);

    QualityReport {
        dataset: dataset_name.to_string(),
        total_rows: rows,
        total_columns: dataset.column_count(),
        total_missing_values: columns.iter().map(|c| c.null_count).sum(),
        columns,
        duplicate_rows,
        duplicate_percentage: round2(percent(duplicate_rows, rows)),
        potential_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_csv, LoadOptions};

    fn parse(csv: &str) -> Dataset {
        parse_csv(csv, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_missing_totals_match_column_sums() {
        let ds = parse("a,b,c\n1,,x\n,,y\n3,4,\n");
        let report = data_quality_check(&ds, "t");
        let sum: usize = report.columns.iter().map(|c| c.null_count).sum();
        assert_eq!(report.total_missing_values, sum);
        assert_eq!(report.total_missing_values, 4);
        assert_eq!(report.columns_with_missing(), vec!["a", "b", "c"]);
        assert_eq!(report.columns[1].null_percentage, 66.67);
    }

    #[test]
    fn test_duplicate_rows_count_later_copies() {
        let ds = parse("a,b\n1,x\n2,y\n1,x\n1,x\n2,z\n");
        let report = data_quality_check(&ds, "t");
        assert_eq!(report.duplicate_rows, 2);
        assert_eq!(report.duplicate_percentage, 40.0);
    }

    #[test]
    fn test_duplicates_treat_missing_as_equal() {
        let ds = parse("a,b\n1,\n1,\n");
        assert_eq!(count_duplicate_rows(&ds), 1);
    }

    #[test]
    fn test_potential_issues() {
        let ds = parse("id,constant,sparse\n1,k,\n2,k,\n3,k,5\n");
        let report = data_quality_check(&ds, "t");
        let issues = report.potential_issues.join("\n");
        assert!(issues.contains("'id' has all unique values"));
        assert!(issues.contains("'constant' has only one unique value"));
        assert!(issues.contains("'sparse' has 66.7% missing values"));
        // sparse has a single distinct value too
        assert!(issues.contains("'sparse' has only one unique value"));
    }

    #[test]
    fn test_empty_dataset_has_zero_percentages() {
        let ds = parse("a,b\n");
        let report = data_quality_check(&ds, "t");
        assert_eq!(report.total_rows, 0);
        assert_eq!(report.duplicate_percentage, 0.0);
        assert!(report.potential_issues.is_empty());
    }
}
