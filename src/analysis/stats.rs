//! Descriptive statistics over numeric columns.

use crate::error::{AnalysisError, Result};
use crate::models::{Column, Dataset};

/// Percentiles reported for every column.
pub const BASE_PERCENTILES: [f64; 3] = [0.25, 0.5, 0.75];

/// Extra percentiles reported when requested.
pub const EXTENDED_PERCENTILES: [f64; 2] = [0.9, 0.95];

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator); NaN with fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Copy and sort values ascending.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Percentile `p` (0..=1) of ascending `sorted` values, linearly
/// interpolated between the two nearest order statistics.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

pub fn median(values: &[f64]) -> f64 {
    percentile(&sorted(values), 0.5)
}

/// Label such as `25%` for a percentile fraction.
pub fn percentile_label(p: f64) -> String {
    format!("{}%", (p * 100.0).round() as i64)
}

/// Summary statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// `(fraction, value)` pairs in ascending fraction order.
    pub percentiles: Vec<(f64, f64)>,
}

impl ColumnSummary {
    pub fn from_column(column: &Column, include_extended: bool) -> Self {
        let values = column.numbers();
        let ordered = sorted(&values);

        let mut fractions: Vec<f64> = BASE_PERCENTILES.to_vec();
        if include_extended {
            fractions.extend_from_slice(&EXTENDED_PERCENTILES);
        }

        Self {
            name: column.name.clone(),
            count: values.len(),
            mean: mean(&values),
            std: std_dev(&values),
            min: ordered.first().copied().unwrap_or(f64::NAN),
            max: ordered.last().copied().unwrap_or(f64::NAN),
            percentiles: fractions
                .into_iter()
                .map(|p| (p, percentile(&ordered, p)))
                .collect(),
        }
    }

    /// Labeled statistics in display order:
    /// count, mean, std, min, percentiles..., max.
    pub fn labeled(&self) -> Vec<(String, f64)> {
        let mut rows = vec![
            ("count".to_string(), self.count as f64),
            ("mean".to_string(), self.mean),
            ("std".to_string(), self.std),
            ("min".to_string(), self.min),
        ];
        rows.extend(
            self.percentiles
                .iter()
                .map(|(p, v)| (percentile_label(*p), *v)),
        );
        rows.push(("max".to_string(), self.max));
        rows
    }

    #[cfg(test)]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(q, _)| (q - p).abs() < 1e-9)
            .map(|(_, v)| *v)
    }
}

/// Describe the requested columns, or every numeric column when `columns`
/// is `None`. Non-numeric columns are skipped; unknown names are an error.
pub fn calculate_statistics(
    dataset: &Dataset,
    dataset_name: &str,
    columns: Option<&[String]>,
    include_percentiles: bool,
) -> Result<Vec<ColumnSummary>> {
    let selected: Vec<&Column> = match columns {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|n| {
                dataset
                    .column(n)
                    .ok_or_else(|| AnalysisError::column_not_found(dataset_name, n))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|c| c.is_numeric())
            .collect(),
        _ => dataset.numeric_columns().collect(),
    };

    Ok(selected
        .into_iter()
        .map(|c| ColumnSummary::from_column(c, include_percentiles))
        .collect())
}

/// Summaries used in exports and resource views: every numeric column with
/// the base percentiles.
pub fn describe(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .numeric_columns()
        .map(|c| ColumnSummary::from_column(c, false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_csv, LoadOptions};

    fn employees() -> Dataset {
        parse_csv(
            include_str!("../../fixtures/employees.csv"),
            &LoadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 1.0), 4.0);
        assert!((percentile(&v, 0.25) - 1.75).abs() < 1e-12);
        assert!((percentile(&v, 0.5) - 2.5).abs() < 1e-12);
        assert!((percentile(&v, 0.75) - 3.25).abs() < 1e-12);
        assert!(percentile(&[], 0.5).is_nan());
        assert_eq!(percentile(&[7.0], 0.9), 7.0);
    }

    #[test]
    fn test_mean_and_sample_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        // sample std of this classic set is sqrt(32 / 7)
        assert!((std_dev(&v) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(std_dev(&[1.0]).is_nan());
    }

    #[test]
    fn test_statistics_default_numeric_columns() {
        let ds = employees();
        let summaries = calculate_statistics(&ds, "emp", None, true).unwrap();
        let names: Vec<_> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["age", "salary"]);

        let salary = &summaries[1];
        assert_eq!(salary.count, 4);
        assert_eq!(salary.mean, 58750.0);
        assert_eq!(salary.min, 50000.0);
        assert_eq!(salary.max, 70000.0);
        assert_eq!(salary.percentile(0.5), Some(57500.0));
        assert!(salary.percentile(0.95).is_some());
        assert_eq!(salary.labeled().len(), 10);
    }

    #[test]
    fn test_statistics_without_extended_percentiles() {
        let ds = employees();
        let summaries = calculate_statistics(&ds, "emp", None, false).unwrap();
        assert_eq!(summaries[0].percentiles.len(), 3);
        assert_eq!(summaries[0].percentile(0.9), None);
        let labels: Vec<_> = summaries[0].labeled().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        );
    }

    #[test]
    fn test_statistics_skips_text_columns_silently() {
        let ds = employees();
        let cols = vec!["name".to_string(), "age".to_string()];
        let summaries = calculate_statistics(&ds, "emp", Some(&cols), true).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "age");
    }

    #[test]
    fn test_statistics_unknown_column() {
        let ds = employees();
        let cols = vec!["bonus".to_string()];
        let err = calculate_statistics(&ds, "emp", Some(&cols), true).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound { .. }));
    }
}
