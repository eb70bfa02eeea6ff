//! Heuristic insights: overview, IQR outliers, uniqueness patterns and
//! recommendations.

use crate::analysis::stats::{percentile, sorted};
use crate::error::{AnalysisError, Result};
use crate::loader::parse_number;
use crate::models::{ColumnType, Dataset, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Unique-value ratio above which a column looks like an identifier.
pub const IDENTIFIER_RATIO: f64 = 0.95;

/// Unique-value ratio below which a column has little variability.
pub const LOW_VARIABILITY_RATIO: f64 = 0.05;

/// Which insight sections to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightFocus {
    #[default]
    Overview,
    Outliers,
    Patterns,
    Recommendations,
    All,
}

impl FromStr for InsightFocus {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "overview" => Ok(InsightFocus::Overview),
            "outliers" => Ok(InsightFocus::Outliers),
            "patterns" => Ok(InsightFocus::Patterns),
            "recommendations" => Ok(InsightFocus::Recommendations),
            "all" => Ok(InsightFocus::All),
            other => Err(AnalysisError::UnsupportedOperation(format!(
                "insight focus '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for InsightFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InsightFocus::Overview => "overview",
            InsightFocus::Outliers => "outliers",
            InsightFocus::Patterns => "patterns",
            InsightFocus::Recommendations => "recommendations",
            InsightFocus::All => "all",
        };
        write!(f, "{}", name)
    }
}

impl InsightFocus {
    fn includes(&self, section: InsightFocus) -> bool {
        *self == InsightFocus::All || *self == section
    }
}

/// One titled block of insight lines.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightSection {
    pub title: &'static str,
    pub lines: Vec<String>,
}

/// Result of an insight request.
#[derive(Debug, Clone)]
pub struct Insights {
    pub dataset: String,
    pub focus: InsightFocus,
    pub sections: Vec<InsightSection>,
    /// Columns with at least one IQR outlier, when outliers were examined.
    pub outliers: Vec<(String, usize)>,
}

/// Count values outside `[Q1 - k*IQR, Q3 + k*IQR]` for every numeric
/// column; only columns with at least one outlier are returned.
pub fn detect_outliers(dataset: &Dataset, multiplier: f64) -> Vec<(String, usize)> {
    dataset
        .numeric_columns()
        .filter_map(|column| {
            let values = column.numbers();
            let ordered = sorted(&values);
            let q1 = percentile(&ordered, 0.25);
            let q3 = percentile(&ordered, 0.75);
            let iqr = q3 - q1;
            let (low, high) = (q1 - multiplier * iqr, q3 + multiplier * iqr);
            let count = values.iter().filter(|&&v| v < low || v > high).count();
            (count > 0).then(|| (column.name.clone(), count))
        })
        .collect()
}

fn overview(dataset: &Dataset) -> InsightSection {
    let mut by_type: BTreeMap<ColumnType, usize> = BTreeMap::new();
    for column in dataset.columns() {
        *by_type.entry(column.dtype).or_default() += 1;
    }
    let types = by_type
        .iter()
        .map(|(t, n)| format!("{}: {}", t, n))
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        format!(
            "Contains {} records with {} features",
            dataset.row_count(),
            dataset.column_count()
        ),
        format!("Column types: {}", if types.is_empty() { "none" } else { &types }),
    ];
    let numeric = dataset.numeric_columns().count();
    if numeric > 0 {
        lines.push(format!("{} numeric columns for analysis", numeric));
    }

    InsightSection {
        title: "Dataset Overview",
        lines,
    }
}

fn outlier_section(outliers: &[(String, usize)]) -> InsightSection {
    let lines = if outliers.is_empty() {
        vec!["No potential outliers detected".to_string()]
    } else {
        outliers
            .iter()
            .map(|(name, n)| format!("{}: {} potential outliers detected", name, n))
            .collect()
    };
    InsightSection {
        title: "Outlier Detection",
        lines,
    }
}

fn patterns(dataset: &Dataset) -> InsightSection {
    let rows = dataset.row_count();
    let mut lines = Vec::new();

    if rows > 0 {
        for column in dataset.columns() {
            let ratio = column.distinct_count() as f64 / rows as f64;
            if ratio > IDENTIFIER_RATIO {
                lines.push(format!(
                    "{}: High uniqueness ({:.2}%) - likely identifier",
                    column.name,
                    ratio * 100.0
                ));
            } else if ratio < LOW_VARIABILITY_RATIO {
                lines.push(format!(
                    "{}: Low uniqueness ({:.2}%) - low variability",
                    column.name,
                    ratio * 100.0
                ));
            }
        }
    }

    if lines.is_empty() {
        lines.push("No notable uniqueness patterns".to_string());
    }
    InsightSection {
        title: "Pattern Analysis",
        lines,
    }
}

/// A text column whose present values all parse as numbers.
fn numeric_convertible(values: &[Value]) -> bool {
    let mut present = values.iter().filter(|v| !v.is_null()).peekable();
    present.peek().is_some()
        && present.all(|v| matches!(v, Value::Text(s) if parse_number(s).is_some()))
}

fn recommendations(dataset: &Dataset) -> InsightSection {
    let mut lines = Vec::new();

    let missing: Vec<&str> = dataset
        .columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| c.name.as_str())
        .collect();
    if !missing.is_empty() {
        lines.push(format!("Address missing data in: {}", missing.join(", ")));
    }

    if dataset.numeric_columns().count() > 1 {
        lines.push("Perform correlation analysis to identify relationships".to_string());
        lines.push("Consider feature selection for highly correlated variables".to_string());
    }

    for column in dataset.columns() {
        if column.dtype == ColumnType::Text && numeric_convertible(&column.values) {
            lines.push(format!("Consider converting '{}' to numeric type", column.name));
        }
    }

    if lines.is_empty() {
        lines.push("No specific recommendations, the dataset looks ready for analysis".to_string());
    }
    InsightSection {
        title: "Recommendations",
        lines,
    }
}

/// Produce the sections selected by `focus`, in a fixed order.
pub fn generate_insights(
    dataset: &Dataset,
    dataset_name: &str,
    focus: InsightFocus,
    iqr_multiplier: f64,
) -> Insights {
    let mut sections = Vec::new();
    let mut outliers = Vec::new();

    if focus.includes(InsightFocus::Overview) {
        sections.push(overview(dataset));
    }
    if focus.includes(InsightFocus::Outliers) {
        outliers = detect_outliers(dataset, iqr_multiplier);
        sections.push(outlier_section(&outliers));
    }
    if focus.includes(InsightFocus::Patterns) {
        sections.push(patterns(dataset));
    }
    if focus.includes(InsightFocus::Recommendations) {
        sections.push(recommendations(dataset));
    }

    Insights {
        dataset: dataset_name.to_string(),
        focus,
        sections,
        outliers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_csv, parse_json, LoadOptions};

    fn parse(csv: &str) -> Dataset {
        parse_csv(csv, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_overview_counts() {
        let ds = parse(include_str!("../../fixtures/employees.csv"));
        let insights = generate_insights(&ds, "emp", InsightFocus::Overview, 1.5);
        assert_eq!(insights.sections.len(), 1);
        let lines = &insights.sections[0].lines;
        assert_eq!(lines[0], "Contains 4 records with 4 features");
        assert_eq!(lines[1], "Column types: numeric: 2, text: 2");
        assert_eq!(lines[2], "2 numeric columns for analysis");
    }

    #[test]
    fn test_no_outliers_within_fences() {
        let ds = parse("v\n1\n2\n3\n4\n5\n6\n");
        assert!(detect_outliers(&ds, 1.5).is_empty());
        let insights = generate_insights(&ds, "t", InsightFocus::Outliers, 1.5);
        assert!(insights.outliers.is_empty());
        assert_eq!(insights.sections[0].lines, vec!["No potential outliers detected"]);
    }

    #[test]
    fn test_iqr_outliers_flagged() {
        let ds = parse("v,w\n1,1\n2,2\n3,3\n4,4\n100,5\n-50,6\n");
        let outliers = detect_outliers(&ds, 1.5);
        assert_eq!(outliers, vec![("v".to_string(), 2)]);
    }

    #[test]
    fn test_patterns() {
        let mut csv = String::from("id,flag\n");
        for i in 0..40 {
            csv.push_str(&format!("{},same\n", i));
        }
        let ds = parse(&csv);
        let insights = generate_insights(&ds, "t", InsightFocus::Patterns, 1.5);
        let lines = &insights.sections[0].lines;
        assert!(lines[0].starts_with("id: High uniqueness (100.00%)"));
        assert!(lines[1].starts_with("flag: Low uniqueness (2.50%)"));
    }

    #[test]
    fn test_recommendations() {
        let ds = parse_json(
            r#"[{"code": "1", "a": 1, "b": 2, "note": null},
                {"code": "2", "a": 2, "b": null, "note": "x"}]"#,
        )
        .unwrap();
        let insights = generate_insights(&ds, "t", InsightFocus::Recommendations, 1.5);
        let lines = &insights.sections[0].lines;
        assert_eq!(lines[0], "Address missing data in: b, note");
        assert!(lines.iter().any(|l| l.contains("correlation analysis")));
        assert!(lines.contains(&"Consider converting 'code' to numeric type".to_string()));
        assert!(!lines.iter().any(|l| l.contains("'note'")));
    }

    #[test]
    fn test_all_focus_produces_every_section() {
        let ds = parse(include_str!("../../fixtures/employees.csv"));
        let insights = generate_insights(&ds, "emp", InsightFocus::All, 1.5);
        let titles: Vec<_> = insights.sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "Dataset Overview",
                "Outlier Detection",
                "Pattern Analysis",
                "Recommendations"
            ]
        );
    }
}
