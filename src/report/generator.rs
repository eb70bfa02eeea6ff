//! Report generation.
//!
//! Turns analysis results into the text and JSON bodies returned by the
//! tools and resource views. Everything here is deterministic: the same
//! input always renders to the same string.

use crate::analysis::correlation::CorrelationAnalysis;
use crate::analysis::insights::Insights;
use crate::analysis::stats::{self, ColumnSummary};
use crate::analysis::{GroupAnalysis, QualityReport};
use crate::models::{format_number, number_to_json, Dataset, Value};
use crate::registry::DatasetRegistry;
use crate::report::table::TextTable;
use serde_json::{json, Map, Value as Json};

const BYTES_PER_KB: f64 = 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Pretty-print a JSON value with two-space indentation.
pub fn pretty(value: &Json) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Render a cell for a text table; missing values show as `NaN`.
fn cell(value: &Value) -> String {
    if value.is_null() {
        "NaN".to_string()
    } else {
        value.to_text()
    }
}

/// Confirmation text for a successful load.
pub fn load_summary(name: &str, dataset: &Dataset) -> String {
    let (rows, columns) = dataset.shape();
    let mut output = String::new();

    output.push_str(&format!("Dataset '{}' loaded successfully!\n", name));
    output.push_str(&format!("Shape: {} rows, {} columns\n", rows, columns));
    output.push_str(&format!("Columns: {}\n", dataset.column_names().join(", ")));
    output.push_str(&format!(
        "Memory usage: {:.2} KB",
        dataset.memory_usage() as f64 / BYTES_PER_KB
    ));

    output
}

fn per_column<F>(dataset: &Dataset, f: F) -> Map<String, Json>
where
    F: Fn(&crate::models::Column) -> Json,
{
    dataset
        .columns()
        .iter()
        .map(|c| (c.name.clone(), f(c)))
        .collect()
}

pub(crate) fn dtypes(dataset: &Dataset) -> Map<String, Json> {
    per_column(dataset, |c| json!(c.dtype.to_string()))
}

pub(crate) fn null_counts(dataset: &Dataset) -> Map<String, Json> {
    per_column(dataset, |c| json!(c.null_count()))
}

fn unique_counts(dataset: &Dataset) -> Map<String, Json> {
    per_column(dataset, |c| json!(c.distinct_count()))
}

fn memory_mb(dataset: &Dataset) -> Json {
    number_to_json(dataset.memory_usage() as f64 / BYTES_PER_MB)
}

/// Structural summary returned by `dataset_info`.
pub fn dataset_info(name: &str, dataset: &Dataset, sample_rows: usize) -> Json {
    let (rows, columns) = dataset.shape();
    json!({
        "name": name,
        "shape": {"rows": rows, "columns": columns},
        "columns": {
            "names": dataset.column_names(),
            "types": dtypes(dataset),
            "null_counts": null_counts(dataset),
            "unique_counts": unique_counts(dataset),
        },
        "memory_usage_mb": memory_mb(dataset),
        "sample_data": dataset.head_records(sample_rows),
    })
}

pub fn dataset_info_text(name: &str, dataset: &Dataset, sample_rows: usize) -> String {
    format!(
        "Dataset Information:\n{}",
        pretty(&dataset_info(name, dataset, sample_rows))
    )
}

/// Statistics table: one row per statistic, one column per summary.
pub fn statistics_table(summaries: &[ColumnSummary]) -> TextTable {
    let mut headers = vec![String::new()];
    headers.extend(summaries.iter().map(|s| s.name.clone()));
    let mut table = TextTable::new(headers);

    let labeled: Vec<Vec<(String, f64)>> = summaries.iter().map(|s| s.labeled()).collect();
    if let Some(first) = labeled.first() {
        for (row, (label, _)) in first.iter().enumerate() {
            let mut cells = vec![label.clone()];
            cells.extend(labeled.iter().map(|col| format_number(col[row].1)));
            table.add_row(cells);
        }
    }

    table
}

pub fn statistics_report(name: &str, summaries: &[ColumnSummary]) -> String {
    let mut output = format!("Descriptive Statistics for '{}':\n", name);
    if summaries.is_empty() {
        output.push_str("No numeric columns to describe.");
    } else {
        output.push_str(&statistics_table(summaries).render());
    }
    output
}

/// Summary statistics as `{column: {statistic: value}}`.
pub fn statistics_json(summaries: &[ColumnSummary]) -> Map<String, Json> {
    summaries
        .iter()
        .map(|s| {
            let stats: Map<String, Json> = s
                .labeled()
                .into_iter()
                .map(|(label, value)| (label, number_to_json(value)))
                .collect();
            (s.name.clone(), Json::Object(stats))
        })
        .collect()
}

pub fn correlation_report(name: &str, analysis: &CorrelationAnalysis) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Correlation Analysis ({}) for '{}':\n\n",
        analysis.method, name
    ));
    output.push_str(&format!(
        "High correlations (threshold: {}):\n",
        format_number(analysis.threshold)
    ));

    if analysis.pairs.is_empty() {
        output.push_str("No correlations found above the threshold.\n");
    } else {
        for pair in &analysis.pairs {
            output.push_str(&format!(
                "• {} <-> {}: {} ({})\n",
                pair.column1,
                pair.column2,
                format_number(round_to(pair.correlation, 3)),
                pair.strength
            ));
        }
    }

    output.push_str("\nFull correlation matrix:\n");
    if analysis.matrix.is_empty() {
        output.push_str("No numeric columns.\n");
    } else {
        let mut headers = vec![String::new()];
        headers.extend(analysis.matrix.names.iter().cloned());
        let mut table = TextTable::new(headers);
        for (name, row) in analysis.matrix.names.iter().zip(analysis.matrix.rows()) {
            let mut cells = vec![name.clone()];
            cells.extend(row.iter().map(|r| format_number(round_to(*r, 3))));
            table.add_row(cells);
        }
        output.push_str(&table.render());
    }

    output
}

pub fn group_report(name: &str, analysis: &GroupAnalysis) -> String {
    let mut output = format!(
        "Group Analysis for '{}' grouped by '{}':\n\n",
        name, analysis.group_by
    );

    let mut headers = vec![analysis.group_by.clone()];
    headers.extend(analysis.headers());
    let mut table = TextTable::new(headers);
    for row in &analysis.rows {
        let mut cells = vec![row.key.to_text()];
        cells.extend(row.values.iter().map(cell));
        table.add_row(cells);
    }

    if table.is_empty() {
        output.push_str("No groups found.");
    } else {
        output.push_str(&table.render());
    }
    output
}

pub fn quality_json(report: &QualityReport) -> Json {
    let null_counts: Map<String, Json> = report
        .columns
        .iter()
        .map(|c| (c.name.clone(), json!(c.null_count)))
        .collect();
    let percentages: Map<String, Json> = report
        .columns
        .iter()
        .map(|c| (c.name.clone(), number_to_json(c.null_percentage)))
        .collect();
    let data_types: Map<String, Json> = report
        .columns
        .iter()
        .map(|c| (c.name.clone(), json!(c.dtype.to_string())))
        .collect();
    let unique_values: Map<String, Json> = report
        .columns
        .iter()
        .map(|c| (c.name.clone(), json!(c.distinct_count)))
        .collect();

    json!({
        "dataset": report.dataset,
        "total_rows": report.total_rows,
        "total_columns": report.total_columns,
        "missing_data": {
            "columns_with_missing": report.columns_with_missing(),
            "null_counts": null_counts,
            "missing_percentages": percentages,
            "total_missing_values": report.total_missing_values,
        },
        "duplicates": {
            "duplicate_rows": report.duplicate_rows,
            "duplicate_percentage": number_to_json(report.duplicate_percentage),
        },
        "data_types": data_types,
        "unique_values": unique_values,
        "potential_issues": report.potential_issues,
    })
}

pub fn quality_text(report: &QualityReport) -> String {
    format!("Data Quality Report:\n{}", pretty(&quality_json(report)))
}

pub fn insights_report(insights: &Insights) -> String {
    let sections: Vec<String> = insights
        .sections
        .iter()
        .map(|section| {
            let mut block = format!("{}:\n", section.title);
            for line in &section.lines {
                block.push_str(&format!("• {}\n", line));
            }
            block
        })
        .collect();

    format!(
        "Data Insights for '{}':\n\n{}",
        insights.dataset,
        sections.join("\n").trim_end()
    )
}

pub fn filter_report(
    source: &str,
    new_name: &str,
    original: (usize, usize),
    filtered: (usize, usize),
    conditions: usize,
    skipped: &[String],
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Filtered dataset '{}' -> '{}'\n", source, new_name));
    output.push_str(&format!("Original shape: ({}, {})\n", original.0, original.1));
    output.push_str(&format!("Filtered shape: ({}, {})\n", filtered.0, filtered.1));
    output.push_str(&format!("Filters applied: {}", conditions));
    if !skipped.is_empty() {
        output.push_str(&format!(
            "\nSkipped conditions on unknown columns: {}",
            skipped.join(", ")
        ));
    }

    output
}

/// The `data://loaded_datasets` view.
pub fn loaded_datasets_json(registry: &DatasetRegistry) -> Json {
    let datasets: Map<String, Json> = registry
        .iter()
        .map(|(name, ds)| {
            let (rows, columns) = ds.shape();
            (
                name.clone(),
                json!({
                    "shape": [rows, columns],
                    "columns": ds.column_names(),
                    "dtypes": dtypes(ds),
                    "memory_usage_mb": memory_mb(ds),
                }),
            )
        })
        .collect();
    Json::Object(datasets)
}

/// The `data://dataset/{name}` view.
pub fn dataset_view_json(name: &str, dataset: &Dataset, sample_rows: usize) -> Json {
    let (rows, columns) = dataset.shape();
    json!({
        "name": name,
        "shape": [rows, columns],
        "columns": dataset.column_names(),
        "dtypes": dtypes(dataset),
        "sample_data": dataset.head_records(sample_rows),
        "summary_statistics": statistics_json(&stats::describe(dataset)),
        "missing_data": null_counts(dataset),
        "unique_counts": unique_counts(dataset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::correlation::{find_correlations, CorrelationMethod};
    use crate::analysis::insights::{generate_insights, InsightFocus};
    use crate::analysis::{calculate_statistics, data_quality_check, group_analysis};
    use crate::loader::{parse_csv, LoadOptions};

    fn employees() -> Dataset {
        parse_csv(
            include_str!("../../fixtures/employees.csv"),
            &LoadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_load_summary() {
        let text = load_summary("emp", &employees());
        assert!(text.starts_with("Dataset 'emp' loaded successfully!"));
        assert!(text.contains("Shape: 4 rows, 4 columns"));
        assert!(text.contains("Columns: name, age, salary, department"));
        assert!(text.contains(" KB"));
    }

    #[test]
    fn test_dataset_info_layout() {
        let info = dataset_info("emp", &employees(), 5);
        assert_eq!(info["shape"]["rows"], 4);
        assert_eq!(info["shape"]["columns"], 4);
        assert_eq!(info["columns"]["types"]["age"], "numeric");
        assert_eq!(info["columns"]["unique_counts"]["department"], 3);
        assert_eq!(info["sample_data"].as_array().unwrap().len(), 4);
        assert_eq!(info["sample_data"][0]["name"], "Alice");
        assert_eq!(info["sample_data"][0]["salary"], 50000);
    }

    #[test]
    fn test_statistics_report_rows() {
        let ds = employees();
        let summaries = calculate_statistics(&ds, "emp", None, false).unwrap();
        let text = statistics_report("emp", &summaries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Descriptive Statistics for 'emp':");
        assert!(lines[1].contains("age") && lines[1].contains("salary"));
        assert!(lines[2].starts_with("count"));
        assert!(lines.last().unwrap().starts_with("max"));
        assert!(text.contains("58750"));
    }

    #[test]
    fn test_correlation_report_format() {
        let ds = employees();
        let analysis = find_correlations(&ds, CorrelationMethod::Pearson, 0.5, 0.7);
        let text = correlation_report("emp", &analysis);
        assert!(text.starts_with("Correlation Analysis (pearson) for 'emp':"));
        assert!(text.contains("• age <-> salary: "));
        assert!(text.contains("(Strong)"));
        assert!(text.contains("Full correlation matrix:"));
    }

    #[test]
    fn test_group_report_table() {
        let ds = employees();
        let cols = vec!["salary".to_string()];
        let ops = vec!["mean".to_string()];
        let analysis = group_analysis(&ds, "emp", "department", Some(&cols), &ops).unwrap();
        let text = group_report("emp", &analysis);
        assert!(text.contains("department  salary_mean"));
        assert!(text.contains("IT"));
        assert!(text.contains("60000"));
    }

    #[test]
    fn test_quality_json_keys() {
        let report = data_quality_check(&employees(), "emp");
        let value = quality_json(&report);
        for key in [
            "dataset",
            "total_rows",
            "total_columns",
            "missing_data",
            "duplicates",
            "data_types",
            "unique_values",
            "potential_issues",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["missing_data"]["total_missing_values"], 0);
        assert_eq!(value["duplicates"]["duplicate_rows"], 0);
    }

    #[test]
    fn test_insights_report_sections() {
        let insights = generate_insights(&employees(), "emp", InsightFocus::All, 1.5);
        let text = insights_report(&insights);
        assert!(text.starts_with("Data Insights for 'emp':"));
        assert!(text.contains("Dataset Overview:\n• Contains 4 records with 4 features"));
        assert!(text.contains("Outlier Detection:\n• No potential outliers detected"));
    }

    #[test]
    fn test_filter_report() {
        let text = filter_report("emp", "older", (4, 4), (2, 4), 1, &[]);
        assert_eq!(
            text,
            "Filtered dataset 'emp' -> 'older'\nOriginal shape: (4, 4)\nFiltered shape: (2, 4)\nFilters applied: 1"
        );
    }

    #[test]
    fn test_dataset_view() {
        let view = dataset_view_json("emp", &employees(), 10);
        assert_eq!(view["shape"], json!([4, 4]));
        assert_eq!(view["summary_statistics"]["salary"]["mean"], 58750);
        assert_eq!(view["missing_data"]["age"], 0);
        assert!(view["summary_statistics"].get("name").is_none());
    }

    #[test]
    fn test_loaded_datasets_view() {
        let mut registry = DatasetRegistry::new();
        registry.put("emp", employees());
        let view = loaded_datasets_json(&registry);
        assert_eq!(view["emp"]["columns"][0], "name");
        assert_eq!(view["emp"]["dtypes"]["department"], "text");
    }
}
