//! Dataset export to CSV, a JSON analysis report, or a standalone HTML page.
//!
//! Files are written through a temporary file in the destination directory
//! and renamed into place, so a failed export never leaves a partial file.

use crate::analysis::stats;
use crate::config::ExportConfig;
use crate::error::{AnalysisError, Result};
use crate::models::{format_number, Dataset};
use crate::report::generator::{dtypes, null_counts, pretty, statistics_json};
use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Sample rows embedded in the JSON report.
const JSON_SAMPLE_ROWS: usize = 5;

/// Sample rows embedded in the HTML report.
const HTML_SAMPLE_ROWS: usize = 10;

/// Output format for `export_analysis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Html,
}

impl FromStr for ExportFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "html" => Ok(ExportFormat::Html),
            other => Err(AnalysisError::UnsupportedFormat(format!(
                "export format '{}' (supported: json, csv, html)",
                other
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Html => write!(f, "html"),
        }
    }
}

/// Render the dataset as CSV with a header row. Missing values are empty.
pub fn render_csv(dataset: &Dataset) -> std::result::Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(dataset.column_names())
        .map_err(|e| e.to_string())?;
    for row in 0..dataset.row_count() {
        let record: Vec<String> = dataset
            .row(row)
            .into_iter()
            .map(|v| v.to_raw_text())
            .collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Render the JSON analysis report.
pub fn render_json(name: &str, dataset: &Dataset) -> String {
    let (rows, columns) = dataset.shape();
    let report = json!({
        "dataset_name": name,
        "shape": [rows, columns],
        "columns": dataset.column_names(),
        "dtypes": dtypes(dataset),
        "statistics": statistics_json(&stats::describe(dataset)),
        "missing_data": null_counts(dataset),
        "sample_data": dataset.head_records(JSON_SAMPLE_ROWS),
        "export_timestamp": Utc::now().to_rfc3339(),
    });
    pretty(&report)
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn html_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut table = String::new();

    table.push_str("<table border=\"1\">\n<thead><tr>");
    for header in headers {
        table.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    table.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        table.push_str("<tr>");
        for cell in row {
            table.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</tbody>\n</table>\n");

    table
}

/// Render a standalone HTML page with a sample table and statistics.
pub fn render_html(name: &str, dataset: &Dataset) -> String {
    let (rows, columns) = dataset.shape();
    let title = escape_html(name);
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html>\n");
    page.push_str(&format!(
        "<head><meta charset=\"utf-8\"><title>Data Analysis Report - {}</title></head>\n",
        title
    ));
    page.push_str("<body>\n");
    page.push_str(&format!("<h1>Data Analysis Report: {}</h1>\n", title));
    page.push_str("<h2>Dataset Overview</h2>\n");
    page.push_str(&format!("<p>Shape: {} rows, {} columns</p>\n", rows, columns));

    page.push_str("<h2>Sample Data</h2>\n");
    let sample: Vec<Vec<String>> = (0..rows.min(HTML_SAMPLE_ROWS))
        .map(|i| dataset.row(i).into_iter().map(|v| v.to_text()).collect())
        .collect();
    page.push_str(&html_table(&dataset.column_names(), &sample));

    page.push_str("<h2>Statistics</h2>\n");
    let summaries = stats::describe(dataset);
    if summaries.is_empty() {
        page.push_str("<p>No numeric columns for statistics</p>\n");
    } else {
        let mut headers = vec![String::new()];
        headers.extend(summaries.iter().map(|s| s.name.clone()));
        let labeled: Vec<Vec<(String, f64)>> = summaries.iter().map(|s| s.labeled()).collect();
        let body: Vec<Vec<String>> = labeled[0]
            .iter()
            .enumerate()
            .map(|(row, (label, _))| {
                std::iter::once(label.clone())
                    .chain(labeled.iter().map(|col| format_number(col[row].1)))
                    .collect()
            })
            .collect();
        page.push_str(&html_table(&headers, &body));
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// Write `content` to `path` atomically.
fn write_atomic(path: &Path, content: &str, config: &ExportConfig) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !parent.exists() {
        if config.create_parent_dirs {
            debug!("Creating export directory {}", parent.display());
            fs::create_dir_all(&parent).map_err(|e| AnalysisError::io(&parent, e))?;
        } else {
            return Err(AnalysisError::io(&parent, "directory does not exist"));
        }
    }

    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| AnalysisError::io(&parent, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| AnalysisError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| AnalysisError::io(path, e.error))?;

    Ok(())
}

/// Export `dataset` under `name` to `path` in `format`.
pub fn export_dataset(
    name: &str,
    dataset: &Dataset,
    format: ExportFormat,
    path: &Path,
    config: &ExportConfig,
) -> Result<()> {
    let content = match format {
        ExportFormat::Csv => render_csv(dataset).map_err(|e| AnalysisError::io(path, e))?,
        ExportFormat::Json => render_json(name, dataset),
        ExportFormat::Html => render_html(name, dataset),
    };

    write_atomic(path, &content, config)?;
    info!("Exported '{}' to {} ({})", name, path.display(), format);
    Ok(())
}
