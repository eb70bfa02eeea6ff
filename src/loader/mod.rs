//! Dataset loading from delimited and record-oriented files.
//!
//! The file format is picked from the extension (`.csv` or `.json`).
//! Column types are inferred from content in the order
//! numeric → boolean → datetime → text.

use crate::error::{AnalysisError, Result};
use crate::models::{Column, ColumnType, Dataset, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Configuration for dataset loading.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter for CSV files.
    pub delimiter: u8,
    /// Cell contents treated as missing values.
    pub null_markers: Vec<String>,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from(&crate::config::LoaderConfig::default())
    }
}

impl From<&crate::config::LoaderConfig> for LoadOptions {
    fn from(config: &crate::config::LoaderConfig) -> Self {
        Self {
            delimiter: config.delimiter.as_bytes().first().copied().unwrap_or(b','),
            null_markers: config.null_markers.clone(),
            max_file_size: config.max_file_size,
        }
    }
}

impl LoadOptions {
    /// Override the delimiter with a user-supplied one. Only single-byte
    /// delimiters are accepted.
    pub fn with_delimiter(mut self, delimiter: &str) -> Result<Self> {
        match delimiter.as_bytes() {
            [b] => {
                self.delimiter = *b;
                Ok(self)
            }
            _ => Err(AnalysisError::validation(
                "delimiter",
                format!("expected a single character, got '{}'", delimiter),
            )),
        }
    }

    fn is_null(&self, raw: &str) -> bool {
        self.null_markers.iter().any(|m| m == raw)
    }
}

/// Supported source file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with a header row.
    Csv,
    /// A JSON array of records.
    Json,
}

impl SourceFormat {
    /// Detect the format from the file extension.
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("json") => Ok(SourceFormat::Json),
            Some(other) => Err(AnalysisError::UnsupportedFormat(format!(
                "'.{}' files are not supported, use CSV or JSON",
                other
            ))),
            None => Err(AnalysisError::UnsupportedFormat(format!(
                "'{}' has no extension, use a .csv or .json file",
                path.display()
            ))),
        }
    }
}

/// Load a dataset from disk.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let format = SourceFormat::detect(path)?;

    if !path.is_file() {
        return Err(AnalysisError::io(path, "file not found"));
    }

    let metadata = fs::metadata(path).map_err(|e| AnalysisError::io(path, e))?;
    if metadata.len() > options.max_file_size {
        return Err(AnalysisError::io(
            path,
            format!(
                "file is {} bytes, limit is {} bytes",
                metadata.len(),
                options.max_file_size
            ),
        ));
    }

    let content = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
    debug!("Read {} bytes from {}", content.len(), path.display());

    let dataset = match format {
        SourceFormat::Csv => parse_csv(&content, options),
        SourceFormat::Json => parse_json(&content),
    }
    .map_err(|message| AnalysisError::io(path, message))?;

    info!(
        "Parsed {} ({} rows, {} columns)",
        path.display(),
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(dataset)
}

/// Parse delimited text with a header row.
pub fn parse_csv(content: &str, options: &LoadOptions) -> std::result::Result<Dataset, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("failed to read header: {}", e))?
        .iter()
        .map(String::from)
        .collect();

    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err("no columns found".to_string());
    }

    let headers = dedupe_names(headers);
    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record.map_err(|e| match e.position() {
            Some(pos) => format!("line {}: {}", pos.line(), e),
            None => e.to_string(),
        })?;
        for (idx, field) in record.iter().enumerate() {
            let cell = if options.is_null(field) {
                None
            } else {
                Some(field.to_string())
            };
            raw[idx].push(cell);
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| infer_column(name, cells))
        .collect();

    Dataset::new(columns)
}

/// Parse a JSON array of records. Columns follow first-encountered key order.
pub fn parse_json(content: &str) -> std::result::Result<Dataset, String> {
    let root: Json = serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;

    let records = match root {
        Json::Array(items) => items,
        _ => return Err("expected a top-level array of records".to_string()),
    };

    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (row, record) in records.iter().enumerate() {
        let Json::Object(map) = record else {
            return Err(format!("record {} is not an object", row));
        };
        for key in map.keys() {
            if !index.contains_key(key) {
                index.insert(key.clone(), names.len());
                names.push(key.clone());
            }
        }
    }

    let mut cells: Vec<Vec<&Json>> = vec![Vec::with_capacity(records.len()); names.len()];
    for record in &records {
        if let Json::Object(map) = record {
            for (idx, name) in names.iter().enumerate() {
                cells[idx].push(map.get(name).unwrap_or(&Json::Null));
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, values)| infer_json_column(name, &values))
        .collect();

    Dataset::new(columns)
}

/// Make header names unique by suffixing repeats with `.1`, `.2`, ...
fn dedupe_names(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for name in headers {
        let count = seen.entry(name.clone()).or_insert(0);
        if *count == 0 {
            out.push(name.clone());
        } else {
            out.push(format!("{}.{}", name, count));
        }
        *count += 1;
    }
    out
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Infer a column type from raw text cells (`None` = missing).
fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let present: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();

    let dtype = if present.is_empty() {
        ColumnType::Text
    } else if present.iter().all(|s| parse_number(s).is_some()) {
        ColumnType::Numeric
    } else if present.iter().all(|s| parse_bool(s).is_some()) {
        ColumnType::Boolean
    } else if present.iter().all(|s| parse_datetime(s).is_some()) {
        ColumnType::Datetime
    } else {
        ColumnType::Text
    };

    let values = cells
        .into_iter()
        .map(|cell| match cell {
            None => Value::Null,
            Some(s) => match dtype {
                ColumnType::Numeric => parse_number(&s).map(Value::Number).unwrap_or(Value::Null),
                ColumnType::Boolean => parse_bool(&s).map(Value::Bool).unwrap_or(Value::Null),
                ColumnType::Datetime => {
                    parse_datetime(&s).map(Value::DateTime).unwrap_or(Value::Null)
                }
                ColumnType::Text => Value::Text(s),
            },
        })
        .collect();

    Column::new(name, dtype, values)
}

/// Infer a column type from JSON cells. Strings stay text unless the whole
/// column is made of dates.
fn infer_json_column(name: String, cells: &[&Json]) -> Column {
    let present: Vec<&Json> = cells.iter().copied().filter(|v| !v.is_null()).collect();

    let dtype = if present.is_empty() {
        ColumnType::Text
    } else if present.iter().all(|v| v.as_f64().is_some_and(f64::is_finite)) {
        ColumnType::Numeric
    } else if present.iter().all(|v| v.is_boolean()) {
        ColumnType::Boolean
    } else if present
        .iter()
        .all(|v| v.as_str().is_some_and(|s| parse_datetime(s).is_some()))
    {
        ColumnType::Datetime
    } else {
        ColumnType::Text
    };

    let values = cells
        .iter()
        .map(|cell| match (dtype, cell) {
            (_, Json::Null) => Value::Null,
            (ColumnType::Numeric, v) => v.as_f64().map(Value::Number).unwrap_or(Value::Null),
            (ColumnType::Boolean, v) => v.as_bool().map(Value::Bool).unwrap_or(Value::Null),
            (ColumnType::Datetime, v) => v
                .as_str()
                .and_then(parse_datetime)
                .map(Value::DateTime)
                .unwrap_or(Value::Null),
            (ColumnType::Text, Json::String(s)) => Value::Text(s.clone()),
            (ColumnType::Text, other) => Value::Text(other.to_string()),
        })
        .collect();

    Column::new(name, dtype, values)
}
