//! Data models for the analysis server.
//!
//! This module contains the tabular dataset representation, typed cell
//! values, and the audit records kept by the history log.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Inferred type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
    Boolean,
    Datetime,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Datetime => write!(f, "datetime"),
        }
    }
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

/// Hashable view of a [`Value`], used for distinct counts, grouping and
/// duplicate detection. Nulls compare equal to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKey<'a> {
    Null,
    Number(u64),
    Text(&'a str),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn key(&self) -> ValueKey<'_> {
        match self {
            Value::Null => ValueKey::Null,
            // -0.0 and 0.0 must land in the same bucket
            Value::Number(n) => ValueKey::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
            Value::Text(s) => ValueKey::Text(s),
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::DateTime(dt) => ValueKey::DateTime(*dt),
        }
    }

    /// Total order used to sort group keys: nulls first, then by kind, then
    /// by value within a kind.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::DateTime(_) => 3,
                Value::Text(_) => 4,
            }
        }
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// JSON rendering used by every report. Integral numbers are emitted as
    /// integers so `25` does not come back as `25.0`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Number(n) => number_to_json(*n),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::DateTime(dt) => Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }

    /// Lossless text for data files: numbers use the shortest round-trip
    /// form and datetimes keep fractional seconds. Nulls render empty.
    pub fn to_raw_text(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            other => other.to_text(),
        }
    }

    /// Display text for tables, rounded by [`format_number`]. Nulls render empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn heap_size(&self) -> usize {
        match self {
            Value::Text(s) => s.capacity(),
            _ => 0,
        }
    }
}

/// Convert a float to JSON: integral values become integers, non-finite
/// values become `null`.
pub fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

/// Deterministic number formatting: at most four decimals, trailing zeros
/// trimmed, `NaN` for undefined values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let mut s = format!("{:.4}", n);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// One column of a dataset: name, inferred type and its cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype == ColumnType::Numeric
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Number of distinct non-null values.
    pub fn distinct_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .map(Value::key)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Non-null numeric values in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }
}

/// An immutable, column-major table. Once placed in the registry a dataset
/// is never mutated; filtering builds a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset, checking that every column has the same length and
    /// that column names are unique.
    pub fn new(columns: Vec<Column>) -> Result<Self, String> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if column.values.len() != row_count {
                return Err(format!(
                    "column '{}' has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    row_count
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(format!("duplicate column name '{}'", column.name));
            }
        }
        Ok(Self { columns, row_count })
    }

    /// `(row_count, column_count)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.columns.len())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    /// Cells of row `idx`, in column order.
    pub fn row(&self, idx: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[idx]).collect()
    }

    /// Row `idx` as a JSON record keyed by column name.
    pub fn record(&self, idx: usize) -> Map<String, Json> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.values[idx].to_json()))
            .collect()
    }

    /// The first `n` rows as JSON records.
    pub fn head_records(&self, n: usize) -> Vec<Json> {
        (0..self.row_count.min(n))
            .map(|i| Json::Object(self.record(i)))
            .collect()
    }

    /// Keep only the rows whose index is in `rows` (ascending), producing a
    /// new dataset with the same schema.
    pub fn take_rows(&self, rows: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                dtype: c.dtype,
                values: rows.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Dataset {
            columns,
            row_count: rows.len(),
        }
    }

    /// Approximate in-memory footprint in bytes.
    pub fn memory_usage(&self) -> usize {
        let cell = std::mem::size_of::<Value>();
        self.columns
            .iter()
            .map(|c| {
                c.name.capacity()
                    + std::mem::size_of::<Column>()
                    + c.values.len() * cell
                    + c.values.iter().map(Value::heap_size).sum::<usize>()
            })
            .sum()
    }
}

/// Kind of operation recorded in the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LoadDataset,
    FilterData,
    GenerateInsights,
    ExportAnalysis,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::LoadDataset => write!(f, "load_dataset"),
            ActionKind::FilterData => write!(f, "filter_data"),
            ActionKind::GenerateInsights => write!(f, "generate_insights"),
            ActionKind::ExportAnalysis => write!(f, "export_analysis"),
        }
    }
}

/// Append-only audit entry for a mutating or insight-producing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// What was done.
    pub action: ActionKind,
    /// Datasets involved, source first.
    pub datasets: Vec<String>,
    /// When the operation completed.
    pub timestamp: DateTime<Utc>,
    /// Operation-specific details.
    #[serde(default)]
    pub details: Map<String, Json>,
}

impl HistoryRecord {
    pub fn new(action: ActionKind, datasets: Vec<String>, details: Map<String, Json>) -> Self {
        Self {
            action,
            datasets,
            timestamp: Utc::now(),
            details,
        }
    }
}
