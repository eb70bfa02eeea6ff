//! Row filtering with conjunctive conditions.
//!
//! Conditions are applied in order, each narrowing the surviving row set.
//! The source dataset is never touched; a new dataset is built from the
//! surviving rows.

use crate::config::UnknownColumnPolicy;
use crate::error::{AnalysisError, Result};
use crate::loader::{parse_datetime, parse_number};
use crate::models::{Column, Dataset, Value};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl FromStr for FilterOperator {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "==" => Ok(FilterOperator::Eq),
            "!=" => Ok(FilterOperator::Ne),
            ">" => Ok(FilterOperator::Gt),
            "<" => Ok(FilterOperator::Lt),
            ">=" => Ok(FilterOperator::Ge),
            "<=" => Ok(FilterOperator::Le),
            other => Err(AnalysisError::UnsupportedOperation(format!(
                "filter operator '{}' (supported: ==, !=, >, <, >=, <=)",
                other
            ))),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            FilterOperator::Eq => "==",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::Ge => ">=",
            FilterOperator::Le => "<=",
        };
        write!(f, "{}", symbol)
    }
}

impl FilterOperator {
    fn is_ordering(&self) -> bool {
        !matches!(self, FilterOperator::Eq | FilterOperator::Ne)
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            FilterOperator::Eq => ordering == Ordering::Equal,
            FilterOperator::Ne => ordering != Ordering::Equal,
            FilterOperator::Gt => ordering == Ordering::Greater,
            FilterOperator::Lt => ordering == Ordering::Less,
            FilterOperator::Ge => ordering != Ordering::Less,
            FilterOperator::Le => ordering != Ordering::Greater,
        }
    }
}

/// One `column operator value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Json,
}

impl Condition {
    /// Parse a `{"column", "operator", "value"}` object.
    pub fn from_json(raw: &Json) -> Result<Self> {
        let object = raw.as_object().ok_or_else(|| {
            AnalysisError::validation("conditions", "each condition must be an object")
        })?;

        let column = object
            .get("column")
            .and_then(Json::as_str)
            .ok_or_else(|| {
                AnalysisError::validation("conditions", "condition is missing string 'column'")
            })?;
        let operator = object
            .get("operator")
            .and_then(Json::as_str)
            .ok_or_else(|| {
                AnalysisError::validation("conditions", "condition is missing string 'operator'")
            })?
            .parse()?;
        let value = object
            .get("value")
            .cloned()
            .ok_or_else(|| AnalysisError::validation("conditions", "condition is missing 'value'"))?;

        Ok(Self {
            column: column.to_string(),
            operator,
            value,
        })
    }

    pub fn parse_all(raw: &[Json]) -> Result<Vec<Self>> {
        raw.iter().map(Self::from_json).collect()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

/// Compare a non-null cell with a condition value. `None` means the two are
/// of different kinds.
fn compare(cell: &Value, target: &Json) -> Option<Ordering> {
    match (cell, target) {
        (Value::Number(a), Json::Number(b)) => b.as_f64().map(|b| a.total_cmp(&b)),
        (Value::Number(a), Json::String(s)) => parse_number(s).map(|b| a.total_cmp(&b)),
        (Value::Text(a), Json::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bool(a), Json::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Json::String(s)) => match s.to_lowercase().as_str() {
            "true" => Some(a.cmp(&true)),
            "false" => Some(a.cmp(&false)),
            _ => None,
        },
        (Value::DateTime(a), Json::String(s)) => parse_datetime(s).map(|b| a.cmp(&b)),
        _ => None,
    }
}

fn matches(column: &Column, row: usize, condition: &Condition) -> Result<bool> {
    let cell = &column.values[row];
    if cell.is_null() {
        return Ok(condition.operator == FilterOperator::Ne);
    }

    match compare(cell, &condition.value) {
        Some(ordering) => Ok(condition.operator.accepts(ordering)),
        None if condition.operator.is_ordering() => Err(AnalysisError::Computation(format!(
            "cannot compare {} column '{}' with {} using '{}'",
            column.dtype, column.name, condition.value, condition.operator
        ))),
        None => Ok(condition.operator == FilterOperator::Ne),
    }
}

/// Result of a filter: the new dataset and which conditions were used.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    pub applied: usize,
    /// Conditions ignored because their column does not exist.
    pub skipped: Vec<String>,
}

/// Apply `conditions` to `dataset` with AND semantics.
pub fn filter_dataset(
    dataset: &Dataset,
    dataset_name: &str,
    conditions: &[Condition],
    unknown_columns: UnknownColumnPolicy,
) -> Result<FilterOutcome> {
    let mut rows: Vec<usize> = (0..dataset.row_count()).collect();
    let mut applied = 0;
    let mut skipped = Vec::new();

    for condition in conditions {
        let column = match dataset.column(&condition.column) {
            Some(column) => column,
            None => match unknown_columns {
                UnknownColumnPolicy::Error => {
                    return Err(AnalysisError::column_not_found(
                        dataset_name,
                        &condition.column,
                    ))
                }
                UnknownColumnPolicy::Skip => {
                    debug!("Skipping condition on unknown column '{}'", condition.column);
                    skipped.push(condition.column.clone());
                    continue;
                }
            },
        };

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if matches(column, row, condition)? {
                kept.push(row);
            }
        }
        rows = kept;
        applied += 1;
    }

    Ok(FilterOutcome {
        dataset: dataset.take_rows(&rows),
        applied,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_csv, LoadOptions};
    use serde_json::json;

    fn employees() -> Dataset {
        parse_csv(
            include_str!("../../fixtures/employees.csv"),
            &LoadOptions::default(),
        )
        .unwrap()
    }

    fn conditions(raw: Json) -> Vec<Condition> {
        Condition::parse_all(raw.as_array().unwrap()).unwrap()
    }

    fn names(ds: &Dataset) -> Vec<String> {
        ds.column("name")
            .unwrap()
            .values
            .iter()
            .map(Value::to_text)
            .collect()
    }

    #[test]
    fn test_age_over_28_keeps_bob_and_charlie() {
        let ds = employees();
        let before = ds.clone();
        let conds = conditions(json!([{"column": "age", "operator": ">", "value": 28}]));
        let outcome = filter_dataset(&ds, "emp", &conds, UnknownColumnPolicy::Error).unwrap();

        assert_eq!(outcome.dataset.shape(), (2, 4));
        assert_eq!(names(&outcome.dataset), vec!["Bob", "Charlie"]);
        assert_eq!(outcome.applied, 1);
        assert_eq!(ds, before);
    }

    #[test]
    fn test_conditions_combine_with_and() {
        let ds = employees();
        let conds = conditions(json!([
            {"column": "department", "operator": "==", "value": "IT"},
            {"column": "salary", "operator": ">=", "value": "60000"}
        ]));
        let outcome = filter_dataset(&ds, "emp", &conds, UnknownColumnPolicy::Error).unwrap();
        assert_eq!(names(&outcome.dataset), vec!["Charlie"]);
    }

    #[test]
    fn test_unknown_column_policy() {
        let ds = employees();
        let conds = conditions(json!([
            {"column": "region", "operator": "==", "value": "EU"},
            {"column": "age", "operator": "<", "value": 30}
        ]));

        let err = filter_dataset(&ds, "emp", &conds, UnknownColumnPolicy::Error).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound { .. }));

        let outcome = filter_dataset(&ds, "emp", &conds, UnknownColumnPolicy::Skip).unwrap();
        assert_eq!(outcome.skipped, vec!["region"]);
        assert_eq!(outcome.applied, 1);
        assert_eq!(names(&outcome.dataset), vec!["Alice", "Diana"]);
    }

    #[test]
    fn test_null_cells_only_pass_not_equal() {
        let ds = parse_csv("a,b\n1,x\n,y\n3,z\n", &LoadOptions::default()).unwrap();
        let ne = conditions(json!([{"column": "a", "operator": "!=", "value": 1}]));
        let eq = conditions(json!([{"column": "a", "operator": "==", "value": 1}]));
        let ne_rows = filter_dataset(&ds, "t", &ne, UnknownColumnPolicy::Error).unwrap();
        let eq_rows = filter_dataset(&ds, "t", &eq, UnknownColumnPolicy::Error).unwrap();
        assert_eq!(ne_rows.dataset.row_count(), 2);
        assert_eq!(eq_rows.dataset.row_count(), 1);
    }

    #[test]
    fn test_mismatched_kinds() {
        let ds = employees();
        let eq = conditions(json!([{"column": "name", "operator": "==", "value": 5}]));
        let outcome = filter_dataset(&ds, "emp", &eq, UnknownColumnPolicy::Error).unwrap();
        assert_eq!(outcome.dataset.row_count(), 0);

        let gt = conditions(json!([{"column": "name", "operator": ">", "value": 5}]));
        let err = filter_dataset(&ds, "emp", &gt, UnknownColumnPolicy::Error).unwrap_err();
        assert!(matches!(err, AnalysisError::Computation(_)));
    }

    #[test]
    fn test_malformed_conditions() {
        let err = Condition::from_json(&json!("age > 28")).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { .. }));

        let err = Condition::from_json(&json!({"column": "age", "operator": "~", "value": 1}))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedOperation(_)));

        let err = Condition::from_json(&json!({"column": "age", "operator": ">"})).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { .. }));
    }
}
