//! Group-by aggregation.
//!
//! Rows are grouped by the value of one column and every requested
//! operation is applied to every aggregated column within each group.

use crate::analysis::stats;
use crate::error::{AnalysisError, Result};
use crate::models::{Column, Dataset, Value, ValueKey};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Aggregation applied to the values of one column within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOperation {
    Mean,
    Median,
    Sum,
    Min,
    Max,
    Count,
    Std,
    Var,
    Nunique,
    First,
    Last,
}

impl FromStr for AggOperation {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "avg" => Ok(AggOperation::Mean),
            "median" => Ok(AggOperation::Median),
            "sum" => Ok(AggOperation::Sum),
            "min" => Ok(AggOperation::Min),
            "max" => Ok(AggOperation::Max),
            "count" => Ok(AggOperation::Count),
            "std" => Ok(AggOperation::Std),
            "var" => Ok(AggOperation::Var),
            "nunique" => Ok(AggOperation::Nunique),
            "first" => Ok(AggOperation::First),
            "last" => Ok(AggOperation::Last),
            other => Err(AnalysisError::UnsupportedOperation(format!(
                "aggregation '{}' (supported: mean, median, sum, min, max, count, std, var, nunique, first, last)",
                other
            ))),
        }
    }
}

impl fmt::Display for AggOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggOperation::Mean => "mean",
            AggOperation::Median => "median",
            AggOperation::Sum => "sum",
            AggOperation::Min => "min",
            AggOperation::Max => "max",
            AggOperation::Count => "count",
            AggOperation::Std => "std",
            AggOperation::Var => "var",
            AggOperation::Nunique => "nunique",
            AggOperation::First => "first",
            AggOperation::Last => "last",
        };
        write!(f, "{}", name)
    }
}

impl AggOperation {
    /// Operations that only make sense on numbers.
    pub fn requires_numeric(&self) -> bool {
        !matches!(
            self,
            AggOperation::Count | AggOperation::Nunique | AggOperation::First | AggOperation::Last
        )
    }

    /// Apply to the cells of one group. Missing values are ignored;
    /// undefined results are `Null`.
    pub fn apply(&self, cells: &[&Value]) -> Value {
        let present: Vec<&Value> = cells.iter().copied().filter(|v| !v.is_null()).collect();

        let defined = |n: f64| {
            if n.is_nan() {
                Value::Null
            } else {
                Value::Number(n)
            }
        };

        match self {
            AggOperation::Count => Value::Number(present.len() as f64),
            AggOperation::Nunique => Value::Number(
                present.iter().map(|v| v.key()).collect::<HashSet<_>>().len() as f64,
            ),
            AggOperation::First => present.first().map(|v| (*v).clone()).unwrap_or(Value::Null),
            AggOperation::Last => present.last().map(|v| (*v).clone()).unwrap_or(Value::Null),
            numeric => {
                let values: Vec<f64> = present.iter().filter_map(|v| v.as_f64()).collect();
                match numeric {
                    AggOperation::Mean => defined(stats::mean(&values)),
                    AggOperation::Median => defined(stats::median(&values)),
                    AggOperation::Sum => Value::Number(values.iter().sum()),
                    AggOperation::Min => values
                        .iter()
                        .copied()
                        .reduce(f64::min)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    AggOperation::Max => values
                        .iter()
                        .copied()
                        .reduce(f64::max)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    AggOperation::Std => defined(stats::std_dev(&values)),
                    AggOperation::Var => defined(stats::variance(&values)),
                    _ => Value::Null,
                }
            }
        }
    }
}

/// One output row: the group key and one value per `(column, operation)`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Value,
    pub size: usize,
    pub values: Vec<Value>,
}

/// Result of a group-by request.
#[derive(Debug, Clone)]
pub struct GroupAnalysis {
    pub group_by: String,
    /// `(column, operation)` for each value position in a row.
    pub aggregates: Vec<(String, AggOperation)>,
    /// Groups sorted by key; rows whose key is missing are dropped.
    pub rows: Vec<GroupRow>,
}

impl GroupAnalysis {
    /// Header labels such as `salary_mean`.
    pub fn headers(&self) -> Vec<String> {
        self.aggregates
            .iter()
            .map(|(column, op)| format!("{}_{}", column, op))
            .collect()
    }

    #[cfg(test)]
    pub fn group(&self, key: &Value) -> Option<&GroupRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    #[cfg(test)]
    pub fn value(&self, key: &Value, column: &str, op: AggOperation) -> Option<&Value> {
        let idx = self
            .aggregates
            .iter()
            .position(|(c, o)| c == column && *o == op)?;
        self.group(key).map(|row| &row.values[idx])
    }
}

/// Partition row indices by the key column, in first-seen order.
fn partition<'a>(key_column: &'a Column) -> Vec<(&'a Value, Vec<usize>)> {
    let mut slots: HashMap<ValueKey<'a>, usize> = HashMap::new();
    let mut groups: Vec<(&Value, Vec<usize>)> = Vec::new();

    for (row, value) in key_column.values.iter().enumerate() {
        if value.is_null() {
            continue;
        }
        let slot = *slots.entry(value.key()).or_insert_with(|| {
            groups.push((value, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    groups
}

/// Group `dataset` by `group_by` and aggregate `agg_columns` (default: all
/// numeric columns other than the key) with every operation in `operations`.
pub fn group_analysis(
    dataset: &Dataset,
    dataset_name: &str,
    group_by: &str,
    agg_columns: Option<&[String]>,
    operations: &[String],
) -> Result<GroupAnalysis> {
    let key_column = dataset
        .column(group_by)
        .ok_or_else(|| AnalysisError::column_not_found(dataset_name, group_by))?;

    if operations.is_empty() {
        return Err(AnalysisError::validation(
            "operations",
            "at least one operation is required",
        ));
    }
    let ops = operations
        .iter()
        .map(|o| o.parse::<AggOperation>())
        .collect::<Result<Vec<_>>>()?;

    let columns: Vec<&Column> = match agg_columns {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|n| {
                dataset
                    .column(n)
                    .ok_or_else(|| AnalysisError::column_not_found(dataset_name, n))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => dataset
            .numeric_columns()
            .filter(|c| c.name != group_by)
            .collect(),
    };

    for column in &columns {
        if let Some(op) = ops
            .iter()
            .find(|op| op.requires_numeric() && !column.is_numeric())
        {
            return Err(AnalysisError::Computation(format!(
                "cannot compute '{}' of {} column '{}'",
                op, column.dtype, column.name
            )));
        }
    }

    let aggregates: Vec<(String, AggOperation)> = columns
        .iter()
        .flat_map(|c| ops.iter().map(move |op| (c.name.clone(), *op)))
        .collect();

    let mut rows: Vec<GroupRow> = partition(key_column)
        .into_iter()
        .map(|(key, members)| {
            let values = columns
                .iter()
                .flat_map(|column| {
                    let cells: Vec<&Value> = members.iter().map(|&i| &column.values[i]).collect();
                    ops.iter().map(move |op| op.apply(&cells))
                })
                .collect();
            GroupRow {
                key: key.clone(),
                size: members.len(),
                values,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.key.sort_cmp(&b.key));

    Ok(GroupAnalysis {
        group_by: group_by.to_string(),
        aggregates,
        rows,
    })
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

    fn ops(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_it_group_mean_salary() {
        let ds = employees();
        let cols = vec!["salary".to_string()];
        let result = group_analysis(&ds, "emp", "department", Some(&cols), &ops(&["mean"])).unwrap();

        let it = Value::Text("IT".into());
        assert_eq!(
            result.value(&it, "salary", AggOperation::Mean),
            Some(&Value::Number(60000.0))
        );
        assert_eq!(result.headers(), vec!["salary_mean"]);
    }

    #[test]
    fn test_groups_sorted_by_key() {
        let ds = employees();
        let result = group_analysis(&ds, "emp", "department", None, &ops(&["mean", "count"])).unwrap();
        let keys: Vec<_> = result.rows.iter().map(|r| r.key.to_text()).collect();
        assert_eq!(keys, vec!["Finance", "HR", "IT"]);
        assert_eq!(
            result.headers(),
            vec!["age_mean", "age_count", "salary_mean", "salary_count"]
        );
        let it = result.group(&Value::Text("IT".into())).unwrap();
        assert_eq!(it.size, 2);
        assert_eq!(it.values[1], Value::Number(2.0));
    }

    #[test]
    fn test_missing_group_column() {
        let ds = employees();
        let err = group_analysis(&ds, "emp", "region", None, &ops(&["mean"])).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_unknown_operation() {
        let ds = employees();
        let err = group_analysis(&ds, "emp", "department", None, &ops(&["mode"])).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_numeric_operation_on_text_column() {
        let ds = employees();
        let cols = vec!["name".to_string()];
        let err =
            group_analysis(&ds, "emp", "department", Some(&cols), &ops(&["mean"])).unwrap_err();
        assert!(matches!(err, AnalysisError::Computation(_)));

        let result =
            group_analysis(&ds, "emp", "department", Some(&cols), &ops(&["count", "first"]))
                .unwrap();
        let it = Value::Text("IT".into());
        assert_eq!(
            result.value(&it, "name", AggOperation::First),
            Some(&Value::Text("Alice".into()))
        );
    }

    #[test]
    fn test_apply_ignores_missing_values() {
        let cells = [Value::Number(1.0), Value::Null, Value::Number(3.0)];
        let refs: Vec<&Value> = cells.iter().collect();
        assert_eq!(AggOperation::Count.apply(&refs), Value::Number(2.0));
        assert_eq!(AggOperation::Sum.apply(&refs), Value::Number(4.0));
        assert_eq!(AggOperation::Median.apply(&refs), Value::Number(2.0));
        assert_eq!(AggOperation::Max.apply(&refs), Value::Number(3.0));
        assert_eq!(AggOperation::Std.apply(&refs[..1]), Value::Null);
    }
}
