//! Tool catalog: the closed set of tools, their argument schemas, and
//! argument validation against those schemas.

use crate::error::{AnalysisError, Result};
use crate::models::ActionKind;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    LoadDataset,
    DatasetInfo,
    CalculateStatistics,
    FindCorrelations,
    GroupAnalysis,
    DataQualityCheck,
    GenerateInsights,
    ExportAnalysis,
    FilterData,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::LoadDataset,
        ToolKind::DatasetInfo,
        ToolKind::CalculateStatistics,
        ToolKind::FindCorrelations,
        ToolKind::GroupAnalysis,
        ToolKind::DataQualityCheck,
        ToolKind::GenerateInsights,
        ToolKind::ExportAnalysis,
        ToolKind::FilterData,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::LoadDataset => "load_dataset",
            ToolKind::DatasetInfo => "dataset_info",
            ToolKind::CalculateStatistics => "calculate_statistics",
            ToolKind::FindCorrelations => "find_correlations",
            ToolKind::GroupAnalysis => "group_analysis",
            ToolKind::DataQualityCheck => "data_quality_check",
            ToolKind::GenerateInsights => "generate_insights",
            ToolKind::ExportAnalysis => "export_analysis",
            ToolKind::FilterData => "filter_data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::LoadDataset => "Load a dataset from a CSV or JSON file and register it under a name.",
            ToolKind::DatasetInfo => "Get structural information about a loaded dataset: shape, column types, null and unique counts, and sample rows.",
            ToolKind::CalculateStatistics => "Calculate descriptive statistics for the numeric columns of a dataset.",
            ToolKind::FindCorrelations => "Find correlations between numeric columns and report the pairs above a threshold.",
            ToolKind::GroupAnalysis => "Group rows by a column and aggregate other columns within each group.",
            ToolKind::DataQualityCheck => "Assess data quality: missing values, duplicate rows and suspicious columns.",
            ToolKind::GenerateInsights => "Generate automated insights: overview, outliers, patterns or recommendations.",
            ToolKind::ExportAnalysis => "Export a dataset or its analysis report to a CSV, JSON or HTML file.",
            ToolKind::FilterData => "Filter a dataset with conditions and store the result under a new name.",
        }
    }

    /// The history action recorded after a successful call, if any.
    pub fn history_action(&self) -> Option<ActionKind> {
        match self {
            ToolKind::LoadDataset => Some(ActionKind::LoadDataset),
            ToolKind::FilterData => Some(ActionKind::FilterData),
            ToolKind::GenerateInsights => Some(ActionKind::GenerateInsights),
            ToolKind::ExportAnalysis => Some(ActionKind::ExportAnalysis),
            _ => None,
        }
    }

    pub fn params(&self) -> Vec<ParamSpec> {
        let name = ParamSpec::required("name", ParamKind::String, "Name of the dataset");
        match self {
            ToolKind::LoadDataset => vec![
                ParamSpec::required("path", ParamKind::String, "Path to the CSV or JSON file"),
                ParamSpec::required("name", ParamKind::String, "Name to register the dataset under"),
                ParamSpec::optional(
                    "delimiter",
                    ParamKind::String,
                    "CSV field delimiter (defaults to the configured delimiter)",
                ),
            ],
            ToolKind::DatasetInfo | ToolKind::DataQualityCheck => vec![name],
            ToolKind::CalculateStatistics => vec![
                name,
                ParamSpec::optional(
                    "columns",
                    ParamKind::StringArray,
                    "Columns to describe (default: all numeric columns)",
                ),
                ParamSpec::optional(
                    "include_percentiles",
                    ParamKind::Boolean,
                    "Also report the 90th and 95th percentiles",
                )
                .with_default(json!(true)),
            ],
            ToolKind::FindCorrelations => vec![
                name,
                ParamSpec::optional("method", ParamKind::String, "Correlation method")
                    .one_of(&["pearson", "spearman", "kendall"])
                    .with_default(json!("pearson")),
                ParamSpec::optional(
                    "threshold",
                    ParamKind::Number,
                    "Minimum absolute correlation to report",
                )
                .with_default(json!(0.5)),
            ],
            ToolKind::GroupAnalysis => vec![
                name,
                ParamSpec::required("group_by", ParamKind::String, "Column to group by"),
                ParamSpec::optional(
                    "agg_columns",
                    ParamKind::StringArray,
                    "Columns to aggregate (default: all numeric columns)",
                ),
                ParamSpec::optional(
                    "operations",
                    ParamKind::StringArray,
                    "Aggregations: mean, median, sum, min, max, count, std, var, nunique, first, last",
                )
                .with_default(json!(["mean", "count"])),
            ],
            ToolKind::GenerateInsights => vec![
                name,
                ParamSpec::optional("focus", ParamKind::String, "Which insights to generate")
                    .one_of(&["overview", "outliers", "patterns", "recommendations", "all"])
                    .with_default(json!("overview")),
            ],
            ToolKind::ExportAnalysis => vec![
                name,
                ParamSpec::required("format", ParamKind::String, "Output format")
                    .one_of(&["json", "csv", "html"]),
                ParamSpec::required("output_path", ParamKind::String, "Destination file path"),
            ],
            ToolKind::FilterData => vec![
                name,
                ParamSpec::required(
                    "conditions",
                    ParamKind::ObjectArray,
                    "Conditions combined with AND: {column, operator, value}",
                ),
                ParamSpec::required("new_name", ParamKind::String, "Name for the filtered dataset"),
            ],
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: input_schema(&self.params()),
        }
    }

    /// Check `arguments` against this tool's schema and fill in defaults.
    pub fn validate(&self, arguments: &Value) -> Result<Map<String, Value>> {
        let mut args = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(AnalysisError::validation(
                    "arguments",
                    format!("expected an object, got {}", other),
                ))
            }
        };

        for param in self.params() {
            let present = args.get(param.name).filter(|v| !v.is_null()).cloned();
            match present {
                Some(value) => param.check(&value)?,
                None if param.required => {
                    return Err(AnalysisError::validation(
                        param.name,
                        "missing required field",
                    ))
                }
                None => match &param.default {
                    Some(default) => {
                        args.insert(param.name.to_string(), default.clone());
                    }
                    None => {
                        args.remove(param.name);
                    }
                },
            }
        }

        Ok(args)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    StringArray,
    ObjectArray,
}

impl ParamKind {
    fn schema(&self) -> Value {
        match self {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Number => json!({"type": "number"}),
            ParamKind::Boolean => json!({"type": "boolean"}),
            ParamKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::ObjectArray => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "column": {"type": "string"},
                        "operator": {"type": "string", "enum": ["==", "!=", ">", "<", ">=", "<="]},
                        "value": {}
                    },
                    "required": ["column", "operator", "value"]
                }
            }),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::StringArray => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            ParamKind::ObjectArray => value.is_array(),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ParamKind::String => "a string",
            ParamKind::Number => "a number",
            ParamKind::Boolean => "a boolean",
            ParamKind::StringArray => "an array of strings",
            ParamKind::ObjectArray => "an array of objects",
        }
    }
}

/// Declared parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub allowed: &'static [&'static str],
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            allowed: &[],
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    fn check(&self, value: &Value) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(AnalysisError::validation(
                self.name,
                format!("expected {}, got {}", self.kind.expected(), value),
            ));
        }
        if !self.allowed.is_empty() {
            let ok = value
                .as_str()
                .map(|s| self.allowed.contains(&s))
                .unwrap_or(false);
            if !ok {
                return Err(AnalysisError::validation(
                    self.name,
                    format!("must be one of: {}", self.allowed.join(", ")),
                ));
            }
        }
        Ok(())
    }

    fn schema(&self) -> Value {
        let mut schema = self.kind.schema();
        if let Value::Object(ref mut map) = schema {
            map.insert("description".to_string(), json!(self.description));
            if !self.allowed.is_empty() {
                map.insert("enum".to_string(), json!(self.allowed));
            }
            if let Some(ref default) = self.default {
                map.insert("default".to_string(), default.clone());
            }
        }
        schema
    }
}

fn input_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| (p.name.to_string(), p.schema()))
        .collect();
    let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Tool definition as listed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Definitions of every tool, in catalog order.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(ToolKind::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions() {
        let tools = get_tool_definitions();
        assert_eq!(tools.len(), 9);

        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"load_dataset"));
        assert!(names.contains(&"filter_data"));

        let export = &tools[7];
        assert_eq!(export.name, "export_analysis");
        assert_eq!(
            export.input_schema["required"],
            json!(["name", "format", "output_path"])
        );
        assert_eq!(
            export.input_schema["properties"]["format"]["enum"],
            json!(["json", "csv", "html"])
        );
    }

    #[test]
    fn test_name_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("read_file"), None);
    }

    #[test]
    fn test_defaults_applied() {
        let args = ToolKind::FindCorrelations
            .validate(&json!({"name": "sales"}))
            .unwrap();
        assert_eq!(args["method"], "pearson");
        assert_eq!(args["threshold"], 0.5);

        let args = ToolKind::GroupAnalysis
            .validate(&json!({"name": "sales", "group_by": "region"}))
            .unwrap();
        assert_eq!(args["operations"], json!(["mean", "count"]));
        assert!(args.get("agg_columns").is_none());
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let err = ToolKind::LoadDataset
            .validate(&json!({"path": "data.csv"}))
            .unwrap_err();
        match err {
            AnalysisError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_type_and_enum_constraints() {
        let err = ToolKind::FindCorrelations
            .validate(&json!({"name": "s", "threshold": "high"}))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { ref field, .. } if field == "threshold"));

        let err = ToolKind::GenerateInsights
            .validate(&json!({"name": "s", "focus": "everything"}))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { ref field, .. } if field == "focus"));

        let err = ToolKind::CalculateStatistics
            .validate(&json!({"name": "s", "columns": [1, 2]}))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { ref field, .. } if field == "columns"));
    }

    #[test]
    fn test_history_producing_tools() {
        let producing: Vec<_> = ToolKind::ALL
            .iter()
            .filter(|k| k.history_action().is_some())
            .map(|k| k.name())
            .collect();
        assert_eq!(
            producing,
            vec!["load_dataset", "generate_insights", "export_analysis", "filter_data"]
        );
    }
}
