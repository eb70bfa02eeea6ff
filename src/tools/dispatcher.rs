//! Tool dispatch.
//!
//! Looks up the handler for a tool, validates its arguments, runs it
//! against the workspace and converts any failure into an error result.
//! Successful history-producing calls are recorded in the history log.

use crate::analysis::{
    calculate_statistics, data_quality_check, filter_dataset, find_correlations,
    generate_insights, group_analysis, Condition, CorrelationMethod, InsightFocus,
};
use crate::error::{AnalysisError, Result};
use crate::loader::{load_file, LoadOptions};
use crate::models::HistoryRecord;
use crate::report::generator;
use crate::report::{export_dataset, ExportFormat};
use crate::tools::schema::ToolKind;
use crate::workspace::Workspace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text shown to the caller.
    pub fn text(&self) -> String {
        match &self.error {
            Some(message) => format!("Error: {}", message),
            None => self.output.clone(),
        }
    }
}

/// What a handler hands back: the text for the caller plus what to record
/// in the history log if the tool produces history.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub text: String,
    pub datasets: Vec<String>,
    pub details: Map<String, Value>,
}

impl ToolOutput {
    fn text(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

pub type Handler = fn(&mut Workspace, Map<String, Value>) -> Result<ToolOutput>;

/// Maps every tool to its handler. Built once at startup.
pub struct Dispatcher {
    handlers: HashMap<ToolKind, Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut handlers: HashMap<ToolKind, Handler> = HashMap::new();
        handlers.insert(ToolKind::LoadDataset, load_dataset);
        handlers.insert(ToolKind::DatasetInfo, dataset_info);
        handlers.insert(ToolKind::CalculateStatistics, statistics);
        handlers.insert(ToolKind::FindCorrelations, correlations);
        handlers.insert(ToolKind::GroupAnalysis, groups);
        handlers.insert(ToolKind::DataQualityCheck, quality);
        handlers.insert(ToolKind::GenerateInsights, insights);
        handlers.insert(ToolKind::ExportAnalysis, export);
        handlers.insert(ToolKind::FilterData, filter);
        Self { handlers }
    }

    /// Execute a tool call and return the result. Never fails: errors are
    /// reported in the returned [`ToolResult`].
    pub fn execute(&self, workspace: &mut Workspace, name: &str, arguments: &Value) -> ToolResult {
        info!("Executing tool: {}", name);
        debug!("Arguments for {}: {}", name, arguments);

        match self.try_execute(workspace, name, arguments) {
            Ok(text) => ToolResult::success(text),
            Err(e) => {
                warn!("Tool '{}' failed ({}): {}", name, e.kind(), e);
                ToolResult::error(e.to_string())
            }
        }
    }

    fn try_execute(&self, workspace: &mut Workspace, name: &str, arguments: &Value) -> Result<String> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| AnalysisError::UnknownTool(name.to_string()))?;
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| AnalysisError::UnknownTool(name.to_string()))?;

        let args = kind.validate(arguments)?;
        let output = handler(workspace, args)?;

        if let Some(action) = kind.history_action() {
            workspace
                .history
                .append(HistoryRecord::new(action, output.datasets, output.details));
            debug!("History now holds {} records", workspace.history.all().len());
        }

        Ok(output.text)
    }
}

/// Deserialize validated arguments into a handler's typed form.
fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| AnalysisError::validation("arguments", e.to_string()))
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LoadArgs {
    path: String,
    name: String,
    delimiter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatisticsArgs {
    name: String,
    columns: Option<Vec<String>>,
    include_percentiles: bool,
}

#[derive(Debug, Deserialize)]
struct CorrelationArgs {
    name: String,
    method: String,
    threshold: f64,
}

#[derive(Debug, Deserialize)]
struct GroupArgs {
    name: String,
    group_by: String,
    agg_columns: Option<Vec<String>>,
    operations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InsightArgs {
    name: String,
    focus: String,
}

#[derive(Debug, Deserialize)]
struct ExportArgs {
    name: String,
    format: String,
    output_path: String,
}

#[derive(Debug, Deserialize)]
struct FilterArgs {
    name: String,
    conditions: Vec<Value>,
    new_name: String,
}

fn load_dataset(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: LoadArgs = parse_args(args)?;

    let mut options = LoadOptions::from(&workspace.config.loader);
    if let Some(ref delimiter) = args.delimiter {
        options = options.with_delimiter(delimiter)?;
    }

    let dataset = load_file(Path::new(&args.path), &options)?;
    let (rows, columns) = dataset.shape();
    let text = generator::load_summary(&args.name, &dataset);

    if workspace.registry.put(args.name.clone(), dataset) {
        info!("Replaced existing dataset '{}'", args.name);
    }
    info!(
        "Loaded dataset '{}' with shape ({}, {})",
        args.name, rows, columns
    );

    let mut details = Map::new();
    details.insert("path".to_string(), json!(args.path));
    details.insert("shape".to_string(), json!([rows, columns]));

    Ok(ToolOutput {
        text,
        datasets: vec![args.name],
        details,
    })
}

fn dataset_info(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: NameArgs = parse_args(args)?;
    let dataset = workspace.registry.get(&args.name)?;
    Ok(ToolOutput::text(generator::dataset_info_text(
        &args.name,
        dataset,
        workspace.config.analysis.sample_rows,
    )))
}

fn statistics(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: StatisticsArgs = parse_args(args)?;
    let dataset = workspace.registry.get(&args.name)?;
    let summaries = calculate_statistics(
        dataset,
        &args.name,
        args.columns.as_deref(),
        args.include_percentiles,
    )?;
    Ok(ToolOutput::text(generator::statistics_report(
        &args.name, &summaries,
    )))
}

fn correlations(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: CorrelationArgs = parse_args(args)?;
    let method: CorrelationMethod = args.method.parse()?;
    let dataset = workspace.registry.get(&args.name)?;
    let analysis = find_correlations(
        dataset,
        method,
        args.threshold,
        workspace.config.analysis.strong_correlation,
    );
    Ok(ToolOutput::text(generator::correlation_report(
        &args.name, &analysis,
    )))
}

fn groups(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: GroupArgs = parse_args(args)?;
    let dataset = workspace.registry.get(&args.name)?;
    let analysis = group_analysis(
        dataset,
        &args.name,
        &args.group_by,
        args.agg_columns.as_deref(),
        &args.operations,
    )?;
    Ok(ToolOutput::text(generator::group_report(&args.name, &analysis)))
}

fn quality(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: NameArgs = parse_args(args)?;
    let dataset = workspace.registry.get(&args.name)?;
    let report = data_quality_check(dataset, &args.name);
    Ok(ToolOutput::text(generator::quality_text(&report)))
}

fn insights(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: InsightArgs = parse_args(args)?;
    let focus: InsightFocus = args.focus.parse()?;
    let dataset = workspace.registry.get(&args.name)?;
    let insights = generate_insights(
        dataset,
        &args.name,
        focus,
        workspace.config.analysis.iqr_multiplier,
    );

    let mut details = Map::new();
    details.insert("focus".to_string(), json!(insights.focus.to_string()));
    if !insights.outliers.is_empty() {
        let outliers: Map<String, Value> = insights
            .outliers
            .iter()
            .map(|(column, n)| (column.clone(), json!(n)))
            .collect();
        details.insert("outliers".to_string(), Value::Object(outliers));
    }

    Ok(ToolOutput {
        text: generator::insights_report(&insights),
        datasets: vec![args.name],
        details,
    })
}

fn export(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: ExportArgs = parse_args(args)?;
    let format: ExportFormat = args.format.parse()?;
    let dataset = workspace.registry.get(&args.name)?;

    export_dataset(
        &args.name,
        dataset,
        format,
        Path::new(&args.output_path),
        &workspace.config.export,
    )?;

    let mut details = Map::new();
    details.insert("format".to_string(), json!(format.to_string()));
    details.insert("output_path".to_string(), json!(args.output_path));

    Ok(ToolOutput {
        text: format!(
            "Successfully exported '{}' analysis to {} ({} format)",
            args.name, args.output_path, format
        ),
        datasets: vec![args.name],
        details,
    })
}

fn filter(workspace: &mut Workspace, args: Map<String, Value>) -> Result<ToolOutput> {
    let args: FilterArgs = parse_args(args)?;
    let conditions = Condition::parse_all(&args.conditions)?;

    let source = workspace.registry.get(&args.name)?;
    let original = source.shape();
    let outcome = filter_dataset(
        source,
        &args.name,
        &conditions,
        workspace.config.filter.unknown_columns,
    )?;
    let filtered = outcome.dataset.shape();

    let text = generator::filter_report(
        &args.name,
        &args.new_name,
        original,
        filtered,
        conditions.len(),
        &outcome.skipped,
    );

    let mut details = Map::new();
    details.insert("conditions".to_string(), Value::Array(args.conditions));
    details.insert("conditions_applied".to_string(), json!(outcome.applied));
    details.insert("original_shape".to_string(), json!([original.0, original.1]));
    details.insert("filtered_shape".to_string(), json!([filtered.0, filtered.1]));

    if workspace.registry.exists(&args.new_name) {
        info!("Replacing existing dataset '{}'", args.new_name);
    }
    workspace.registry.put(args.new_name.clone(), outcome.dataset);
    info!(
        "Created filtered dataset '{}' from '{}'",
        args.new_name, args.name
    );

    Ok(ToolOutput {
        text,
        datasets: vec![args.name, args.new_name],
        details,
    })
}
