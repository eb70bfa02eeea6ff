//! Read-only resource views over the workspace.

use crate::error::{AnalysisError, Result};
use crate::report::generator::{dataset_view_json, loaded_datasets_json, pretty};
use crate::workspace::Workspace;
use serde::Serialize;

pub const LOADED_DATASETS_URI: &str = "data://loaded_datasets";
pub const GUIDE_URI: &str = "data://analysis_guide";
pub const HISTORY_URI: &str = "data://analysis_history";
pub const DATASET_URI_PREFIX: &str = "data://dataset/";

const JSON_MIME: &str = "application/json";
const TEXT_MIME: &str = "text/plain";

/// Plain-text usage guide served at `data://analysis_guide`.
pub const ANALYSIS_GUIDE: &str = "\
# Tabscope Data Analysis Guide

Tabscope loads tabular datasets into named slots and runs analyses on them.

## Workflow

1. load_dataset: load a CSV or JSON file under a name
2. dataset_info: inspect shape, column types and sample rows
3. data_quality_check: find missing values, duplicates and suspicious columns
4. calculate_statistics: descriptive statistics for numeric columns
5. find_correlations: pairwise correlations (pearson, spearman, kendall)
6. group_analysis: aggregate columns per group
7. generate_insights: overview, outliers, patterns and recommendations
8. filter_data: keep the rows matching conditions under a new name
9. export_analysis: write the dataset or its report as CSV, JSON or HTML

## Example

    load_dataset(path=\"data/sales.csv\", name=\"sales\")
    data_quality_check(name=\"sales\")
    find_correlations(name=\"sales\", threshold=0.5)
    group_analysis(name=\"sales\", group_by=\"region\")
    filter_data(name=\"sales\", conditions=[{\"column\": \"amount\", \"operator\": \">\", \"value\": 100}], new_name=\"big_sales\")
    generate_insights(name=\"big_sales\", focus=\"all\")

## Methods

- Percentiles use linear interpolation; std is the sample deviation
- Correlations use pairwise-complete observations
- Outliers follow the IQR rule (1.5 x IQR beyond the quartiles)
- Missing values: empty cells and markers such as NA, N/A, null";

/// Descriptor returned by `resources/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

/// Body returned by `resources/read`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    pub text: String,
}

/// The three static resources, then one per loaded dataset in name order.
pub fn list_resources(workspace: &Workspace) -> Vec<ResourceDescriptor> {
    let mut resources = vec![
        ResourceDescriptor {
            uri: LOADED_DATASETS_URI.to_string(),
            name: "Loaded Datasets".to_string(),
            description: "Currently loaded datasets with shape, columns and types".to_string(),
            mime_type: JSON_MIME,
        },
        ResourceDescriptor {
            uri: GUIDE_URI.to_string(),
            name: "Data Analysis Guide".to_string(),
            description: "How to use the analysis tools".to_string(),
            mime_type: TEXT_MIME,
        },
        ResourceDescriptor {
            uri: HISTORY_URI.to_string(),
            name: "Analysis History".to_string(),
            description: "Log of loads, filters, insights and exports".to_string(),
            mime_type: JSON_MIME,
        },
    ];

    resources.extend(workspace.registry.names().into_iter().map(|name| ResourceDescriptor {
        uri: format!("{}{}", DATASET_URI_PREFIX, name),
        description: format!("Detailed information about the {} dataset", name),
        name: format!("Dataset: {}", name),
        mime_type: JSON_MIME,
    }));

    resources
}

/// Render the resource at `uri`.
pub fn read_resource(workspace: &Workspace, uri: &str) -> Result<ResourceContent> {
    let (mime_type, text) = match uri {
        LOADED_DATASETS_URI => (JSON_MIME, pretty(&loaded_datasets_json(&workspace.registry))),
        GUIDE_URI => (TEXT_MIME, ANALYSIS_GUIDE.to_string()),
        HISTORY_URI => (
            JSON_MIME,
            serde_json::to_string_pretty(workspace.history.all())
                .map_err(|e| AnalysisError::Computation(e.to_string()))?,
        ),
        _ => {
            let name = uri
                .strip_prefix(DATASET_URI_PREFIX)
                .ok_or_else(|| AnalysisError::NotFound(uri.to_string()))?;
            let dataset = workspace
                .registry
                .get(name)
                .map_err(|_| AnalysisError::NotFound(format!("dataset '{}'", name)))?;
            (
                JSON_MIME,
                pretty(&dataset_view_json(
                    name,
                    dataset,
                    workspace.config.analysis.view_sample_rows,
                )),
            )
        }
    };

    Ok(ResourceContent {
        uri: uri.to_string(),
        mime_type,
        text,
    })
}
