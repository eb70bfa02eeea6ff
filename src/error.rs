//! Error taxonomy for dataset operations.
//!
//! Every failure raised by the registry, the analysis engine or the
//! dispatcher is an [`AnalysisError`]. The dispatcher renders these into
//! caller-visible text; only resource reads surface them as hard failures.

use thiserror::Error;

/// All errors produced while serving a tool call or resource read.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A request argument is missing or malformed.
    #[error("invalid argument '{field}': {message}")]
    Validation { field: String, message: String },

    /// No tool with this name is declared.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The named dataset is not in the registry.
    #[error("dataset '{0}' not found, load it first")]
    DatasetNotFound(String),

    /// A referenced column does not exist in the dataset.
    #[error("column '{column}' not found in dataset '{dataset}'")]
    ColumnNotFound { dataset: String, column: String },

    /// The file extension or export format is not supported.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An aggregation or filter operator is not supported.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Reading, parsing or writing a file failed.
    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },

    /// A computation could not be carried out on the given data.
    #[error("computation failed: {0}")]
    Computation(String),

    /// A resource identifier or dataset view does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),
}

impl AnalysisError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn column_not_found(dataset: &str, column: &str) -> Self {
        Self::ColumnNotFound {
            dataset: dataset.to_string(),
            column: column.to_string(),
        }
    }

    pub fn io(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Stable machine-readable kind, used in logs and error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::UnknownTool(_) => "UnknownTool",
            Self::DatasetNotFound(_) => "DatasetNotFound",
            Self::ColumnNotFound { .. } => "ColumnNotFound",
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::UnsupportedOperation(_) => "UnsupportedOperation",
            Self::Io { .. } => "IOError",
            Self::Computation(_) => "ComputationError",
            Self::NotFound(_) => "NotFound",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = AnalysisError::column_not_found("sales", "region");
        assert_eq!(
            err.to_string(),
            "column 'region' not found in dataset 'sales'"
        );
        assert_eq!(err.kind(), "ColumnNotFound");

        let err = AnalysisError::validation("threshold", "expected a number");
        assert!(err.to_string().contains("threshold"));
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = AnalysisError::io("/tmp/missing.csv", "No such file or directory");
        assert!(err.to_string().contains("/tmp/missing.csv"));
        assert_eq!(err.kind(), "IOError");
    }
}
