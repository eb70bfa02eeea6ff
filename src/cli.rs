//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Tabscope - tabular dataset analysis server for AI agents
///
/// Serves dataset loading, statistics, correlations, grouping, quality
/// checks, insights, filtering and export as tools over JSON-RPC on stdio.
///
/// Examples:
///   tabscope
///   tabscope --preload sales=data/sales.csv --verbose
///   tabscope --call dataset_info --args '{"name": "sales"}' --preload sales=data/sales.csv
///   tabscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .tabscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Also append log lines to this file
    #[arg(long, value_name = "FILE", env = "TABSCOPE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Load a dataset at startup (repeatable)
    ///
    /// Example: --preload sales=data/sales.csv
    #[arg(long, value_name = "NAME=PATH")]
    pub preload: Vec<String>,

    /// Default CSV delimiter for loads that don't specify one
    #[arg(short, long, value_name = "CHAR")]
    pub delimiter: Option<String>,

    /// Ignore filter conditions on unknown columns instead of failing
    #[arg(long)]
    pub skip_unknown_columns: bool,

    /// Execute a single tool call, print its result and exit
    ///
    /// Exit code 0 on success, 2 when the tool reports an error.
    #[arg(long, value_name = "TOOL")]
    pub call: Option<String>,

    /// JSON object of arguments for --call
    #[arg(long, value_name = "JSON", requires = "call")]
    pub args: Option<String>,

    /// Generate a default .tabscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref delimiter) = self.delimiter {
            if delimiter.len() != 1 {
                return Err(format!(
                    "Delimiter must be a single character, got '{}'",
                    delimiter
                ));
            }
        }

        for spec in &self.preload {
            parse_preload(spec)?;
        }

        if let Some(ref raw) = self.args {
            let value: serde_json::Value = serde_json::from_str(raw)
                .map_err(|e| format!("--args is not valid JSON: {}", e))?;
            if !value.is_object() {
                return Err("--args must be a JSON object".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Parsed `--preload` entries as `(name, path)`.
    pub fn preloads(&self) -> Vec<(String, PathBuf)> {
        self.preload
            .iter()
            .filter_map(|spec| parse_preload(spec).ok())
            .collect()
    }
}

/// Split a `NAME=PATH` preload spec.
pub fn parse_preload(spec: &str) -> Result<(String, PathBuf), String> {
    match spec.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("Invalid --preload '{}', expected NAME=PATH", spec)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            log_file: None,
            preload: Vec::new(),
            delimiter: None,
            skip_unknown_columns: false,
            call: None,
            args: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::parse_from([
            "tabscope",
            "--preload",
            "a=x.csv",
            "--preload",
            "b=y.json",
            "--call",
            "dataset_info",
            "--args",
            r#"{"name": "a"}"#,
        ]);
        assert_eq!(args.preload.len(), 2);
        assert_eq!(args.call.as_deref(), Some("dataset_info"));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_preload_parsing() {
        assert_eq!(
            parse_preload("sales=data/sales.csv").unwrap(),
            ("sales".to_string(), PathBuf::from("data/sales.csv"))
        );
        assert!(parse_preload("sales").is_err());
        assert!(parse_preload("=data.csv").is_err());

        let mut args = make_args();
        args.preload = vec!["broken".to_string()];
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_call_args() {
        let mut args = make_args();
        args.call = Some("dataset_info".to_string());
        args.args = Some("[1, 2]".to_string());
        assert!(args.validate().is_err());

        args.args = Some("{not json".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_delimiter() {
        let mut args = make_args();
        args.delimiter = Some(";;".to_string());
        assert!(args.validate().is_err());
        args.delimiter = Some(";".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
