//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tabscope.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".tabscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset loading settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Analysis engine settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Filter settings.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Optional file that receives a copy of every log line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

/// Dataset loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Delimiter used when a load request does not specify one.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Cell contents treated as missing values.
    #[serde(default = "default_null_markers")]
    pub null_markers: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            null_markers: default_null_markers(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_null_markers() -> Vec<String> {
    vec![
        "", "NA", "N/A", "n/a", "na", "null", "NULL", "None", "none", "NaN", "nan", "#N/A",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

/// Analysis engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Sample rows returned by `dataset_info`.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Sample rows included in the per-dataset resource view.
    #[serde(default = "default_view_sample_rows")]
    pub view_sample_rows: usize,

    /// Absolute correlation at which a pair is labeled strong.
    #[serde(default = "default_strong_correlation")]
    pub strong_correlation: f64,

    /// IQR multiplier for outlier fences.
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rows: default_sample_rows(),
            view_sample_rows: default_view_sample_rows(),
            strong_correlation: default_strong_correlation(),
            iqr_multiplier: default_iqr_multiplier(),
        }
    }
}

fn default_sample_rows() -> usize {
    5
}

fn default_view_sample_rows() -> usize {
    10
}

fn default_strong_correlation() -> f64 {
    0.7
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

/// What `filter_data` does with a condition naming an unknown column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownColumnPolicy {
    /// Fail with `ColumnNotFound`.
    #[default]
    Error,
    /// Ignore the condition.
    Skip,
}

/// Filter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub unknown_columns: UnknownColumnPolicy,
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Create missing parent directories of the output path.
    #[serde(default = "default_true")]
    pub create_parent_dirs: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            create_parent_dirs: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.loader.delimiter.len() != 1 {
            bail!(
                "[loader] delimiter must be a single character, got '{}'",
                self.loader.delimiter
            );
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref delimiter) = args.delimiter {
            self.loader.delimiter = delimiter.clone();
        }

        if let Some(ref log_file) = args.log_file {
            self.general.log_file = Some(log_file.display().to_string());
        }

        if args.skip_unknown_columns {
            self.filter.unknown_columns = UnknownColumnPolicy::Skip;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.loader.delimiter, ",");
        assert_eq!(config.analysis.sample_rows, 5);
        assert_eq!(config.analysis.view_sample_rows, 10);
        assert_eq!(config.filter.unknown_columns, UnknownColumnPolicy::Error);
        assert!(config.loader.null_markers.contains(&"NA".to_string()));
        assert!(config.export.create_parent_dirs);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
log_file = "tabscope.log"

[loader]
delimiter = ";"
max_file_size = 2048

[analysis]
strong_correlation = 0.8

[filter]
unknown_columns = "skip"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.log_file.as_deref(), Some("tabscope.log"));
        assert_eq!(config.loader.delimiter, ";");
        assert_eq!(config.loader.max_file_size, 2048);
        assert_eq!(config.analysis.strong_correlation, 0.8);
        assert_eq!(config.analysis.iqr_multiplier, 1.5);
        assert_eq!(config.filter.unknown_columns, UnknownColumnPolicy::Skip);
    }

    #[test]
    fn test_load_rejects_bad_delimiter() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        for bad in ["::", "", "\u{00a7}"] {
            std::fs::write(&path, format!("[loader]\ndelimiter = \"{}\"\n", bad)).unwrap();
            let err = Config::load(&path).unwrap_err();
            assert!(format!("{:#}", err).contains("single character"), "{}", bad);
        }

        std::fs::write(&path, "[loader]\ndelimiter = \"|\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().loader.delimiter, "|");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[loader]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[filter]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.loader.delimiter, ",");
    }
}
