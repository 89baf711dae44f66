//! Configuration types for the reconciliation pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of entries in the supplier and product rankings.
pub const DEFAULT_TOP_N: usize = 10;

/// Default minimum number of distinct locations that raises a notice.
pub const DEFAULT_NOTICE_THRESHOLD: usize = 2;

/// Default minimum number of distinct locations that raises an alert.
pub const DEFAULT_ALERT_THRESHOLD: usize = 3;

/// Label used for descriptions and suppliers absent from both tables.
pub const DEFAULT_UNCLASSIFIED_LABEL: &str = "No tipificado";

/// Default base name of the unified output file.
pub const DEFAULT_OUTPUT_NAME: &str = "informe_unificado";

/// Configuration for the reconciliation pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use complaint_processing::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .top_n(5)
///     .canonical_order(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of entries kept in each frequency ranking.
    /// Default: 10
    pub top_n: usize,

    /// Distinct-location count at which a (product, lot) becomes a notice.
    /// Default: 2
    pub notice_threshold: usize,

    /// Distinct-location count at which a (product, lot) becomes an alert.
    /// Default: 3
    pub alert_threshold: usize,

    /// Sentinel written into description/supplier when neither table has one.
    /// Default: "No tipificado"
    pub unclassified_label: String,

    /// Output directory for the unified table and reports.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, uses "informe_unificado".
    /// Default: None
    pub output_name: Option<String>,

    /// Write the unified table in the fixed canonical column order.
    /// Default: false
    pub canonical_order: bool,

    /// Whether to write a JSON processing report next to the table.
    /// Default: false
    pub generate_reports: bool,

    /// Whether to save the unified table to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            notice_threshold: DEFAULT_NOTICE_THRESHOLD,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            unclassified_label: DEFAULT_UNCLASSIFIED_LABEL.to_string(),
            output_dir: PathBuf::from("output"),
            output_name: None,
            canonical_order: false,
            generate_reports: false,
            save_to_disk: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Base name of the unified output file.
    pub fn output_file_stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidTopN(self.top_n));
        }

        // A single location can never be a cross-location duplicate.
        if self.notice_threshold < 2 || self.alert_threshold <= self.notice_threshold {
            return Err(ConfigValidationError::InvalidThresholds {
                notice: self.notice_threshold,
                alert: self.alert_threshold,
            });
        }

        if self.unclassified_label.trim().is_empty() {
            return Err(ConfigValidationError::EmptyUnclassifiedLabel);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid top-N size: {0} (must be at least 1)")]
    InvalidTopN(usize),

    #[error(
        "Invalid duplication thresholds: notice={notice}, alert={alert} (need 2 <= notice < alert)"
    )]
    InvalidThresholds { notice: usize, alert: usize },

    #[error("Unclassified label must not be blank")]
    EmptyUnclassifiedLabel,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    top_n: Option<usize>,
    notice_threshold: Option<usize>,
    alert_threshold: Option<usize>,
    unclassified_label: Option<String>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    canonical_order: Option<bool>,
    generate_reports: Option<bool>,
    save_to_disk: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set how many entries each ranking keeps.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Set the distinct-location count that raises a notice.
    pub fn notice_threshold(mut self, threshold: usize) -> Self {
        self.notice_threshold = Some(threshold);
        self
    }

    /// Set the distinct-location count that raises an alert.
    pub fn alert_threshold(mut self, threshold: usize) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }

    /// Set the sentinel used for unclassified descriptions and suppliers.
    pub fn unclassified_label(mut self, label: impl Into<String>) -> Self {
        self.unclassified_label = Some(label.into());
        self
    }

    /// Set the output directory for the unified table and reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Write the unified table in the fixed canonical column order.
    pub fn canonical_order(mut self, canonical: bool) -> Self {
        self.canonical_order = Some(canonical);
        self
    }

    /// Enable or disable the JSON processing report.
    pub fn generate_reports(mut self, generate: bool) -> Self {
        self.generate_reports = Some(generate);
        self
    }

    /// Enable or disable saving the unified table to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
            notice_threshold: self.notice_threshold.unwrap_or(DEFAULT_NOTICE_THRESHOLD),
            alert_threshold: self.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD),
            unclassified_label: self
                .unclassified_label
                .unwrap_or_else(|| DEFAULT_UNCLASSIFIED_LABEL.to_string()),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
            output_name: self.output_name,
            canonical_order: self.canonical_order.unwrap_or(false),
            generate_reports: self.generate_reports.unwrap_or(false),
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
