use crate::config::{DEFAULT_OUTPUT_NAME, PipelineConfig};
use crate::joiner::JoinStats;
use crate::reporting::DashboardView;
use crate::schema::SemanticField;
use crate::temporal::TemporalStats;
use crate::types::{
    DERIVED_COLUMNS, OPEN_DATE_COLUMN, OPEN_TIME_COLUMN, PipelineResult, ProcessingSummary,
    ResolvedColumn, UnifiedTable,
};
use anyhow::Result;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

// ============================================================================
// Processing Report
// ============================================================================

/// Everything known about one run, for `--json` output and `--emit-report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    // Metadata
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub complaints_file: String,
    pub reference_file: Option<String>,
    /// Unified CSV, if written
    pub output_file: Option<String>,

    pub summary: ProcessingSummary,
    pub join_stats: JoinStats,
    pub temporal_stats: TemporalStats,

    // Schema
    pub resolved_columns: Vec<ResolvedColumn>,
    pub unresolved_fields: Vec<SemanticField>,

    pub dashboard: DashboardView,
}

/// Writes the unified table and JSON reports.
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator with custom output settings.
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    /// Path the unified CSV is written to.
    pub fn unified_csv_path(&self) -> PathBuf {
        let name = self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME);
        self.output_dir.join(format!("{}.csv", name))
    }

    /// Write the unified table as CSV.
    ///
    /// With `canonical_order` the columns follow the fixed canonical order,
    /// unresolved fields appear as empty columns and any other column is
    /// left out. Otherwise the table's own column order is kept.
    pub fn write_unified_csv(&self, table: &UnifiedTable, canonical_order: bool) -> Result<PathBuf> {
        let mut df = if canonical_order {
            Self::canonical_frame(table)?
        } else {
            table.df().clone()
        };

        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.unified_csv_path();
        let mut file = File::create(&output_path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df)?;

        info!(
            "Unified table saved: {} ({} rows, {} columns)",
            output_path.display(),
            df.height(),
            df.width()
        );
        Ok(output_path)
    }

    /// The canonical export layout: every semantic field, then the derived
    /// temporal columns.
    pub fn canonical_frame(table: &UnifiedTable) -> PolarsResult<DataFrame> {
        let height = table.height();
        let df = table.df();

        let names = SemanticField::ALL
            .iter()
            .map(|field| field.canonical_name())
            .chain(DERIVED_COLUMNS);

        let mut columns: Vec<Column> = Vec::with_capacity(SemanticField::ALL.len() + 3);
        for name in names {
            match df.column(name) {
                Ok(column) => columns.push(column.clone()),
                Err(_) => {
                    debug!("Emitting empty column '{}' in canonical export", name);
                    columns.push(Self::null_column(name, height));
                }
            }
        }
        DataFrame::new(columns)
    }

    fn null_column(name: &str, height: usize) -> Column {
        let dtype = match name {
            OPEN_DATE_COLUMN => DataType::Date,
            OPEN_TIME_COLUMN => DataType::Time,
            _ => DataType::String,
        };
        Series::full_null(name.into(), height, &dtype).into()
    }

    /// Build the processing report for a finished run.
    pub fn build_report(
        complaints_file: &str,
        reference_file: Option<&str>,
        result: &PipelineResult,
    ) -> ProcessingReport {
        let schema = result.unified.schema();
        ProcessingReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            complaints_file: complaints_file.to_string(),
            reference_file: reference_file.map(String::from),
            output_file: result
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
            summary: result.summary.clone(),
            join_stats: result.join_stats.clone(),
            temporal_stats: result.temporal_stats.clone(),
            resolved_columns: schema.resolved_columns(),
            unresolved_fields: schema.unresolved_fields(),
            dashboard: result.dashboard.clone(),
        }
    }

    /// Write a report to `<output_dir>/<base_name>_report.json`.
    pub fn write_report_to_file(
        &self,
        report: &ProcessingReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
