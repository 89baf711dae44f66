use crate::classifier::DuplicationReport;
use crate::joiner::JoinStats;
use crate::reporting::DashboardView;
use crate::schema::{ColumnMapping, SemanticField};
use crate::temporal::TemporalStats;
use crate::utils::column_to_strings;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

// ============================================================================
// Derived columns
// ============================================================================

/// Date part of the opening timestamp.
pub const OPEN_DATE_COLUMN: &str = "Fecha apertura";
/// Time-of-day part of the opening timestamp.
pub const OPEN_TIME_COLUMN: &str = "Hora apertura";
/// Year-month bucket of the opening timestamp.
pub const MONTH_COLUMN: &str = "Mes";
/// Month bucket for rows without a usable timestamp.
pub const NO_MONTH_LABEL: &str = "Sin mes";

/// Names the temporal split adds to the unified table.
pub const DERIVED_COLUMNS: [&str; 3] = [OPEN_DATE_COLUMN, OPEN_TIME_COLUMN, MONTH_COLUMN];

// ============================================================================
// Resolved schema
// ============================================================================

/// Which dataset a unified column was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Complaints,
    Reference,
}

impl DatasetKind {
    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::Complaints => "complaints",
            DatasetKind::Reference => "reference",
        }
    }
}

/// A semantic field together with the source column it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    pub field: SemanticField,
    pub dataset: DatasetKind,
    pub column: String,
}

/// Column resolution of both inputs, kept alongside the unified table.
///
/// `reference` is `None` when enrichment was skipped (no reference table, or
/// a reference table without a product identifier column).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSchema {
    pub complaint: ColumnMapping,
    pub reference: Option<ColumnMapping>,
}

impl ResolvedSchema {
    pub fn new(complaint: ColumnMapping, reference: Option<ColumnMapping>) -> Self {
        Self {
            complaint,
            reference,
        }
    }

    /// True when either dataset provides `field`.
    pub fn is_resolved(&self, field: SemanticField) -> bool {
        self.complaint.is_resolved(field)
            || self
                .reference
                .as_ref()
                .is_some_and(|mapping| mapping.is_resolved(field))
    }

    /// Fields neither dataset provides, in canonical order.
    pub fn unresolved_fields(&self) -> Vec<SemanticField> {
        SemanticField::ALL
            .iter()
            .copied()
            .filter(|field| !self.is_resolved(*field))
            .collect()
    }

    /// Every resolved source column, complaint side first.
    pub fn resolved_columns(&self) -> Vec<ResolvedColumn> {
        let complaint = self
            .complaint
            .resolved_fields()
            .map(|(field, column)| ResolvedColumn {
                field,
                dataset: DatasetKind::Complaints,
                column: column.to_string(),
            });
        let reference = self.reference.iter().flat_map(|mapping| {
            mapping.resolved_fields().map(|(field, column)| ResolvedColumn {
                field,
                dataset: DatasetKind::Reference,
                column: column.to_string(),
            })
        });
        complaint.chain(reference).collect()
    }
}

/// Whether a derived result could be computed from the fields a table has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable { missing: Vec<SemanticField> },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

// ============================================================================
// Unified table
// ============================================================================

/// The complaint table enriched with reference data.
///
/// Columns of semantic fields carry their canonical header. Fields that were
/// not resolved have no column at all; [`UnifiedTable::is_available`] is the
/// way to tell "unresolved" apart from "resolved but blank".
#[derive(Debug, Clone)]
pub struct UnifiedTable {
    df: DataFrame,
    schema: ResolvedSchema,
}

impl UnifiedTable {
    pub fn new(df: DataFrame, schema: ResolvedSchema) -> Self {
        Self { df, schema }
    }

    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub(crate) fn df_mut(&mut self) -> &mut DataFrame {
        &mut self.df
    }

    pub fn into_df(self) -> DataFrame {
        self.df
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Column holding `field`, if the table has one.
    pub fn column_name(&self, field: SemanticField) -> Option<&'static str> {
        let name = field.canonical_name();
        self.has_column(name).then_some(name)
    }

    pub fn is_available(&self, field: SemanticField) -> bool {
        self.column_name(field).is_some()
    }

    /// Values of `field` as optional strings; `None` when the field has no column.
    pub fn field_values(&self, field: SemanticField) -> Option<Vec<Option<String>>> {
        let name = self.column_name(field)?;
        self.column_values(name)
    }

    /// Values of any column as optional strings; `None` when it is absent.
    pub fn column_values(&self, name: &str) -> Option<Vec<Option<String>>> {
        if !self.has_column(name) {
            return None;
        }
        match column_to_strings(&self.df, name) {
            Ok(values) => Some(values),
            Err(e) => {
                warn!("Could not read column '{}' as text: {}", name, e);
                None
            }
        }
    }
}

// ============================================================================
// Processing summary
// ============================================================================

/// Human-readable summary of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub complaint_rows: usize,
    pub reference_rows: usize,
    /// Always equal to `complaint_rows`.
    pub unified_rows: usize,

    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub duplicate_reference_rows: usize,
    pub enrichment_skipped: bool,

    /// Rows whose opening timestamp was present but could not be parsed.
    pub unparsed_timestamps: usize,

    pub notice_count: usize,
    pub alert_count: usize,

    /// Fields neither dataset provides.
    pub unresolved_fields: Vec<SemanticField>,

    /// Warnings and notes generated during the run.
    pub warnings: Vec<String>,
}

impl ProcessingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Share of complaint rows that found a reference row, in percent.
    pub fn match_percentage(&self) -> f32 {
        if self.complaint_rows == 0 {
            0.0
        } else {
            (self.matched_rows as f32 / self.complaint_rows as f32) * 100.0
        }
    }
}

// ============================================================================
// Pipeline result
// ============================================================================

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub unified: UnifiedTable,
    pub duplication: DuplicationReport,
    pub dashboard: DashboardView,
    pub join_stats: JoinStats,
    pub temporal_stats: TemporalStats,
    pub summary: ProcessingSummary,
    /// Unified CSV, when it was written.
    pub output_path: Option<PathBuf>,
    /// JSON report, when it was written.
    pub report_path: Option<PathBuf>,
}
