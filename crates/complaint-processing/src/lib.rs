//! Complaint Reconciliation Library
//!
//! Joins a complaint log with a product reference table and flags product
//! lots that are reported from several locations, built with Rust and Polars.
//!
//! # Overview
//!
//! Both inputs are spreadsheet exports whose headers drift between versions
//! ("Razón Social", "razon_social", "RAZONSOCIAL", ...). The library:
//!
//! - **Resolves Columns**: maps loosely-named headers onto a fixed set of
//!   semantic fields, reporting which fields could not be found
//! - **Joins Datasets**: left-joins complaints to the reference on a
//!   normalized product identifier, keeping every complaint row
//! - **Splits Timestamps**: derives opening date, time and a year-month bucket
//! - **Classifies Duplication**: groups complaints by (product, lot) and
//!   counts distinct locations; two locations raise a notice, three or more
//!   an alert
//! - **Aggregates**: top-N supplier and product rankings and dashboard totals
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use complaint_processing::{Pipeline, PipelineConfig, io};
//!
//! let complaints = io::load_table("reclamos.csv")?;
//! let reference = io::load_optional_table(Some(Path::new("base.csv")));
//!
//! let config = PipelineConfig::builder()
//!     .top_n(5)
//!     .canonical_order(true)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(complaints, reference)?;
//!
//! for alert in result.duplication.alerts() {
//!     println!("{} / {}: {} locations", alert.product_id, alert.lot, alert.location_count);
//! }
//! ```
//!
//! # Degraded inputs
//!
//! Only the product identifier of the complaint log is required. Any other
//! missing field makes the features that need it report
//! [`Availability::Unavailable`] instead of failing, and a missing reference
//! table fills descriptions and suppliers from the complaints or with the
//! configured unclassified label.

pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod io;
pub mod joiner;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod session;
pub mod temporal;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use classifier::{
    DuplicationClassifier, DuplicationReport, DuplicationSignal, Severity, Thresholds,
};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{ReconcileError, Result as ReconcileResult, ResultExt};
pub use joiner::{DatasetJoiner, JoinStats};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, ProcessingStage, ProgressReporter,
    ProgressUpdate,
};
pub use reporting::{
    AggregateReporter, DashboardTotals, DashboardView, FilterOptions, ProcessingReport,
    RankedValue, Ranking, ReportGenerator,
};
pub use schema::{ColumnMapping, ColumnResolver, FieldSpec, SemanticField};
pub use session::{ProcessingSession, SessionId, SessionStore};
pub use temporal::{TemporalSplitter, TemporalStats};
pub use types::{
    Availability, DatasetKind, PipelineResult, ProcessingSummary, ResolvedColumn, ResolvedSchema,
    UnifiedTable,
};
