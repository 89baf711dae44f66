//! Aggregates, dashboard data and output files.
//!
//! - [`AggregateReporter`]: top-N rankings and distinct value lists
//! - [`DashboardView`]: the figures and lists a dashboard displays
//! - [`ReportGenerator`]: unified CSV export and JSON [`ProcessingReport`]s
//!
//! # Example
//!
//! ```rust,ignore
//! use complaint_processing::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("reclamos.csv", Some("base.csv"), &result);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("outputs"), None);
//! generator.write_report_to_file(&report, "reclamos")?;
//! ```

mod aggregate;
mod dashboard;
mod generator;

pub use aggregate::{AggregateReporter, RankedValue, Ranking};
pub use dashboard::{DashboardTotals, DashboardView, FilterOptions};
pub use generator::{ProcessingReport, ReportGenerator};
