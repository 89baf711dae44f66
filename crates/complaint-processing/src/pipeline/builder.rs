//! The reconciliation pipeline and its builder.

use crate::classifier::{DuplicationClassifier, Thresholds};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{ReconcileError, Result};
use crate::joiner::DatasetJoiner;
use crate::pipeline::progress::{
    ClosureProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate,
};
use crate::reporting::{DashboardView, ReportGenerator};
use crate::temporal::TemporalSplitter;
use crate::types::{PipelineResult, ProcessingSummary};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Name used for the complaint input in reports when none is given.
const DEFAULT_COMPLAINTS_LABEL: &str = "complaints";

/// The complaint reconciliation pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use complaint_processing::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().top_n(5).save_to_disk(false).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(complaints, Some(reference))?;
///
/// println!("{} alerts", result.duplication.alert_count());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    reporter: ReportGenerator,
    classifier: DuplicationClassifier,
    complaints_label: String,
    reference_label: Option<String>,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline on a complaint table and an optional reference
    /// table.
    ///
    /// # Errors
    ///
    /// Fails when the complaint table has no columns or no product
    /// identifier column, or when writing output fails. A missing or
    /// unusable reference table is not an error.
    pub fn process(
        &self,
        complaints: DataFrame,
        reference: Option<DataFrame>,
    ) -> Result<PipelineResult> {
        match self.process_internal(complaints, reference) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(
        &self,
        complaints: DataFrame,
        reference: Option<DataFrame>,
    ) -> Result<PipelineResult> {
        let start_time = Instant::now();

        info!("Starting reconciliation pipeline...");
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Initializing,
            0.0,
            "Starting reconciliation pipeline...",
        ));

        if complaints.width() == 0 {
            return Err(ReconcileError::EmptyDataset(self.complaints_label.clone()));
        }
        debug!(
            "Complaints: {} rows x {} columns; reference: {}",
            complaints.height(),
            complaints.width(),
            reference
                .as_ref()
                .map(|df| format!("{} rows x {} columns", df.height(), df.width()))
                .unwrap_or_else(|| "none".to_string())
        );

        let mut summary = ProcessingSummary::new();

        // Step 1 + 2: Resolve columns and join
        self.report_progress(ProgressUpdate::with_sub_stage(
            ProcessingStage::ResolvingColumns,
            "complaints",
            0.0,
            "Resolving column names...",
        ));
        info!("Step 1: Resolving columns and joining datasets...");
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Joining,
            0.0,
            "Joining complaints with product reference...",
        ));

        let (mut unified, join_stats) = DatasetJoiner::join(
            &complaints,
            reference.as_ref(),
            &self.config.unclassified_label,
        )?;

        summary.complaint_rows = join_stats.complaint_rows;
        summary.reference_rows = join_stats.reference_rows;
        summary.unified_rows = unified.height();
        summary.matched_rows = join_stats.matched_rows;
        summary.unmatched_rows = join_stats.unmatched_rows;
        summary.duplicate_reference_rows = join_stats.duplicate_reference_rows;
        summary.enrichment_skipped = join_stats.enrichment_skipped;
        summary.unresolved_fields = unified.schema().unresolved_fields();

        if join_stats.enrichment_skipped {
            summary.add_warning(
                "No usable product reference table; descriptions and suppliers come from the complaints only",
            );
        }
        if join_stats.duplicate_reference_rows > 0 {
            summary.add_warning(format!(
                "{} duplicate product identifiers in the reference table were ignored",
                join_stats.duplicate_reference_rows
            ));
        }
        for column in &join_stats.dropped_columns {
            summary.add_warning(format!(
                "Complaint column '{}' was dropped: its name is reserved",
                column
            ));
        }
        if !summary.unresolved_fields.is_empty() {
            let names: Vec<&str> = summary.unresolved_fields.iter().map(|f| f.key()).collect();
            summary.add_warning(format!("Unresolved fields: {}", names.join(", ")));
        }

        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Joining,
            1.0,
            format!(
                "Joined {} rows ({} matched)",
                join_stats.complaint_rows, join_stats.matched_rows
            ),
        ));

        // Step 3: Temporal split
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::TemporalSplit,
            0.0,
            "Splitting opening timestamps...",
        ));
        info!("Step 2: Splitting opening timestamps...");
        let temporal_stats = TemporalSplitter::split(&mut unified)?;
        summary.unparsed_timestamps = temporal_stats.unparsed;
        if temporal_stats.unparsed > 0 {
            summary.add_warning(format!(
                "{} opening timestamps could not be parsed",
                temporal_stats.unparsed
            ));
        }

        // Step 4: Duplication classification
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Classifying,
            0.0,
            "Classifying cross-location duplicates...",
        ));
        info!("Step 3: Classifying duplicates...");
        let duplication = self.classifier.classify(&unified);
        summary.notice_count = duplication.notice_count();
        summary.alert_count = duplication.alert_count();
        if !duplication.availability.is_available() {
            summary.add_warning("Duplication classification unavailable: lot or location field missing");
        }

        // Step 5: Aggregates
        self.report_progress(ProgressUpdate::new(
            ProcessingStage::Aggregating,
            0.0,
            "Computing rankings...",
        ));
        info!("Step 4: Building dashboard view...");
        let dashboard = DashboardView::build(&unified, &duplication, self.config.top_n);

        // Step 6: Output
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        let mut result = PipelineResult {
            unified,
            duplication,
            dashboard,
            join_stats,
            temporal_stats,
            summary,
            output_path: None,
            report_path: None,
        };

        if self.config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                ProcessingStage::WritingOutput,
                0.0,
                "Writing unified table...",
            ));
            info!("Step 5: Writing output...");

            let path = self
                .reporter
                .write_unified_csv(&result.unified, self.config.canonical_order)
                .map_err(|e| ReconcileError::OutputFailed(e.to_string()))?;
            result.output_path = Some(path);

            if self.config.generate_reports {
                let report = ReportGenerator::build_report(
                    &self.complaints_label,
                    self.reference_label.as_deref(),
                    &result,
                );
                let path = self
                    .reporter
                    .write_report_to_file(&report, self.config.output_file_stem())
                    .map_err(|e| ReconcileError::OutputFailed(e.to_string()))?;
                result.report_path = Some(path);
            }
        } else {
            debug!("Skipping output (save_to_disk = false)");
            if self.config.generate_reports {
                warn!("Report generation requested but saving is disabled; no report written");
            }
        }

        result.summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Pipeline finished in {}ms: {} rows, {} alerts, {} notices",
            result.summary.duration_ms,
            result.summary.unified_rows,
            result.summary.alert_count,
            result.summary.notice_count
        );

        Ok(result)
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    complaints_label: Option<String>,
    reference_label: Option<String>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Names recorded for the inputs in generated reports, usually file paths.
    pub fn input_labels(
        mut self,
        complaints: impl Into<String>,
        reference: Option<impl Into<String>>,
    ) -> Self {
        self.complaints_label = Some(complaints.into());
        self.reference_label = reference.map(Into::into);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let reporter = ReportGenerator::from_config(&config);
        let classifier = DuplicationClassifier::new(Thresholds::new(
            config.notice_threshold,
            config.alert_threshold,
        ))
        .with_unclassified_label(config.unclassified_label.clone());

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            reporter,
            classifier,
            complaints_label: self
                .complaints_label
                .unwrap_or_else(|| DEFAULT_COMPLAINTS_LABEL.to_string()),
            reference_label: self.reference_label,
        })
    }
}
