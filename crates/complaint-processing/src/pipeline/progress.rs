//! Progress reporting for the reconciliation pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use complaint_processing::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(complaints, Some(reference))?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the reconciliation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Validating configuration and inputs
    Initializing,
    /// Mapping loosely-named headers to semantic fields
    ResolvingColumns,
    /// Joining complaints with the product reference
    Joining,
    /// Splitting opening timestamps into date, time and month
    TemporalSplit,
    /// Detecting cross-location lot duplication
    Classifying,
    /// Computing rankings and dashboard figures
    Aggregating,
    /// Writing the unified table and reports
    WritingOutput,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl ProcessingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::ResolvingColumns => "Resolving Columns",
            Self::Joining => "Joining Datasets",
            Self::TemporalSplit => "Splitting Timestamps",
            Self::Classifying => "Classifying Duplicates",
            Self::Aggregating => "Aggregating",
            Self::WritingOutput => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run this stage accounts for (0.0 - 1.0).
    ///
    /// Weights of the working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::ResolvingColumns => 0.10,
            Self::Joining => 0.30,
            Self::TemporalSplit => 0.15,
            Self::Classifying => 0.15,
            Self::Aggregating => 0.10,
            Self::WritingOutput => 0.15,
            Self::Complete => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::ResolvingColumns => 0.05,
            Self::Joining => 0.15,
            Self::TemporalSplit => 0.45,
            Self::Classifying => 0.60,
            Self::Aggregating => 0.75,
            Self::WritingOutput => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,

    /// Optional detail, e.g. which dataset is being resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: ProcessingStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = f64::from(stage.base_progress())
            + f64::from(stage.weight()) * f64::from(stage_progress);
        // Rounded so a stage's end and the next stage's start compare equal.
        let progress = ((progress * 10_000.0).round() / 10_000.0) as f32;
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn with_sub_stage(
        stage: ProcessingStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: ProcessingStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: ProcessingStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline running on a
/// background thread can report to a front end.
///
/// # Example
///
/// ```rust,ignore
/// use complaint_processing::{ProgressReporter, ProgressUpdate};
///
/// struct StderrReporter;
///
/// impl ProgressReporter for StderrReporter {
///     fn report(&self, update: ProgressUpdate) {
///         eprintln!("{:>3.0}% {}", update.progress * 100.0, update.message);
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WORKING_STAGES: [ProcessingStage; 7] = [
        ProcessingStage::Initializing,
        ProcessingStage::ResolvingColumns,
        ProcessingStage::Joining,
        ProcessingStage::TemporalSplit,
        ProcessingStage::Classifying,
        ProcessingStage::Aggregating,
        ProcessingStage::WritingOutput,
    ];

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(ProcessingStage::Joining, 0.5, "Joining...");
        assert_eq!(update.stage, ProcessingStage::Joining);
        assert!(update.sub_stage.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.30).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_with_sub_stage() {
        let update = ProgressUpdate::with_sub_stage(
            ProcessingStage::ResolvingColumns,
            "reference",
            1.0,
            "Resolved reference columns",
        );
        assert_eq!(update.sub_stage.as_deref(), Some("reference"));
        assert!((update.progress - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_complete_and_failed() {
        let done = ProgressUpdate::complete("Done");
        assert_eq!(done.stage, ProcessingStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, ProcessingStage::Failed);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = WORKING_STAGES.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = 0.0;
        for stage in WORKING_STAGES {
            assert!(
                (stage.base_progress() - expected).abs() < 1e-6,
                "{:?} should start at {}",
                stage,
                expected
            );
            expected += stage.weight();
        }
    }

    #[test]
    fn test_stage_end_never_passes_next_start() {
        for pair in WORKING_STAGES.windows(2) {
            let end = ProgressUpdate::new(pair[0], 1.0, "end").progress;
            let start = ProgressUpdate::new(pair[1], 0.0, "start").progress;
            assert!(
                end <= start,
                "{:?} ends at {} after {:?} starts at {}",
                pair[0],
                end,
                pair[1],
                start
            );
        }
        let last = ProgressUpdate::new(ProcessingStage::WritingOutput, 1.0, "end").progress;
        assert!(last <= ProgressUpdate::complete("done").progress);
    }

    #[test]
    fn test_stage_json_values() {
        let expectations = [
            (ProcessingStage::ResolvingColumns, "\"resolving_columns\""),
            (ProcessingStage::TemporalSplit, "\"temporal_split\""),
            (ProcessingStage::WritingOutput, "\"writing_output\""),
            (ProcessingStage::Failed, "\"failed\""),
        ];
        for (stage, expected) in expectations {
            assert_eq!(serde_json::to_string(&stage).unwrap(), expected);
        }
    }

    #[test]
    fn test_closure_progress_reporter_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let reporter_clone = reporter.clone();
        std::thread::spawn(move || {
            reporter_clone.report(ProgressUpdate::new(ProcessingStage::Joining, 0.5, "bg"));
        })
        .join()
        .expect("Thread should not panic");
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
