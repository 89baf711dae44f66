//! Custom error types for the complaint reconciliation pipeline.
//!
//! Only two situations abort a run: the complaint dataset has no resolvable
//! product identifier column, or it has no columns at all. Everything else
//! (missing optional fields, unparsable cells, an absent reference table)
//! degrades locally and never reaches this type.
//!
//! Errors are serializable so that a front end can display them as
//! `{ "code": ..., "message": ... }` objects.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the reconciliation pipeline.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A field the pipeline cannot run without could not be resolved.
    #[error("Required field '{field}' not found in {dataset} dataset")]
    MissingRequiredField { field: String, dataset: String },

    /// Dataset has no columns to work with.
    #[error("Dataset '{0}' is empty")]
    EmptyDataset(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing the unified table or the report failed.
    #[error("Failed to write output: {0}")]
    OutputFailed(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReconcileError>,
    },
}

impl ReconcileError {
    /// Shorthand for a missing required field.
    pub fn missing_field(field: impl Into<String>, dataset: impl Into<String>) -> Self {
        ReconcileError::MissingRequiredField {
            field: field.into(),
            dataset: dataset.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReconcileError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            Self::EmptyDataset(_) => "EMPTY_DATASET",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::OutputFailed(_) => "OUTPUT_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the error is caused by the input data rather than by the
    /// environment (disk, serialization, bugs).
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::MissingRequiredField { .. } | Self::EmptyDataset(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for ReconcileError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReconcileError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReconcileError::Polars(e).with_context(context))
    }
}
