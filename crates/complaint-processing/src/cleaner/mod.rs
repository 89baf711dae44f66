//! Cell-level cleaning applied before datasets are joined.
//!
//! This module provides:
//! - Free-text sanitization (trim, blank and marker cells become null)
//! - Canonicalization of product identifiers
//! - Light cleanup of label cells (lots, location codes)
//! - A column-level entry point that applies one rule to a whole Series

mod identifiers;
mod sanitizers;

pub use identifiers::{clean_label, normalize_code};
pub use sanitizers::sanitize_text;

use crate::schema::SemanticField;
use crate::utils::series_to_strings;
use polars::prelude::*;

/// How a column's cells are cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Trimmed text.
    Text,
    /// Identifier text: spreadsheet number artifacts are removed.
    Code,
    /// Free-form code such as a lot: only quotes and apostrophes are removed.
    Label,
}

impl CellKind {
    /// Cleaning rule for a semantic field.
    pub fn for_field(field: SemanticField) -> Self {
        match field {
            SemanticField::ProductId => CellKind::Code,
            SemanticField::Lot | SemanticField::LocationCode => CellKind::Label,
            _ => CellKind::Text,
        }
    }

    pub fn apply(&self, value: &str) -> Option<String> {
        match self {
            CellKind::Text => sanitize_text(value),
            CellKind::Code => normalize_code(value),
            CellKind::Label => clean_label(value),
        }
    }
}

/// Clean every cell of `series`, returning a String Series named `name`.
pub fn sanitize_series(series: &Series, kind: CellKind, name: &str) -> PolarsResult<Series> {
    let values: Vec<Option<String>> = series_to_strings(series)?
        .into_iter()
        .map(|v| v.and_then(|s| kind.apply(&s)))
        .collect();
    Ok(Series::new(name.into(), values))
}
