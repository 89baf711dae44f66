//! Schema reconciliation for loosely-named spreadsheet exports.
//!
//! This module provides:
//! - [`SemanticField`]: the closed set of fields the pipeline understands
//! - [`FieldSpec`] tables listing accepted spellings per field
//! - [`normalize_header`]: case, diacritic and separator folding
//! - [`ColumnResolver`]: maps field tables onto actual headers

mod fields;
mod normalize;
mod resolver;

pub use fields::{FieldSpec, SemanticField, complaint_field_specs, reference_field_specs};
pub use normalize::normalize_header;
pub use resolver::{ColumnMapping, ColumnResolver, FieldResolution};
