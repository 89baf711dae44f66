//! Column resolution: maps semantic fields onto the headers a file actually has.

use super::fields::{FieldSpec, SemanticField};
use super::normalize::normalize_header;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of resolving one semantic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldResolution {
    /// The field maps to `column`; `candidate` is the spelling that matched.
    Resolved { column: String, candidate: String },
    /// No candidate matched any header.
    Unresolved,
}

impl FieldResolution {
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Resolved { column, .. } => Some(column),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Result of resolving a whole field table against one dataset.
///
/// Entries keep the order of the field table they were built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    entries: Vec<(SemanticField, FieldResolution)>,
}

impl ColumnMapping {
    /// Actual column name for `field`, if it was resolved.
    pub fn get(&self, field: SemanticField) -> Option<&str> {
        self.resolution(field).and_then(FieldResolution::column)
    }

    /// Resolution entry for `field`; `None` if the field was not part of the table.
    pub fn resolution(&self, field: SemanticField) -> Option<&FieldResolution> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, resolution)| resolution)
    }

    pub fn is_resolved(&self, field: SemanticField) -> bool {
        self.get(field).is_some()
    }

    /// Resolved fields with their source column, in table order.
    pub fn resolved_fields(&self) -> impl Iterator<Item = (SemanticField, &str)> {
        self.entries
            .iter()
            .filter_map(|(field, resolution)| resolution.column().map(|c| (*field, c)))
    }

    /// Fields that no candidate matched, in table order.
    pub fn unresolved_fields(&self) -> Vec<SemanticField> {
        self.entries
            .iter()
            .filter(|(_, resolution)| !resolution.is_resolved())
            .map(|(field, _)| *field)
            .collect()
    }

    /// Whether `column` was claimed by any field.
    pub fn claims_column(&self, column: &str) -> bool {
        self.resolved_fields().any(|(_, c)| c == column)
    }

    pub fn entries(&self) -> &[(SemanticField, FieldResolution)] {
        &self.entries
    }
}

/// Resolver for loosely-named headers.
pub struct ColumnResolver;

impl ColumnResolver {
    /// Resolve every spec in `specs` against `columns`.
    ///
    /// For each field the candidates are tried in order; the first candidate
    /// whose normalized form equals a normalized header wins. When several
    /// headers normalize to the same text, the left-most one is used.
    /// Unmatched fields are reported as [`FieldResolution::Unresolved`];
    /// whether that is fatal is up to the caller.
    pub fn resolve<S: AsRef<str>>(columns: &[S], specs: &[FieldSpec]) -> ColumnMapping {
        let normalized: Vec<(String, &str)> = columns
            .iter()
            .map(|c| (normalize_header(c.as_ref()), c.as_ref()))
            .collect();

        let entries = specs
            .iter()
            .map(|spec| {
                let resolution = Self::resolve_field(&normalized, spec);
                match &resolution {
                    FieldResolution::Resolved { column, candidate } => {
                        debug!("Resolved {} -> '{}' (via '{}')", spec.field, column, candidate);
                    }
                    FieldResolution::Unresolved => {
                        debug!("Could not resolve {}", spec.field);
                    }
                }
                (spec.field, resolution)
            })
            .collect();

        ColumnMapping { entries }
    }

    fn resolve_field(normalized: &[(String, &str)], spec: &FieldSpec) -> FieldResolution {
        for candidate in spec.candidates {
            let wanted = normalize_header(candidate);
            if wanted.is_empty() {
                continue;
            }
            if let Some((_, original)) = normalized.iter().find(|(n, _)| *n == wanted) {
                return FieldResolution::Resolved {
                    column: (*original).to_string(),
                    candidate: (*candidate).to_string(),
                };
            }
        }
        FieldResolution::Unresolved
    }
}
