//! Left join of the complaint log with the product reference table.
//!
//! Both inputs are resolved independently; the join key is the product
//! identifier after [`normalize_code`]. Every complaint row survives, in its
//! original order, and at most one reference row is attached to it.

use crate::cleaner::{CellKind, normalize_code, sanitize_series, sanitize_text};
use crate::error::{ReconcileError, Result, ResultExt};
use crate::schema::{
    ColumnMapping, ColumnResolver, SemanticField, complaint_field_specs, reference_field_specs,
};
use crate::types::{DERIVED_COLUMNS, ResolvedSchema, UnifiedTable};
use crate::utils::column_to_strings;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info, warn};

/// Counters describing one join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStats {
    pub complaint_rows: usize,
    pub reference_rows: usize,
    /// Reference rows ignored because an earlier row had the same identifier.
    pub duplicate_reference_rows: usize,
    /// Complaint rows that found a reference row.
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    /// No usable reference table; every row is unmatched.
    pub enrichment_skipped: bool,
    /// Complaint columns dropped because their name is reserved for a
    /// canonical or derived column.
    pub dropped_columns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct ReferenceEntry {
    description: Option<String>,
    supplier: Option<String>,
}

/// Reference rows keyed by normalized product identifier.
#[derive(Debug, Default)]
struct ReferenceIndex {
    entries: HashMap<String, ReferenceEntry>,
    duplicates: usize,
}

impl ReferenceIndex {
    fn build(df: &DataFrame, mapping: &ColumnMapping, id_column: &str) -> Result<Self> {
        let ids = column_to_strings(df, id_column).context("Reading reference identifiers")?;
        let descriptions = Self::optional_text(df, mapping, SemanticField::Description)?;
        let suppliers = Self::optional_text(df, mapping, SemanticField::Supplier)?;

        let mut index = ReferenceIndex::default();
        for (row, id) in ids.iter().enumerate() {
            let Some(key) = id.as_deref().and_then(normalize_code) else {
                continue;
            };
            match index.entries.entry(key) {
                Entry::Occupied(_) => index.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(ReferenceEntry {
                        description: descriptions.get(row).cloned().flatten(),
                        supplier: suppliers.get(row).cloned().flatten(),
                    });
                }
            }
        }
        Ok(index)
    }

    fn optional_text(
        df: &DataFrame,
        mapping: &ColumnMapping,
        field: SemanticField,
    ) -> Result<Vec<Option<String>>> {
        let Some(column) = mapping.get(field) else {
            return Ok(Vec::new());
        };
        Ok(column_to_strings(df, column)
            .context(format!("Reading reference column '{}'", column))?
            .into_iter()
            .map(|v| v.and_then(|s| sanitize_text(&s)))
            .collect())
    }

    fn get(&self, key: Option<&str>) -> Option<&ReferenceEntry> {
        key.and_then(|k| self.entries.get(k))
    }
}

/// Joins complaints with reference data into a [`UnifiedTable`].
pub struct DatasetJoiner;

impl DatasetJoiner {
    /// Build the unified table.
    ///
    /// Fails only when the complaint table has no columns or no product
    /// identifier column. A missing reference table, or one without an
    /// identifier column, skips enrichment: descriptions and suppliers then
    /// come from the complaints themselves or fall back to
    /// `unclassified_label`.
    pub fn join(
        complaints: &DataFrame,
        reference: Option<&DataFrame>,
        unclassified_label: &str,
    ) -> Result<(UnifiedTable, JoinStats)> {
        if complaints.width() == 0 {
            return Err(ReconcileError::EmptyDataset("complaints".to_string()));
        }

        let complaint_columns: Vec<String> = complaints
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let complaint_mapping = ColumnResolver::resolve(&complaint_columns, &complaint_field_specs());

        let id_column = complaint_mapping
            .get(SemanticField::ProductId)
            .ok_or_else(|| {
                ReconcileError::missing_field(SemanticField::ProductId.key(), "complaints")
            })?
            .to_string();

        let mut stats = JoinStats {
            complaint_rows: complaints.height(),
            reference_rows: reference.map(DataFrame::height).unwrap_or(0),
            ..Default::default()
        };

        let (reference_mapping, index) = match reference {
            Some(df) => Self::prepare_reference(df)?,
            None => {
                info!("No reference table supplied, skipping enrichment");
                (None, ReferenceIndex::default())
            }
        };
        stats.enrichment_skipped = reference_mapping.is_none();
        stats.duplicate_reference_rows = index.duplicates;

        let product_ids: Vec<Option<String>> = column_to_strings(complaints, &id_column)
            .context("Reading complaint identifiers")?
            .into_iter()
            .map(|v| v.and_then(|s| normalize_code(&s)))
            .collect();

        let matches: Vec<Option<&ReferenceEntry>> = product_ids
            .iter()
            .map(|id| index.get(id.as_deref()))
            .collect();
        stats.matched_rows = matches.iter().filter(|m| m.is_some()).count();
        stats.unmatched_rows = stats.complaint_rows - stats.matched_rows;

        let mut columns: Vec<Column> = Vec::with_capacity(complaint_columns.len() + 2);
        let mut has_description = false;
        let mut has_supplier = false;

        for name in &complaint_columns {
            let field = complaint_mapping
                .resolved_fields()
                .find(|(_, column)| column == name)
                .map(|(field, _)| field);

            match field {
                Some(SemanticField::ProductId) => {
                    columns.push(
                        Series::new(
                            SemanticField::ProductId.canonical_name().into(),
                            product_ids.clone(),
                        )
                        .into(),
                    );
                }
                Some(SemanticField::Description) => {
                    has_description = true;
                    columns.push(Self::merged_column(
                        complaints,
                        Some(name),
                        &matches,
                        SemanticField::Description,
                        unclassified_label,
                    )?);
                }
                Some(SemanticField::Supplier) => {
                    has_supplier = true;
                    columns.push(Self::merged_column(
                        complaints,
                        Some(name),
                        &matches,
                        SemanticField::Supplier,
                        unclassified_label,
                    )?);
                }
                Some(field) => {
                    let series = complaints.column(name)?.as_materialized_series();
                    let cleaned = sanitize_series(
                        series,
                        CellKind::for_field(field),
                        field.canonical_name(),
                    )?;
                    columns.push(cleaned.into());
                }
                None if Self::is_reserved(name) => {
                    warn!(
                        "Dropping complaint column '{}': name is reserved for a unified column",
                        name
                    );
                    stats.dropped_columns.push(name.clone());
                }
                None => {
                    let series = complaints.column(name)?.as_materialized_series();
                    columns.push(sanitize_series(series, CellKind::Text, name)?.into());
                }
            }
        }

        if !has_description {
            columns.push(Self::merged_column(
                complaints,
                None,
                &matches,
                SemanticField::Description,
                unclassified_label,
            )?);
        }
        if !has_supplier {
            columns.push(Self::merged_column(
                complaints,
                None,
                &matches,
                SemanticField::Supplier,
                unclassified_label,
            )?);
        }

        let df = DataFrame::new(columns).context("Building unified table")?;
        debug_assert_eq!(df.height(), stats.complaint_rows);

        info!(
            "Joined {} complaint rows: {} matched, {} unmatched",
            stats.complaint_rows, stats.matched_rows, stats.unmatched_rows
        );

        let schema = ResolvedSchema::new(complaint_mapping, reference_mapping);
        Ok((UnifiedTable::new(df, schema), stats))
    }

    /// Resolve and index the reference table. Returns no mapping when the
    /// table cannot be used for enrichment.
    fn prepare_reference(df: &DataFrame) -> Result<(Option<ColumnMapping>, ReferenceIndex)> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mapping = ColumnResolver::resolve(&columns, &reference_field_specs());

        let Some(id_column) = mapping.get(SemanticField::ProductId) else {
            warn!("Reference table has no product identifier column, skipping enrichment");
            return Ok((None, ReferenceIndex::default()));
        };

        let index = ReferenceIndex::build(df, &mapping, id_column)?;
        if index.duplicates > 0 {
            warn!(
                "Reference table has {} duplicate identifier rows, keeping the first of each",
                index.duplicates
            );
        }
        debug!("Indexed {} reference products", index.entries.len());
        Ok((Some(mapping), index))
    }

    /// Description or supplier column: reference value, else complaint
    /// value, else the unclassified label.
    fn merged_column(
        complaints: &DataFrame,
        complaint_column: Option<&str>,
        matches: &[Option<&ReferenceEntry>],
        field: SemanticField,
        unclassified_label: &str,
    ) -> Result<Column> {
        let own: Vec<Option<String>> = match complaint_column {
            Some(name) => column_to_strings(complaints, name)?
                .into_iter()
                .map(|v| v.and_then(|s| sanitize_text(&s)))
                .collect(),
            None => vec![None; matches.len()],
        };

        let values: Vec<String> = matches
            .iter()
            .copied()
            .zip(own)
            .map(|(entry, own)| {
                let from_reference = entry.and_then(|e| match field {
                    SemanticField::Description => e.description.clone(),
                    _ => e.supplier.clone(),
                });
                from_reference
                    .or(own)
                    .unwrap_or_else(|| unclassified_label.to_string())
            })
            .collect();

        Ok(Series::new(field.canonical_name().into(), values).into())
    }

    fn is_reserved(name: &str) -> bool {
        SemanticField::ALL
            .iter()
            .any(|field| field.canonical_name() == name)
            || DERIVED_COLUMNS.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        column_to_strings(df, name).unwrap()
    }

    fn reference() -> DataFrame {
        df![
            "ean" => ["111", "222", "111"],
            "Descripcion" => ["Leche", "Yerba", "Leche duplicada"],
            "Razon_Social" => ["Lacteos SA", "Yerbatera SRL", "Otro"],
        ]
        .unwrap()
    }

    #[test]
    fn test_left_join_keeps_every_complaint_row() {
        let complaints = df![
            "EAN" => ["111", "333", "222", "111"],
            "Lote" => ["A", "B", "C", "A"],
        ]
        .unwrap();

        let (table, stats) = DatasetJoiner::join(&complaints, Some(&reference()), "No tipificado")
            .unwrap();

        assert_eq!(table.height(), 4);
        assert_eq!(stats.complaint_rows, 4);
        assert_eq!(stats.reference_rows, 3);
        assert_eq!(stats.duplicate_reference_rows, 1);
        assert_eq!(stats.matched_rows, 3);
        assert_eq!(stats.unmatched_rows, 1);
        assert!(!stats.enrichment_skipped);

        assert_eq!(
            text(table.df(), "Descripción"),
            vec![
                Some("Leche".to_string()),
                Some("No tipificado".to_string()),
                Some("Yerba".to_string()),
                Some("Leche".to_string()),
            ]
        );
        assert_eq!(
            text(table.df(), "Razón social")[0].as_deref(),
            Some("Lacteos SA")
        );
    }

    #[test]
    fn test_columns_are_renamed_to_canonical_headers() {
        let complaints = df![
            "ean" => ["111"],
            "Sucursal" => ["S1"],
            "Lote" => ["A"],
            "Observaciones" => ["frio"],
        ]
        .unwrap();

        let (table, _) = DatasetJoiner::join(&complaints, None, "No tipificado").unwrap();
        let names: Vec<String> = table
            .df()
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "EAN",
                "Código de sucursal",
                "Lote nro.",
                "Observaciones",
                "Descripción",
                "Razón social",
            ]
        );
    }

    #[test]
    fn test_identifier_artifacts_join_to_same_row() {
        let complaints = df![
            "EAN" => ["7790001000123.0", " 7790001000123 ", "7.790001000123e12"],
        ]
        .unwrap();
        let reference = df![
            "EAN" => ["7790001000123"],
            "Razón social" => ["Proveedor Uno"],
        ]
        .unwrap();

        let (table, stats) = DatasetJoiner::join(&complaints, Some(&reference), "No tipificado")
            .unwrap();
        assert_eq!(stats.matched_rows, 3);
        assert!(
            text(table.df(), "Razón social")
                .iter()
                .all(|v| v.as_deref() == Some("Proveedor Uno"))
        );
        assert!(
            text(table.df(), "EAN")
                .iter()
                .all(|v| v.as_deref() == Some("7790001000123"))
        );
    }

    #[test]
    fn test_unmatched_rows_keep_complaint_values() {
        let complaints = df![
            "EAN" => ["999", "999"],
            "Descripción" => [Some("Galletitas"), None],
        ]
        .unwrap();

        let (table, _) = DatasetJoiner::join(&complaints, Some(&reference()), "No tipificado")
            .unwrap();
        assert_eq!(
            text(table.df(), "Descripción"),
            vec![Some("Galletitas".to_string()), Some("No tipificado".to_string())]
        );
    }

    #[test]
    fn test_reference_value_wins_over_complaint_value() {
        let complaints = df![
            "EAN" => ["222"],
            "Descripción" => ["yerba vieja"],
        ]
        .unwrap();

        let (table, _) = DatasetJoiner::join(&complaints, Some(&reference()), "No tipificado")
            .unwrap();
        assert_eq!(text(table.df(), "Descripción")[0].as_deref(), Some("Yerba"));
    }

    #[test]
    fn test_missing_product_id_is_an_error() {
        let complaints = df!["Lote" => ["A"]].unwrap();
        let err = DatasetJoiner::join(&complaints, None, "No tipificado").unwrap_err();
        assert_eq!(err.error_code(), "MISSING_REQUIRED_FIELD");
    }

    #[test]
    fn test_empty_complaints_is_an_error() {
        let err = DatasetJoiner::join(&DataFrame::empty(), None, "No tipificado").unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_DATASET");
    }

    #[test]
    fn test_reference_without_identifier_skips_enrichment() {
        let complaints = df!["EAN" => ["111"]].unwrap();
        let reference = df!["Producto" => ["Leche"]].unwrap();

        let (table, stats) = DatasetJoiner::join(&complaints, Some(&reference), "Sin datos")
            .unwrap();
        assert!(stats.enrichment_skipped);
        assert_eq!(stats.matched_rows, 0);
        assert!(table.schema().reference.is_none());
        assert_eq!(text(table.df(), "Razón social")[0].as_deref(), Some("Sin datos"));
    }

    #[test]
    fn test_reserved_extra_columns_are_dropped() {
        let complaints = df![
            "EAN" => ["111"],
            "Mes" => ["enero"],
        ]
        .unwrap();

        let (table, stats) = DatasetJoiner::join(&complaints, None, "No tipificado").unwrap();
        assert_eq!(stats.dropped_columns, vec!["Mes".to_string()]);
        assert!(!table.has_column("Mes"));
    }

    #[test]
    fn test_location_codes_are_normalized() {
        let complaints = df![
            "EAN" => ["1", "1"],
            "Código de sucursal" => ["101.0", " 101"],
        ]
        .unwrap();

        let (table, _) = DatasetJoiner::join(&complaints, None, "No tipificado").unwrap();
        assert_eq!(
            text(table.df(), "Código de sucursal"),
            vec![Some("101".to_string()), Some("101".to_string())]
        );
    }
}
