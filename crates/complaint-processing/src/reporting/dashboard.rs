//! Derived data behind the complaint dashboard.
//!
//! The view holds only numbers, rankings and value lists. Rendering (charts,
//! HTML, spreadsheets) is left to whoever consumes the serialized view.

use super::aggregate::{AggregateReporter, Ranking};
use crate::classifier::{DuplicationReport, DuplicationSignal};
use crate::schema::SemanticField;
use crate::types::{Availability, MONTH_COLUMN, UnifiedTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Distinct values offered by the dashboard's filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Year-month buckets, including the no-month bucket when present.
    pub months: Vec<String>,
    pub sub_types: Vec<String>,
    pub quality_findings: Vec<String>,
    pub locations: Vec<String>,
}

/// Key figures of the dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTotals {
    pub complaints: usize,
    pub suppliers: usize,
    /// Distinct product descriptions.
    pub products: usize,
    pub notices: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub totals: DashboardTotals,
    pub top_suppliers: Ranking,
    /// Ranked by description, the label shown for a product.
    pub top_products: Ranking,
    pub duplication: Availability,
    pub notices: Vec<DuplicationSignal>,
    pub alerts: Vec<DuplicationSignal>,
    pub filters: FilterOptions,
}

impl DashboardView {
    /// Assemble the view from a unified table and its duplication report.
    pub fn build(table: &UnifiedTable, duplication: &DuplicationReport, top_n: usize) -> Self {
        let totals = DashboardTotals {
            complaints: table.height(),
            suppliers: AggregateReporter::count_distinct(table, SemanticField::Supplier),
            products: AggregateReporter::count_distinct(table, SemanticField::Description),
            notices: duplication.notice_count(),
            alerts: duplication.alert_count(),
        };

        let filters = FilterOptions {
            months: AggregateReporter::distinct_column_values(table, MONTH_COLUMN),
            sub_types: AggregateReporter::distinct_values(table, SemanticField::SubType),
            quality_findings: AggregateReporter::distinct_values(
                table,
                SemanticField::QualityFinding,
            ),
            locations: AggregateReporter::distinct_values(table, SemanticField::LocationCode),
        };

        debug!("Dashboard totals: {:?}", totals);

        Self {
            totals,
            top_suppliers: AggregateReporter::top_n(table, SemanticField::Supplier, top_n),
            top_products: AggregateReporter::top_n(table, SemanticField::Description, top_n),
            duplication: duplication.availability.clone(),
            notices: duplication.notices().cloned().collect(),
            alerts: duplication.alerts().cloned().collect(),
            filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DuplicationClassifier;
    use crate::joiner::DatasetJoiner;
    use crate::temporal::TemporalSplitter;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn build(df: &DataFrame, reference: Option<&DataFrame>) -> DashboardView {
        let (mut table, _) = DatasetJoiner::join(df, reference, "No tipificado").unwrap();
        TemporalSplitter::split(&mut table).unwrap();
        let report = DuplicationClassifier::default().classify(&table);
        DashboardView::build(&table, &report, 10)
    }

    #[test]
    fn test_dashboard_totals_and_rankings() {
        let complaints = df![
            "EAN" => ["1", "1", "1", "2", "3"],
            "Lote nro." => ["A", "A", "A", "B", ""],
            "Código de sucursal" => ["S1", "S2", "S3", "S1", "S2"],
            "Fecha/hora de apertura" => [
                "2024-03-01 10:00",
                "2025-03-02 11:00",
                "2025-03-05 12:00",
                "sin fecha",
                "2025-04-01 09:00",
            ],
        ]
        .unwrap();
        let reference = df![
            "EAN" => ["1", "2"],
            "Descripción" => ["Leche", "Pan"],
            "Razón social" => ["Lactea", "Panadera"],
        ]
        .unwrap();

        let view = build(&complaints, Some(&reference));

        assert_eq!(
            view.totals,
            DashboardTotals {
                complaints: 5,
                suppliers: 3,
                products: 3,
                notices: 0,
                alerts: 1,
            }
        );
        assert_eq!(view.top_suppliers.entries[0].value, "Lactea");
        assert_eq!(view.top_suppliers.entries[0].count, 3);
        assert_eq!(view.top_products.entries[0].value, "Leche");
        assert_eq!(view.alerts.len(), 1);
        assert!(view.notices.is_empty());
        assert_eq!(
            view.filters.months,
            vec!["2024-03", "2025-03", "2025-04", "Sin mes"]
        );
        assert_eq!(view.filters.locations, vec!["S1", "S2", "S3"]);
        assert!(view.filters.sub_types.is_empty());
    }

    #[test]
    fn test_dashboard_without_lot_field() {
        let complaints = df!["EAN" => ["1", "2"], "Sucursal" => ["S1", "S2"]].unwrap();
        let view = build(&complaints, None);

        assert_eq!(view.totals.complaints, 2);
        assert_eq!(view.totals.alerts, 0);
        assert!(!view.duplication.is_available());
        // Neither source has a supplier, so every row carries the label.
        assert_eq!(view.top_suppliers.entries[0].value, "No tipificado");
        assert_eq!(view.top_suppliers.entries[0].count, 2);
    }
}
