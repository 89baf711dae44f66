//! Cross-location duplication of complaints about the same product lot.
//!
//! A lot reported from one location is an isolated complaint. Reported from
//! several distinct locations it becomes a signal: a notice at the notice
//! threshold, an alert from the alert threshold upwards.

use crate::config::{
    DEFAULT_ALERT_THRESHOLD, DEFAULT_NOTICE_THRESHOLD, DEFAULT_UNCLASSIFIED_LABEL,
};
use crate::schema::SemanticField;
use crate::types::{Availability, UnifiedTable};
use crate::utils::is_blank_or_marker;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Distinct-location counts that trigger each severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub notice: usize,
    pub alert: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            notice: DEFAULT_NOTICE_THRESHOLD,
            alert: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(notice: usize, alert: usize) -> Self {
        Self { notice, alert }
    }

    /// Severity for a distinct-location count, if any.
    pub fn severity_for(&self, locations: usize) -> Option<Severity> {
        if locations >= self.alert {
            Some(Severity::Alert)
        } else if locations >= self.notice {
            Some(Severity::Notice)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Notice,
    Alert,
}

impl Severity {
    /// Label shown on dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Notice => "Aviso",
            Severity::Alert => "Alerta",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One (product, lot) group that crossed the notice threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicationSignal {
    pub product_id: String,
    pub lot: String,
    pub location_count: usize,
    pub severity: Severity,
    /// Distinct locations, sorted.
    pub locations: Vec<String>,
    /// Complaint rows in the group, including repeats from one location.
    pub complaint_count: usize,
    pub description: Option<String>,
    pub supplier: Option<String>,
}

/// Classified duplication signals, alerts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicationReport {
    pub availability: Availability,
    pub thresholds: Thresholds,
    pub signals: Vec<DuplicationSignal>,
    /// Rows skipped for lacking a lot or a product identifier.
    pub skipped_rows: usize,
}

impl DuplicationReport {
    fn unavailable(thresholds: Thresholds, missing: Vec<SemanticField>) -> Self {
        Self {
            availability: Availability::Unavailable { missing },
            thresholds,
            signals: Vec::new(),
            skipped_rows: 0,
        }
    }

    pub fn notices(&self) -> impl Iterator<Item = &DuplicationSignal> {
        self.by_severity(Severity::Notice)
    }

    pub fn alerts(&self) -> impl Iterator<Item = &DuplicationSignal> {
        self.by_severity(Severity::Alert)
    }

    pub fn notice_count(&self) -> usize {
        self.notices().count()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts().count()
    }

    fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &DuplicationSignal> {
        self.signals.iter().filter(move |s| s.severity == severity)
    }
}

#[derive(Default)]
struct GroupAccumulator {
    locations: BTreeSet<String>,
    complaint_count: usize,
    description: Option<String>,
    supplier: Option<String>,
}

/// Groups complaints by (product, lot) and labels cross-location repeats.
pub struct DuplicationClassifier {
    thresholds: Thresholds,
    unclassified_label: String,
}

impl Default for DuplicationClassifier {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl DuplicationClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            unclassified_label: DEFAULT_UNCLASSIFIED_LABEL.to_string(),
        }
    }

    /// Placeholder the joiner writes for missing descriptions and suppliers.
    ///
    /// A group reports it only when none of its rows has a real value.
    pub fn with_unclassified_label(mut self, label: impl Into<String>) -> Self {
        self.unclassified_label = label.into();
        self
    }

    /// Classify every (product, lot) group of `table`.
    ///
    /// Rows with no lot or no product identifier are never grouped. Blank
    /// location codes are not counted as a location. When the lot or the
    /// location field is unavailable the report is marked unavailable and
    /// carries no signals.
    pub fn classify(&self, table: &UnifiedTable) -> DuplicationReport {
        let missing: Vec<SemanticField> = [SemanticField::Lot, SemanticField::LocationCode]
            .into_iter()
            .filter(|field| !table.is_available(*field))
            .collect();
        if !missing.is_empty() {
            warn!(
                "Duplication classification unavailable, missing fields: {:?}",
                missing
            );
            return DuplicationReport::unavailable(self.thresholds, missing);
        }

        let (Some(products), Some(lots), Some(locations)) = (
            table.field_values(SemanticField::ProductId),
            table.field_values(SemanticField::Lot),
            table.field_values(SemanticField::LocationCode),
        ) else {
            return DuplicationReport::unavailable(
                self.thresholds,
                vec![SemanticField::ProductId],
            );
        };
        let descriptions = table.field_values(SemanticField::Description);
        let suppliers = table.field_values(SemanticField::Supplier);

        let mut groups: BTreeMap<(String, String), GroupAccumulator> = BTreeMap::new();
        let mut skipped_rows = 0;

        for row in 0..table.height() {
            let product = products[row].as_deref().filter(|v| !is_blank_or_marker(v));
            let lot = lots[row].as_deref().filter(|v| !is_blank_or_marker(v));
            let (Some(product), Some(lot)) = (product, lot) else {
                skipped_rows += 1;
                continue;
            };

            let group = groups
                .entry((product.to_string(), lot.to_string()))
                .or_default();
            group.complaint_count += 1;

            if let Some(location) = locations[row].as_deref().filter(|v| !is_blank_or_marker(v)) {
                group.locations.insert(location.to_string());
            }
            let placeholder = self.unclassified_label.as_str();
            keep_representative(&mut group.description, cell(&descriptions, row), placeholder);
            keep_representative(&mut group.supplier, cell(&suppliers, row), placeholder);
        }

        debug!(
            "Grouped {} rows into {} (product, lot) groups, skipped {}",
            table.height() - skipped_rows,
            groups.len(),
            skipped_rows
        );

        let mut signals: Vec<DuplicationSignal> = groups
            .into_iter()
            .filter_map(|((product_id, lot), group)| {
                let location_count = group.locations.len();
                let severity = self.thresholds.severity_for(location_count)?;
                Some(DuplicationSignal {
                    product_id,
                    lot,
                    location_count,
                    severity,
                    locations: group.locations.into_iter().collect(),
                    complaint_count: group.complaint_count,
                    description: group.description,
                    supplier: group.supplier,
                })
            })
            .collect();

        signals.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.location_count.cmp(&a.location_count))
                .then_with(|| a.product_id.cmp(&b.product_id))
                .then_with(|| a.lot.cmp(&b.lot))
        });

        let report = DuplicationReport {
            availability: Availability::Available,
            thresholds: self.thresholds,
            signals,
            skipped_rows,
        };
        info!(
            "Duplication classification: {} alerts, {} notices",
            report.alert_count(),
            report.notice_count()
        );
        report
    }
}

/// First real value of a group wins; the placeholder only fills a gap.
fn keep_representative(current: &mut Option<String>, candidate: Option<String>, placeholder: &str) {
    let Some(candidate) = candidate else {
        return;
    };
    let replace = match current.as_deref() {
        None => true,
        Some(existing) => existing == placeholder && candidate != placeholder,
    };
    if replace {
        *current = Some(candidate);
    }
}

fn cell(values: &Option<Vec<Option<String>>>, row: usize) -> Option<String> {
    values
        .as_ref()
        .and_then(|v| v.get(row).cloned().flatten())
        .filter(|v| !is_blank_or_marker(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joiner::DatasetJoiner;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn table(products: &[&str], lots: &[Option<&str>], locations: &[Option<&str>]) -> UnifiedTable {
        let df = df![
            "EAN" => products,
            "Lote nro." => lots,
            "Código de sucursal" => locations,
        ]
        .unwrap();
        DatasetJoiner::join(&df, None, "No tipificado").unwrap().0
    }

    fn classify(table: &UnifiedTable) -> DuplicationReport {
        DuplicationClassifier::default().classify(table)
    }

    #[test]
    fn test_two_locations_is_notice() {
        let t = table(&["P1", "P1"], &[Some("L1"), Some("L1")], &[Some("S1"), Some("S2")]);
        let report = classify(&t);

        assert_eq!(report.notice_count(), 1);
        assert_eq!(report.alert_count(), 0);
        let signal = &report.signals[0];
        assert_eq!(signal.location_count, 2);
        assert_eq!(signal.severity, Severity::Notice);
        assert_eq!(signal.locations, vec!["S1".to_string(), "S2".to_string()]);
    }

    #[test]
    fn test_repeated_location_does_not_escalate() {
        let t = table(
            &["P1", "P1", "P1"],
            &[Some("L1"), Some("L1"), Some("L1")],
            &[Some("S1"), Some("S2"), Some("S1")],
        );
        let report = classify(&t);

        assert_eq!(report.notice_count(), 1);
        assert_eq!(report.signals[0].location_count, 2);
        assert_eq!(report.signals[0].complaint_count, 3);
    }

    #[test]
    fn test_three_locations_is_alert() {
        let t = table(
            &["P1", "P1", "P1", "P1"],
            &[Some("L1"), Some("L1"), Some("L1"), Some("L1")],
            &[Some("S1"), Some("S2"), Some("S1"), Some("S3")],
        );
        let report = classify(&t);

        assert_eq!(report.alert_count(), 1);
        assert_eq!(report.notice_count(), 0);
        assert_eq!(report.signals[0].severity, Severity::Alert);
        assert_eq!(report.signals[0].location_count, 3);
    }

    #[test]
    fn test_single_location_is_excluded() {
        let t = table(&["P1", "P1"], &[Some("L1"), Some("L1")], &[Some("S1"), Some("S1")]);
        assert!(classify(&t).signals.is_empty());
    }

    #[test]
    fn test_empty_lots_are_never_grouped() {
        let t = table(
            &["P1", "P1", "P1"],
            &[None, Some(""), Some("  ")],
            &[Some("S1"), Some("S2"), Some("S3")],
        );
        let report = classify(&t);
        assert!(report.signals.is_empty());
        assert_eq!(report.skipped_rows, 3);
    }

    #[test]
    fn test_blank_locations_are_not_counted() {
        let t = table(
            &["P1", "P1", "P1"],
            &[Some("L1"), Some("L1"), Some("L1")],
            &[Some("S1"), None, Some(" ")],
        );
        assert!(classify(&t).signals.is_empty());
    }

    #[test]
    fn test_lots_are_scoped_per_product() {
        let t = table(
            &["P1", "P2"],
            &[Some("L1"), Some("L1")],
            &[Some("S1"), Some("S2")],
        );
        assert!(classify(&t).signals.is_empty());
    }

    #[test]
    fn test_ordering_alerts_first_then_count() {
        let t = table(
            &["B", "B", "A", "A", "C", "C", "C", "C", "C", "C", "C"],
            &[
                Some("1"), Some("1"),
                Some("1"), Some("1"),
                Some("9"), Some("9"), Some("9"),
                Some("2"), Some("2"), Some("2"), Some("2"),
            ],
            &[
                Some("S1"), Some("S2"),
                Some("S1"), Some("S2"),
                Some("S1"), Some("S2"), Some("S3"),
                Some("S1"), Some("S2"), Some("S3"), Some("S4"),
            ],
        );
        let report = classify(&t);
        let order: Vec<(&str, &str)> = report
            .signals
            .iter()
            .map(|s| (s.product_id.as_str(), s.lot.as_str()))
            .collect();
        assert_eq!(order, vec![("C", "2"), ("C", "9"), ("A", "1"), ("B", "1")]);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = table(
            &["P1", "P1", "P1"],
            &[Some("L1"), Some("L1"), Some("L1")],
            &[Some("S1"), Some("S2"), Some("S3")],
        );
        let report = DuplicationClassifier::new(Thresholds::new(2, 4)).classify(&t);
        assert_eq!(report.notice_count(), 1);
        assert_eq!(report.alert_count(), 0);
    }

    #[test]
    fn test_unavailable_without_lot_field() {
        let df = df![
            "EAN" => ["P1", "P1"],
            "Sucursal" => ["S1", "S2"],
        ]
        .unwrap();
        let (t, _) = DatasetJoiner::join(&df, None, "No tipificado").unwrap();
        let report = classify(&t);

        assert_eq!(
            report.availability,
            Availability::Unavailable {
                missing: vec![SemanticField::Lot]
            }
        );
        assert!(report.signals.is_empty());
    }

    #[test]
    fn test_signal_carries_description_and_supplier() {
        let df = df![
            "EAN" => ["P1", "P1"],
            "Lote" => ["L1", "L1"],
            "Sucursal" => ["S1", "S2"],
            "Descripción" => [None, Some("Yogur")],
        ]
        .unwrap();
        let (t, _) = DatasetJoiner::join(&df, None, "No tipificado").unwrap();
        let signal = &classify(&t).signals[0];

        // The first row only has the unclassified label; the real value wins.
        assert_eq!(signal.description.as_deref(), Some("Yogur"));
        assert_eq!(signal.supplier.as_deref(), Some("No tipificado"));
    }

    #[test]
    fn test_first_real_description_wins_over_later_ones() {
        let df = df![
            "EAN" => ["P1", "P1", "P1"],
            "Lote" => ["L1", "L1", "L1"],
            "Sucursal" => ["S1", "S2", "S3"],
            "Descripción" => [None, Some("Yogur"), Some("Yogur bebible")],
            "Razón social" => [Some("Lácteos SA"), None, Some("Otra SA")],
        ]
        .unwrap();
        let (t, _) = DatasetJoiner::join(&df, None, "Sin dato").unwrap();
        let signal = &DuplicationClassifier::default()
            .with_unclassified_label("Sin dato")
            .classify(&t)
            .signals[0];

        assert_eq!(signal.description.as_deref(), Some("Yogur"));
        assert_eq!(signal.supplier.as_deref(), Some("Lácteos SA"));
    }

    #[test]
    fn test_numeric_looking_lots_stay_distinct() {
        let t = table(&["P1", "P1"], &[Some("1E3"), Some("1000")], &[Some("S1"), Some("S2")]);
        let report = classify(&t);
        assert!(report.signals.is_empty());
        assert_eq!(report.skipped_rows, 0);
    }

    #[test]
    fn test_group_without_any_location_is_excluded() {
        let t = table(&["P1", "P1"], &[Some("L1"), Some("L1")], &[None, Some(" ")]);
        let report = classify(&t);
        assert_eq!(report.availability, Availability::Available);
        assert!(report.signals.is_empty());
        assert_eq!(report.skipped_rows, 0);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::Notice.to_string(), "Aviso");
        assert_eq!(Severity::Alert.label(), "Alerta");
        assert!(Severity::Alert > Severity::Notice);
    }
}
