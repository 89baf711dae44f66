//! Frequency rankings and distinct-value summaries over the unified table.

use crate::schema::SemanticField;
use crate::types::{Availability, UnifiedTable};
use crate::utils::is_blank_or_marker;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One ranked value and how many rows carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedValue {
    pub value: String,
    pub count: usize,
}

/// Most frequent values of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub field: SemanticField,
    pub availability: Availability,
    pub entries: Vec<RankedValue>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Computes rankings and distinct counts.
pub struct AggregateReporter;

impl AggregateReporter {
    /// The `n` most frequent non-blank values of `field`.
    ///
    /// Counts are descending; equal counts keep the order in which values
    /// first appear in the table. An unresolved field yields an unavailable,
    /// empty ranking.
    pub fn top_n(table: &UnifiedTable, field: SemanticField, n: usize) -> Ranking {
        match table.field_values(field) {
            Some(values) => Ranking {
                field,
                availability: Availability::Available,
                entries: Self::rank_values(&values, n),
            },
            None => Ranking {
                field,
                availability: Availability::Unavailable {
                    missing: vec![field],
                },
                entries: Vec::new(),
            },
        }
    }

    /// Rank raw values; the building block of [`AggregateReporter::top_n`].
    pub fn rank_values(values: &[Option<String>], n: usize) -> Vec<RankedValue> {
        let mut first_seen: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for value in values.iter().flatten() {
            if is_blank_or_marker(value) {
                continue;
            }
            let value = value.trim();
            let count = counts.entry(value).or_insert(0);
            if *count == 0 {
                first_seen.push(value);
            }
            *count += 1;
        }

        let mut ranked: Vec<RankedValue> = first_seen
            .into_iter()
            .map(|value| RankedValue {
                value: value.to_string(),
                count: counts.get(value).copied().unwrap_or(0),
            })
            .collect();
        // Stable sort keeps first-seen order among ties.
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(n);
        ranked
    }

    /// Number of distinct non-blank values of `field`; 0 when unavailable.
    pub fn count_distinct(table: &UnifiedTable, field: SemanticField) -> usize {
        Self::distinct_values(table, field).len()
    }

    /// Sorted distinct non-blank values of `field`.
    pub fn distinct_values(table: &UnifiedTable, field: SemanticField) -> Vec<String> {
        table
            .column_name(field)
            .map(|name| Self::distinct_column_values(table, name))
            .unwrap_or_default()
    }

    /// Sorted distinct non-blank values of any column, e.g. the month bucket.
    pub fn distinct_column_values(table: &UnifiedTable, column: &str) -> Vec<String> {
        let Some(values) = table.column_values(column) else {
            return Vec::new();
        };
        values
            .iter()
            .flatten()
            .filter(|v| !is_blank_or_marker(v))
            .map(|v| v.trim().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
