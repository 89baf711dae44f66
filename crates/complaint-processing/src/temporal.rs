//! Splitting of the opening timestamp into date, time and month bucket.
//!
//! Timestamps arrive as free text from spreadsheet exports, so several
//! layouts are accepted. Anything that does not parse becomes a null date,
//! a null time and the [`NO_MONTH_LABEL`] bucket; the row itself is kept.

use crate::error::{Result, ResultExt};
use crate::schema::SemanticField;
use crate::types::{MONTH_COLUMN, NO_MONTH_LABEL, OPEN_DATE_COLUMN, OPEN_TIME_COLUMN, UnifiedTable};
use crate::utils::is_blank_or_marker;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Date-and-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
];

/// Date-only layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%y"];

/// Spreadsheet serial dates count days from this epoch.
static SERIAL_EPOCH: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default());

/// Serial numbers in this range are read as spreadsheet dates (1954..2119).
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 20_000.0..=80_000.0;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2200;

/// Outcome of parsing one timestamp cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    pub date: NaiveDate,
    /// `None` for date-only inputs.
    pub time: Option<NaiveTime>,
}

/// Counters describing one split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalStats {
    /// False when the opening timestamp field is unresolved.
    pub source_available: bool,
    pub parsed: usize,
    /// Cells with a value that matched no accepted layout.
    pub unparsed: usize,
    /// Blank, null or marker cells.
    pub missing: usize,
    /// Expiration dates parsed, when that field is present.
    pub expiration_parsed: usize,
    pub expiration_unparsed: usize,
}

/// Parse an opening timestamp in any accepted layout.
pub fn parse_timestamp(value: &str) -> Option<ParsedTimestamp> {
    if is_blank_or_marker(value) {
        return None;
    }
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return plausible(dt.naive_local().date(), Some(dt.naive_local().time()));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format)
            && let Some(parsed) = plausible(dt.date(), Some(dt.time()))
        {
            return Some(parsed);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format)
            && let Some(parsed) = plausible(date, None)
        {
            return Some(parsed);
        }
    }

    parse_serial(value)
}

/// Parse a date, ignoring any time-of-day part.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    parse_timestamp(value).map(|parsed| parsed.date)
}

/// Year-month bucket of a date, or [`NO_MONTH_LABEL`].
pub fn month_bucket(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m").to_string(),
        None => NO_MONTH_LABEL.to_string(),
    }
}

/// Rejects two-digit years that `%Y` happily reads as year 25.
fn plausible(date: NaiveDate, time: Option<NaiveTime>) -> Option<ParsedTimestamp> {
    use chrono::Datelike;
    (MIN_YEAR..=MAX_YEAR)
        .contains(&date.year())
        .then_some(ParsedTimestamp { date, time })
}

fn parse_serial(value: &str) -> Option<ParsedTimestamp> {
    let serial: f64 = value.replace(',', ".").parse().ok()?;
    if !SERIAL_RANGE.contains(&serial) {
        return None;
    }

    let days = serial.trunc() as i64;
    let date = *SERIAL_EPOCH + Duration::days(days);
    let fraction = serial.fract();
    let time = if fraction > 0.0 {
        let seconds = (fraction * 86_400.0).round() as u32;
        NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)
    } else {
        None
    };
    plausible(date, time)
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

fn nanos_since_midnight(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1_000_000_000 + time.nanosecond() as i64
}

fn date_series(name: &str, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(days_since_epoch)).collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

fn time_series(name: &str, times: &[Option<NaiveTime>]) -> PolarsResult<Series> {
    let nanos: Vec<Option<i64>> = times.iter().map(|t| t.map(nanos_since_midnight)).collect();
    Series::new(name.into(), nanos).cast(&DataType::Time)
}

/// Adds the derived temporal columns to a unified table.
pub struct TemporalSplitter;

impl TemporalSplitter {
    /// Add date, time and month columns; parse the expiration date in place.
    ///
    /// Existing derived columns are replaced. When the opening timestamp is
    /// unresolved the columns are still added, all null and `Sin mes`.
    pub fn split(table: &mut UnifiedTable) -> Result<TemporalStats> {
        let height = table.height();
        let mut stats = TemporalStats::default();

        let (dates, times) = match table.field_values(SemanticField::OpenedAt) {
            Some(values) => {
                stats.source_available = true;
                let mut dates = Vec::with_capacity(height);
                let mut times = Vec::with_capacity(height);
                for value in &values {
                    let parsed = match value.as_deref() {
                        Some(v) if !is_blank_or_marker(v) => {
                            let parsed = parse_timestamp(v);
                            if parsed.is_some() {
                                stats.parsed += 1;
                            } else {
                                debug!("Unparsable opening timestamp: '{}'", v);
                                stats.unparsed += 1;
                            }
                            parsed
                        }
                        _ => {
                            stats.missing += 1;
                            None
                        }
                    };
                    dates.push(parsed.map(|p| p.date));
                    times.push(parsed.and_then(|p| p.time));
                }
                (dates, times)
            }
            None => {
                debug!("Opening timestamp unresolved, temporal columns will be empty");
                stats.missing = height;
                (vec![None; height], vec![None; height])
            }
        };

        let months: Vec<String> = dates.iter().map(|d| month_bucket(*d)).collect();

        let df = table.df_mut();
        df.with_column(date_series(OPEN_DATE_COLUMN, &dates)?)
            .context("Adding opening date column")?;
        df.with_column(time_series(OPEN_TIME_COLUMN, &times)?)
            .context("Adding opening time column")?;
        df.with_column(Series::new(MONTH_COLUMN.into(), months))
            .context("Adding month column")?;

        if let Some(values) = table.field_values(SemanticField::ExpirationDate) {
            let expirations: Vec<Option<NaiveDate>> = values
                .iter()
                .map(|v| v.as_deref().and_then(parse_date))
                .collect();
            for (raw, parsed) in values.iter().zip(&expirations) {
                match (raw.as_deref(), parsed) {
                    (_, Some(_)) => stats.expiration_parsed += 1,
                    (Some(v), None) if !is_blank_or_marker(v) => stats.expiration_unparsed += 1,
                    _ => {}
                }
            }
            let name = SemanticField::ExpirationDate.canonical_name();
            table
                .df_mut()
                .replace(name, date_series(name, &expirations)?)
                .context("Parsing expiration dates")?;
        }

        if stats.unparsed > 0 {
            info!(
                "{} of {} opening timestamps could not be parsed",
                stats.unparsed, height
            );
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joiner::DatasetJoiner;
    use crate::utils::column_to_strings;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_parse_iso_timestamp() {
        let parsed = parse_timestamp("2025-03-14 09:30:15").unwrap();
        assert_eq!(parsed.date, ymd(2025, 3, 14));
        assert_eq!(parsed.time, Some(hms(9, 30, 15)));

        let parsed = parse_timestamp("2025-03-14T09:30:00").unwrap();
        assert_eq!(parsed.time, Some(hms(9, 30, 0)));

        let parsed = parse_timestamp("2025-03-14 09:30").unwrap();
        assert_eq!(parsed.time, Some(hms(9, 30, 0)));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = parse_timestamp("2025-03-14 09:30:15.250").unwrap();
        assert_eq!(parsed.date, ymd(2025, 3, 14));
        assert_eq!(parsed.time.unwrap().second(), 15);
    }

    #[test]
    fn test_parse_day_first_timestamp() {
        let parsed = parse_timestamp("14/03/2025 18:05").unwrap();
        assert_eq!(parsed.date, ymd(2025, 3, 14));
        assert_eq!(parsed.time, Some(hms(18, 5, 0)));

        let parsed = parse_timestamp("02/01/2025 06:15 PM").unwrap();
        assert_eq!(parsed.date, ymd(2025, 1, 2));
        assert_eq!(parsed.time, Some(hms(18, 15, 0)));
    }

    #[test]
    fn test_parse_date_only() {
        let parsed = parse_timestamp("14/03/2025").unwrap();
        assert_eq!(parsed.date, ymd(2025, 3, 14));
        assert_eq!(parsed.time, None);

        assert_eq!(parse_date("2025-03-14"), Some(ymd(2025, 3, 14)));
        assert_eq!(parse_date("14/03/25"), Some(ymd(2025, 3, 14)));
    }

    #[test]
    fn test_parse_spreadsheet_serial() {
        // 45000 is 2023-03-15 in spreadsheet serial numbering.
        let parsed = parse_timestamp("45000.5").unwrap();
        assert_eq!(parsed.date, ymd(2023, 3, 15));
        assert_eq!(parsed.time, Some(hms(12, 0, 0)));

        assert_eq!(parse_timestamp("12"), None);
    }

    #[test]
    fn test_unparsable_values() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("ayer"), None);
        assert_eq!(parse_timestamp("31/02/2025"), None);
        assert_eq!(parse_timestamp("N/A"), None);
    }

    #[test]
    fn test_month_bucket_includes_year() {
        assert_eq!(month_bucket(Some(ymd(2024, 3, 1))), "2024-03");
        assert_eq!(month_bucket(Some(ymd(2025, 3, 1))), "2025-03");
        assert_eq!(month_bucket(None), "Sin mes");
    }

    #[test]
    fn test_split_adds_derived_columns() {
        let complaints = df![
            "EAN" => ["1", "2", "3"],
            "Fecha/hora de apertura" => [Some("2025-03-14 09:30:00"), Some("basura"), None],
            "Fecha de vencimiento" => [Some("30/06/2025"), Some("nunca"), None],
        ]
        .unwrap();
        let (mut table, _) = DatasetJoiner::join(&complaints, None, "No tipificado").unwrap();

        let stats = TemporalSplitter::split(&mut table).unwrap();
        assert!(stats.source_available);
        assert_eq!(stats.parsed, 1);
        assert_eq!(stats.unparsed, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.expiration_parsed, 1);
        assert_eq!(stats.expiration_unparsed, 1);

        let df = table.df();
        assert_eq!(df.height(), 3);
        assert_eq!(df.column(OPEN_DATE_COLUMN).unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column(OPEN_TIME_COLUMN).unwrap().dtype(), &DataType::Time);
        assert_eq!(df.column(OPEN_DATE_COLUMN).unwrap().null_count(), 2);
        assert_eq!(
            df.column("Fecha de vencimiento").unwrap().dtype(),
            &DataType::Date
        );

        let months = column_to_strings(df, MONTH_COLUMN).unwrap();
        assert_eq!(
            months,
            vec![
                Some("2025-03".to_string()),
                Some("Sin mes".to_string()),
                Some("Sin mes".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_without_timestamp_column() {
        let complaints = df!["EAN" => ["1", "2"]].unwrap();
        let (mut table, _) = DatasetJoiner::join(&complaints, None, "No tipificado").unwrap();

        let stats = TemporalSplitter::split(&mut table).unwrap();
        assert!(!stats.source_available);
        assert_eq!(stats.missing, 2);

        let months = column_to_strings(table.df(), MONTH_COLUMN).unwrap();
        assert!(months.iter().all(|m| m.as_deref() == Some("Sin mes")));
    }
}
