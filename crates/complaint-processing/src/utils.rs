//! Shared utilities for the reconciliation pipeline.

use polars::prelude::*;

// =============================================================================
// Missing Value Markers
// =============================================================================

/// Cell contents that spreadsheets and exports use to mean "no value".
pub const ERROR_MARKERS: [&str; 10] = [
    "error", "unknown", "n/a", "na", "null", "missing", "none", "#n/a", "nan", "-",
];

/// Check if a string is an error/missing value marker.
///
/// # Example
///
/// ```rust,ignore
/// use complaint_processing::utils::is_error_marker;
///
/// assert!(is_error_marker("N/A"));
/// assert!(is_error_marker(" nan "));
/// assert!(!is_error_marker("42"));
/// ```
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// True for empty, whitespace-only and marker cells.
pub fn is_blank_or_marker(s: &str) -> bool {
    s.trim().is_empty() || is_error_marker(s)
}

// =============================================================================
// Series Access
// =============================================================================

/// Read any Series as optional owned strings.
///
/// Non-string columns are cast first, so numeric identifiers come back in
/// their textual form.
pub fn series_to_strings(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let casted = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Read a DataFrame column as optional owned strings.
pub fn column_to_strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    series_to_strings(df.column(name)?.as_materialized_series())
}

/// Truncate a string to `max_len` characters, appending an ellipsis.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_error_marker() {
        assert!(is_error_marker("ERROR"));
        assert!(is_error_marker("N/A"));
        assert!(is_error_marker("  nan  "));
        assert!(is_error_marker("-"));
        assert!(!is_error_marker("42"));
        assert!(!is_error_marker("Lote A"));
    }

    #[test]
    fn test_is_blank_or_marker() {
        assert!(is_blank_or_marker(""));
        assert!(is_blank_or_marker("   "));
        assert!(is_blank_or_marker("NULL"));
        assert!(!is_blank_or_marker("S1"));
    }

    #[test]
    fn test_series_to_strings_casts_numbers() {
        let series = Series::new("ean".into(), &[Some(7790001_i64), None]);
        let values = series_to_strings(&series).unwrap();
        assert_eq!(values, vec![Some("7790001".to_string()), None]);
    }

    #[test]
    fn test_column_to_strings() {
        let df = df!["lote" => [Some("A"), None, Some("B")]].unwrap();
        let values = column_to_strings(&df, "lote").unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].as_deref(), Some("A"));
        assert!(values[1].is_none());
        assert!(column_to_strings(&df, "missing").is_err());
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("Código de sucursal", 10), "Código ...");
    }
}
