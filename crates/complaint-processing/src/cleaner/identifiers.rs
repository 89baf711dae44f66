//! Canonical form for code-like cells (product identifiers, lots, locations).
//!
//! Spreadsheet exports turn barcodes into floats (`7790001000123.0`), into
//! scientific notation (`7.790001000123E+12`) or force them to text with a
//! leading apostrophe. All of these must join to the same key.
//!
//! Lots and location codes are free-form labels: `1E3` and `1000` are
//! different lots, so only [`clean_label`] applies to them.

use super::sanitizers::deep_clean_quotes;
use crate::utils::is_blank_or_marker;
use once_cell::sync::Lazy;
use regex::Regex;

/// Integer followed by a forced decimal part made only of zeros: `123.0`, `123.`.
static FORCED_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.0*$").expect("Invalid regex: forced decimal"));

/// Scientific notation as written by spreadsheets: `7.79E+12`, `7.79e12`.
static SCIENTIFIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d+)?[eE]\+?\d+$").expect("Invalid regex: scientific notation")
});

/// Largest integer an f64 holds exactly (2^53).
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Normalize a code-like cell.
///
/// Returns `None` for blank and marker cells. Leading zeros are kept; only
/// artifacts that cannot be part of a real code are removed.
///
/// # Example
///
/// ```rust,ignore
/// use complaint_processing::cleaner::normalize_code;
///
/// assert_eq!(normalize_code(" 7790001000123.0 ").as_deref(), Some("7790001000123"));
/// assert_eq!(normalize_code("7.790001000123E+12").as_deref(), Some("7790001000123"));
/// ```
pub fn normalize_code(value: &str) -> Option<String> {
    let cleaned = clean_label(value)?;

    if let Some(caps) = FORCED_DECIMAL.captures(&cleaned) {
        return Some(caps[1].to_string());
    }

    if SCIENTIFIC.is_match(&cleaned)
        && let Some(expanded) = expand_scientific(&cleaned)
    {
        return Some(expanded);
    }

    Some(cleaned)
}

/// Trim a label cell and strip quote and text-forcing artifacts.
///
/// Numeric-looking labels are left as written.
pub fn clean_label(value: &str) -> Option<String> {
    if is_blank_or_marker(value) {
        return None;
    }

    let cleaned = deep_clean_quotes(value);
    let cleaned = cleaned.trim_start_matches('\'').trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.to_string())
}

/// Expand scientific notation when it denotes an exact integer.
fn expand_scientific(value: &str) -> Option<String> {
    let parsed = value.parse::<f64>().ok()?;
    if parsed.fract() != 0.0 || parsed > MAX_EXACT_FLOAT_INT {
        return None;
    }
    Some(format!("{:.0}", parsed))
}
