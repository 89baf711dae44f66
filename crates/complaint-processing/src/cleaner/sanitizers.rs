//! Cell sanitization for free-text columns.

use crate::utils::is_blank_or_marker;

/// Trim a free-text cell; blank and marker cells become `None`.
pub fn sanitize_text(value: &str) -> Option<String> {
    if is_blank_or_marker(value) {
        return None;
    }
    Some(value.trim().to_string())
}

/// Remove quote wrapping left behind by spreadsheet exports.
///
/// Handles `"""value"""`, `""value""`, `"value"` and `'value'`, repeatedly,
/// until nothing more is stripped.
pub(crate) fn deep_clean_quotes(value: &str) -> String {
    let mut cleaned = value.trim().to_string();

    // Bounded in case of pathological input.
    for _ in 0..10 {
        let stripped = if cleaned.starts_with("\"\"\"")
            && cleaned.ends_with("\"\"\"")
            && cleaned.len() > 6
        {
            cleaned[3..cleaned.len() - 3].trim().to_string()
        } else if cleaned.starts_with("\"\"") && cleaned.ends_with("\"\"") && cleaned.len() > 4 {
            cleaned[2..cleaned.len() - 2].trim().to_string()
        } else if cleaned.starts_with('"') && cleaned.ends_with('"') && cleaned.len() > 2 {
            cleaned[1..cleaned.len() - 1].trim().to_string()
        } else if cleaned.starts_with('\'') && cleaned.ends_with('\'') && cleaned.len() > 2 {
            cleaned[1..cleaned.len() - 1].trim().to_string()
        } else {
            break;
        };
        cleaned = stripped;
    }

    cleaned
}
