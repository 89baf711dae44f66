//! Header normalization.
//!
//! Two headers are considered the same column when their normalized forms are
//! equal. Normalization:
//! - trims and lower-cases
//! - strips diacritics (NFD decomposition, combining marks dropped)
//! - removes whitespace, underscores and periods

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Characters removed from headers after folding.
const SEPARATORS: [char; 2] = ['_', '.'];

/// Normalize a header (or a candidate spelling) for comparison.
///
/// # Example
///
/// ```rust,ignore
/// use complaint_processing::schema::normalize_header;
///
/// assert_eq!(normalize_header("Razón Social"), "razonsocial");
/// assert_eq!(normalize_header(" Lote nro. "), "lotenro");
/// ```
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !c.is_whitespace() && !SEPARATORS.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_spellings_converge() {
        assert_eq!(normalize_header("Razón Social"), "razonsocial");
        assert_eq!(normalize_header("razon_social"), "razonsocial");
        assert_eq!(normalize_header("RAZONSOCIAL"), "razonsocial");
        assert_eq!(normalize_header("  RAZÓN  SOCIAL "), "razonsocial");
    }

    #[test]
    fn test_strips_all_spanish_diacritics() {
        assert_eq!(normalize_header("áéíóúñü"), "aeiounu");
        assert_eq!(normalize_header("ÁÉÍÓÚÑÜ"), "aeiounu");
    }

    #[test]
    fn test_removes_separators() {
        assert_eq!(normalize_header("Lote nro."), "lotenro");
        assert_eq!(normalize_header("lote_nro"), "lotenro");
        assert_eq!(normalize_header("Código\tde\u{a0}sucursal"), "codigodesucursal");
    }

    #[test]
    fn test_keeps_other_punctuation() {
        assert_eq!(
            normalize_header("Fecha/hora de apertura"),
            "fecha/horadeapertura"
        );
    }

    #[test]
    fn test_lot_headers_stay_distinct() {
        assert_ne!(normalize_header("lote"), normalize_header("lote nro."));
    }

    #[test]
    fn test_idempotent() {
        for header in [
            "Número del caso",
            "Lote nro.",
            "EAN",
            "fecha_de_VENCIMIENTO",
            "İSTANBUL",
            "Şube KODU",
        ] {
            let once = normalize_header(header);
            assert_eq!(normalize_header(&once), once);
        }
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(normalize_header(""), "");
        assert_eq!(normalize_header("  . _ "), "");
    }

    #[test]
    fn test_marks_produced_by_lowercasing_are_stripped() {
        // 'İ' lower-cases to 'i' plus a combining dot above.
        assert_eq!(normalize_header("İSTANBUL"), "istanbul");
    }
}
