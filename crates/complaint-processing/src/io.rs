//! CSV loading for spreadsheet exports.
//!
//! Every column is read as text. Identifiers such as barcodes must never
//! pass through float inference, and the pipeline does its own cleaning.

use crate::error::{ReconcileError, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const UTF8_BOM: char = '\u{feff}';

/// Guess the field separator from the header line.
pub fn detect_separator(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    let tabs = header_line.matches('\t').count();

    if tabs > commas && tabs > semicolons {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn sniff_separator(path: &Path) -> u8 {
    match std::fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            let header = text.lines().next().unwrap_or_default();
            detect_separator(header)
        }
        Err(_) => b',',
    }
}

fn text_reader_options(separator: u8, quote_char: Option<u8>) -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(quote_char)
                .with_encoding(CsvEncoding::LossyUtf8),
        )
}

/// Load a CSV file with every column as text.
///
/// Tries standard quoting first, then no quote handling, then a pre-cleaned
/// copy of the content.
pub fn load_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ReconcileError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let separator = sniff_separator(path);
    debug!(
        "Loading '{}' with separator '{}'",
        path.display(),
        separator as char
    );

    // Strategy 1: Standard loading with quote handling
    match text_reader_options(separator, Some(b'"'))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    match text_reader_options(separator, None)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    // Strategy 3: Pre-clean content
    let bytes = std::fs::read(path)?;
    let cleaned = clean_csv_content(&String::from_utf8_lossy(&bytes));
    let df = text_reader_options(separator, Some(b'"'))
        .into_reader_with_file_handle(Cursor::new(cleaned.into_bytes()))
        .finish()?;
    Ok(df)
}

/// Load an optional table; a missing or unreadable file yields `None`.
pub fn load_optional_table(path: Option<&Path>) -> Option<DataFrame> {
    let path = path?;
    match load_table(path) {
        Ok(df) => Some(df),
        Err(e) => {
            warn!(
                "Could not load '{}', continuing without it: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Collapse doubled quotes and drop blank lines and a leading byte-order mark.
fn clean_csv_content(content: &str) -> String {
    content
        .trim_start_matches(UTF8_BOM)
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_detect_separator() {
        assert_eq!(detect_separator("EAN,Lote,Sucursal"), b',');
        assert_eq!(detect_separator("EAN;Lote;Sucursal"), b';');
        assert_eq!(detect_separator("EAN\tLote\tSucursal"), b'\t');
        assert_eq!(detect_separator("EAN"), b',');
    }

    #[test]
    fn test_load_table_reads_everything_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "reclamos.csv", "EAN,Lote\n7790001000123,00012\n779,5\n");

        let df = load_table(&path).unwrap();
        assert_eq!(df.height(), 2);
        for column in df.get_columns() {
            assert_eq!(column.dtype(), &DataType::String);
        }
        let lots = crate::utils::column_to_strings(&df, "Lote").unwrap();
        assert_eq!(lots[0].as_deref(), Some("00012"));
    }

    #[test]
    fn test_load_table_semicolon_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "base.csv", "EAN;Razón social\n111;Lácteos SA\n");

        let df = load_table(&path).unwrap();
        assert_eq!(df.width(), 2);
        assert!(df.column("Razón social").is_ok());
    }

    #[test]
    fn test_load_table_missing_file() {
        let err = load_table("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_load_optional_table() {
        assert!(load_optional_table(None).is_none());
        assert!(load_optional_table(Some(Path::new("/nope/base.csv"))).is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "base.csv", "EAN\n1\n");
        assert_eq!(load_optional_table(Some(path.as_path())).unwrap().height(), 1);
    }

    #[test]
    fn test_clean_csv_content() {
        let cleaned = clean_csv_content("\u{feff}a,b\n\n\"\"x\"\",y\n");
        assert_eq!(cleaned, "a,b\n\"x\",y");
    }
}
