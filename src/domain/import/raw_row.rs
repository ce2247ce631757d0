// ============================================================
// RAW ROW TYPES
// ============================================================
// Cells and rows as extracted from the uploaded file

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;

/// Source format of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Xlsx,
    Xls,
    Csv,
}

impl FromStr for FileFormat {
    type Err = AppError;

    fn from_str(hint: &str) -> Result<Self, Self::Err> {
        match hint.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "xlsx" => Ok(FileFormat::Xlsx),
            "xls" => Ok(FileFormat::Xls),
            "csv" => Ok(FileFormat::Csv),
            other => Err(AppError::ParseError(format!("unsupported-format: {}", other))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Xlsx => write!(f, "xlsx"),
            FileFormat::Xls => write!(f, "xls"),
            FileFormat::Csv => write!(f, "csv"),
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Build a cell from text, collapsing whitespace-only input to `Empty`
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Render the cell as trimmed text. Integral numbers drop the `.0`
    /// so phone numbers stored as numbers survive intact.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(text) => text.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }
}

/// One data line of the source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based physical line in the source file
    pub row_number: usize,

    /// Cells aligned with `ParsedSheet::headers`
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<CellValue>) -> Self {
        Self { row_number, cells }
    }

    pub fn cell(&self, column: usize) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

/// Result of extracting rows from an uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSheet {
    pub format: FileFormat,

    /// Unique, trimmed column labels in file order
    pub headers: Vec<String>,

    /// Non-blank data rows in file order
    pub rows: Vec<RawRow>,

    /// Blank lines dropped after the header
    pub discarded_blank_rows: usize,

    /// Rows that had non-empty cells beyond the header width
    pub truncated_rows: usize,

    /// SHA-256 of the uploaded bytes, hex encoded
    pub source_digest: String,
}

impl ParsedSheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hint_parsing() {
        assert_eq!("XLSX".parse::<FileFormat>().unwrap(), FileFormat::Xlsx);
        assert_eq!(".csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert!(matches!(
            "ods".parse::<FileFormat>(),
            Err(AppError::ParseError(msg)) if msg.starts_with("unsupported-format")
        ));
    }

    #[test]
    fn test_numeric_cell_as_text() {
        assert_eq!(CellValue::Number(11987654321.0).as_text(), "11987654321");
        assert_eq!(CellValue::Number(1500.5).as_text(), "1500.5");
        assert_eq!(CellValue::from_text("   "), CellValue::Empty);
    }
}
