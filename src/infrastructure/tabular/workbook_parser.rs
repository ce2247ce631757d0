// ============================================================
// WORKBOOK PARSER
// ============================================================
// Extract the first worksheet of an XLSX/XLS upload as cell rows

use calamine::{Data, Range, Reader, Xls, Xlsx};
use std::fmt;
use std::io::{Cursor, Read, Seek};
use tracing::debug;

use super::GridRow;
use crate::domain::error::AppError;
use crate::domain::import::{CellValue, FileFormat};

pub struct WorkbookParser;

impl WorkbookParser {
    /// Read the first worksheet. Formatting, formulas and merged cells are
    /// not interpreted; only the cached cell values are used.
    pub fn read_grid(bytes: &[u8], format: FileFormat) -> Result<Vec<GridRow>, AppError> {
        let cursor = Cursor::new(bytes);
        let range = match format {
            FileFormat::Xlsx => {
                let mut workbook: Xlsx<_> = Xlsx::new(cursor).map_err(|e| {
                    AppError::ParseError(format!("Failed to open Excel file: {}", e))
                })?;
                first_worksheet(&mut workbook)?
            }
            FileFormat::Xls => {
                let mut workbook: Xls<_> = Xls::new(cursor).map_err(|e| {
                    AppError::ParseError(format!("Failed to open Excel file: {}", e))
                })?;
                first_worksheet(&mut workbook)?
            }
            FileFormat::Csv => {
                return Err(AppError::Internal(
                    "CSV content routed to the workbook parser".to_string(),
                ))
            }
        };

        Ok(grid_from_range(&range))
    }
}

fn first_worksheet<RS, R>(workbook: &mut R) -> Result<Range<Data>, AppError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: fmt::Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read Excel range: {}", e)))
}

fn grid_from_range(range: &Range<Data>) -> Vec<GridRow> {
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    debug!(
        first_row = first_row + 1,
        height = range.height(),
        width = range.width(),
        "Reading worksheet range"
    );

    range
        .rows()
        .enumerate()
        .map(|(offset, cells)| GridRow {
            line: first_row + offset + 1,
            cells: cells.iter().map(cell_value).collect(),
        })
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Float(value) => CellValue::Number(*value),
        Data::String(value) => CellValue::from_text(value),
        other => CellValue::from_text(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_value(&Data::Int(42)), CellValue::Number(42.0));
        assert_eq!(
            cell_value(&Data::String("  Ana ".to_string())),
            CellValue::Text("Ana".to_string())
        );
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::Text("true".to_string()));
    }

    #[test]
    fn test_grid_from_range_uses_sheet_offset() {
        let mut range = Range::new((2, 0), (3, 1));
        range.set_value((2, 0), Data::String("Nome".to_string()));
        range.set_value((2, 1), Data::String("Telefone".to_string()));
        range.set_value((3, 0), Data::String("Ana".to_string()));
        range.set_value((3, 1), Data::Float(11987654321.0));

        let grid = grid_from_range(&range);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].line, 3);
        assert_eq!(grid[1].line, 4);
        assert_eq!(grid[1].cells[1].as_text(), "11987654321");
    }

    #[test]
    fn test_garbage_bytes_are_a_parse_error() {
        let result = WorkbookParser::read_grid(b"not a workbook", FileFormat::Xlsx);
        assert!(matches!(result, Err(AppError::ParseError(_))));
    }
}
