// ============================================================
// TABULAR FILE INFRASTRUCTURE
// ============================================================
// Turn uploaded bytes into a header row and data rows

mod csv_parser;
mod workbook_parser;

pub use csv_parser::CsvParser;
pub use workbook_parser::WorkbookParser;

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::domain::error::{AppError, Result, EMPTY_FILE};
use crate::domain::import::{CellValue, FileFormat, ImportConfig, ParsedSheet, RawRow};

/// A physical row before header detection
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// 1-based line in the source
    pub line: usize,
    pub cells: Vec<CellValue>,
}

impl GridRow {
    fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// Entry point for file extraction; pure, holds only settings
#[derive(Debug, Clone)]
pub struct TabularFileParser {
    max_rows: usize,
    csv_delimiter: Option<u8>,
}

impl Default for TabularFileParser {
    fn default() -> Self {
        Self {
            max_rows: ImportConfig::default().max_rows,
            csv_delimiter: None,
        }
    }
}

impl TabularFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        Ok(Self {
            max_rows: config.max_rows,
            csv_delimiter: config.csv_delimiter_byte()?,
        })
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Parse an upload. The first non-blank row is the header; blank rows
    /// are dropped; fewer than two non-blank rows is `empty-file`.
    pub fn parse(&self, bytes: &[u8], format: FileFormat) -> Result<ParsedSheet> {
        let grid = match format {
            FileFormat::Csv => {
                let parser = match self.csv_delimiter {
                    Some(delimiter) => CsvParser::new().with_delimiter(delimiter),
                    None => CsvParser::new(),
                };
                parser.read_grid(bytes)?
            }
            FileFormat::Xlsx | FileFormat::Xls => WorkbookParser::read_grid(bytes, format)?,
        };

        let sheet = self.assemble(format, grid, source_digest(bytes))?;
        info!(
            format = %sheet.format,
            columns = sheet.headers.len(),
            rows = sheet.row_count(),
            discarded_blank_rows = sheet.discarded_blank_rows,
            truncated_rows = sheet.truncated_rows,
            "Parsed upload"
        );
        Ok(sheet)
    }

    fn assemble(
        &self,
        format: FileFormat,
        grid: Vec<GridRow>,
        source_digest: String,
    ) -> Result<ParsedSheet> {
        let mut rows_iter = grid.into_iter().skip_while(GridRow::is_blank);

        let header_row = rows_iter
            .next()
            .ok_or_else(|| AppError::ParseError(EMPTY_FILE.to_string()))?;
        let headers = unique_headers(&header_row.cells);
        debug!(line = header_row.line, ?headers, "Detected header row");

        let mut rows = Vec::new();
        let mut discarded_blank_rows = 0;
        let mut truncated_rows = 0;
        for grid_row in rows_iter {
            if grid_row.is_blank() {
                discarded_blank_rows += 1;
                continue;
            }
            if rows.len() == self.max_rows {
                return Err(AppError::ParseError(format!(
                    "too-many-rows: more than {}",
                    self.max_rows
                )));
            }

            let mut cells = grid_row.cells;
            if cells.iter().skip(headers.len()).any(|c| !c.is_empty()) {
                truncated_rows += 1;
                debug!(line = grid_row.line, "Dropping cells beyond the header width");
            }
            // A row is kept even when all its content sat past the header
            cells.resize(headers.len(), CellValue::Empty);
            rows.push(RawRow::new(grid_row.line, cells));
        }

        if rows.is_empty() {
            return Err(AppError::ParseError(EMPTY_FILE.to_string()));
        }

        Ok(ParsedSheet {
            format,
            headers,
            rows,
            discarded_blank_rows,
            truncated_rows,
            source_digest,
        })
    }
}

/// Trimmed labels; blanks become "Column N" and repeats get " (2)", " (3)"…
fn unique_headers(cells: &[CellValue]) -> Vec<String> {
    let mut seen = HashSet::new();
    cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell.as_text() {
                text if text.is_empty() => format!("Column {}", idx + 1),
                text => text,
            };

            let mut label = base.clone();
            let mut counter = 2;
            while !seen.insert(label.clone()) {
                label = format!("{} ({})", base, counter);
                counter += 1;
            }
            label
        })
        .collect()
}

fn source_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
