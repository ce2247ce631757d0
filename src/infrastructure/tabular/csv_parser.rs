// ============================================================
// CSV PARSER
// ============================================================
// Decode CSV bytes and split them into positioned cell rows

use csv::{ReaderBuilder, Trim};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use tracing::debug;

use super::GridRow;
use crate::domain::error::AppError;
use crate::domain::import::CellValue;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV reader with encoding and delimiter detection
#[derive(Debug, Default)]
pub struct CsvParser {
    /// Delimiter character; `None` means detect from content
    delimiter: Option<u8>,
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Read every record as a row of cells tagged with its 1-based start line
    pub fn read_grid(&self, bytes: &[u8]) -> Result<Vec<GridRow>, AppError> {
        let content = Self::decode(bytes);
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(&content));
        debug!(delimiter = %(delimiter as char), "Reading CSV content");

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let raw = content.as_bytes();
        let mut lines = LineCounter::default();
        let mut grid = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV record {}: {}", index + 1, e))
            })?;

            // The reader reports where skipped blank lines begin, not the record itself
            let offset = record
                .position()
                .map(|p| p.byte() as usize)
                .unwrap_or(lines.offset);
            let line = lines.line_at(raw, offset);
            let cells = record.iter().map(CellValue::from_text).collect();
            grid.push(GridRow { line, cells });
        }

        Ok(grid)
    }

    /// UTF-8 (BOM stripped) first, Windows-1252 as fallback
    fn decode(bytes: &[u8]) -> Cow<'_, str> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(content) => Cow::Borrowed(content),
            Err(_) => {
                debug!("CSV is not valid UTF-8, decoding as Windows-1252");
                let (content, _, _) = WINDOWS_1252.decode(bytes);
                content
            }
        }
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];

        let sample_lines: Vec<_> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(10)
            .collect();
        if sample_lines.is_empty() {
            return b',';
        }

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// Maps byte offsets to 1-based lines, scanning forward only
#[derive(Debug)]
struct LineCounter {
    offset: usize,
    line: usize,
}

impl Default for LineCounter {
    fn default() -> Self {
        Self { offset: 0, line: 1 }
    }
}

impl LineCounter {
    /// Line of the first content byte at or after `offset`
    fn line_at(&mut self, raw: &[u8], offset: usize) -> usize {
        let mut start = offset.clamp(self.offset, raw.len());
        while start < raw.len() && matches!(raw[start], b'\r' | b'\n') {
            start += 1;
        }

        self.line += raw[self.offset..start].iter().filter(|&&b| b == b'\n').count();
        self.offset = start;
        self.line
    }
}
