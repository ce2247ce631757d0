// ============================================================
// COLUMN MAPPING
// ============================================================
// Association between file columns and catalog field keys

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CellValue, RawRow};
use crate::domain::error::{AppError, Result};

/// Where a column's values go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum MappingTarget {
    Field(String),
    Ignore,
}

impl MappingTarget {
    pub fn field(key: &str) -> Self {
        MappingTarget::Field(key.to_string())
    }

    pub fn field_key(&self) -> Option<&str> {
        match self {
            MappingTarget::Field(key) => Some(key.as_str()),
            MappingTarget::Ignore => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub column: String,
    pub target: MappingTarget,
}

/// Editable mapping: exactly one entry per column, in header order.
/// A column points at no more than one field by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
}

impl ColumnMapping {
    /// Every column ignored
    pub fn unmapped(headers: &[String]) -> Self {
        Self {
            entries: headers
                .iter()
                .map(|column| MappingEntry {
                    column: column.clone(),
                    target: MappingTarget::Ignore,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Point a column at a field (or ignore it). Replaces any earlier choice.
    pub fn set(&mut self, column: &str, target: MappingTarget) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.column == column)
            .ok_or_else(|| AppError::MappingError(format!("unknown-column: {}", column)))?;
        entry.target = target;
        Ok(())
    }

    pub fn target(&self, column: &str) -> Option<&MappingTarget> {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .map(|e| &e.target)
    }

    pub fn field_for(&self, column: &str) -> Option<&str> {
        self.target(column).and_then(MappingTarget::field_key)
    }

    pub fn is_mapped(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.target.field_key() == Some(key))
    }
}

/// Validated, immutable mapping handed to validation and import.
/// Columns are resolved to positions in the parsed sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedMapping {
    mapping: ColumnMapping,
    columns_by_key: BTreeMap<String, Vec<usize>>,
    required_keys: Vec<String>,
}

impl CommittedMapping {
    pub(crate) fn new(
        mapping: ColumnMapping,
        columns_by_key: BTreeMap<String, Vec<usize>>,
        required_keys: Vec<String>,
    ) -> Self {
        Self {
            mapping,
            columns_by_key,
            required_keys,
        }
    }

    /// The editable mapping this snapshot was committed from
    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn required_keys(&self) -> &[String] {
        &self.required_keys
    }

    pub fn has(&self, key: &str) -> bool {
        self.columns_by_key.contains_key(key)
    }

    pub fn mapped_keys(&self) -> impl Iterator<Item = &str> {
        self.columns_by_key.keys().map(String::as_str)
    }

    /// First non-empty cell for `key` in column order
    pub fn cell<'r>(&self, row: &'r RawRow, key: &str) -> Option<&'r CellValue> {
        self.columns_by_key
            .get(key)?
            .iter()
            .filter_map(|&idx| row.cell(idx))
            .find(|cell| !cell.is_empty())
    }

    /// First non-empty trimmed value for `key` in column order
    pub fn text(&self, row: &RawRow, key: &str) -> Option<String> {
        self.cell(row, key).map(CellValue::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["Nome".to_string(), "Email".to_string(), "Email 2".to_string()]
    }

    #[test]
    fn test_set_replaces_previous_target() {
        let mut mapping = ColumnMapping::unmapped(&headers());
        mapping.set("Nome", MappingTarget::field("name")).unwrap();
        mapping.set("Nome", MappingTarget::field("company")).unwrap();
        assert_eq!(mapping.field_for("Nome"), Some("company"));
        assert!(!mapping.is_mapped("name"));

        mapping.set("Nome", MappingTarget::Ignore).unwrap();
        assert_eq!(mapping.field_for("Nome"), None);
    }

    #[test]
    fn test_set_unknown_column_fails() {
        let mut mapping = ColumnMapping::unmapped(&headers());
        let err = mapping.set("Telefone", MappingTarget::field("phone")).unwrap_err();
        assert_eq!(err, AppError::MappingError("unknown-column: Telefone".to_string()));
    }

    #[test]
    fn test_text_takes_first_non_empty_column() {
        let mut columns = BTreeMap::new();
        columns.insert("email".to_string(), vec![1, 2]);
        let committed =
            CommittedMapping::new(ColumnMapping::unmapped(&headers()), columns, Vec::new());

        let row = RawRow::new(
            2,
            vec![
                CellValue::from_text("Ana"),
                CellValue::Empty,
                CellValue::from_text(" ana@x.com "),
            ],
        );
        assert_eq!(committed.text(&row, "email").as_deref(), Some("ana@x.com"));
        assert_eq!(committed.text(&row, "phone"), None);
    }
}
