// ============================================================
// VALIDATION FINDINGS
// ============================================================
// Row-scoped errors and duplicate flags produced by validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A rule violation on one row. A row is invalid iff at least one of these references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_number: usize,
    pub field_key: String,
    pub message: String,
}

/// What a duplicate row collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchSource {
    ExistingRepository,
    WithinFile,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::ExistingRepository => write!(f, "existing-repository"),
            MatchSource::WithinFile => write!(f, "within-file"),
        }
    }
}

/// Identity key that collided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedField {
    Email,
    Phone,
}

impl fmt::Display for MatchedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedField::Email => write!(f, "email"),
            MatchedField::Phone => write!(f, "phone"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DuplicateFlag {
    pub row_number: usize,
    pub matched_against: MatchSource,
    pub matched_field: MatchedField,
}

impl DuplicateFlag {
    pub fn describe(&self) -> String {
        format!("{} matches {}", self.matched_field, self.matched_against)
    }
}

/// How much of the duplicate detection actually ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateCheckMode {
    /// Within-file and existing-repository checks
    Full,
    /// Repository snapshot unavailable; within-file check only
    WithinFileOnly,
}

/// Everything one validation pass produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub errors: Vec<ValidationError>,
    pub duplicates: Vec<DuplicateFlag>,
    pub duplicate_check: DuplicateCheckMode,
    /// Non-fatal notices, e.g. degraded duplicate detection
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn invalid_rows(&self) -> BTreeSet<usize> {
        self.errors.iter().map(|e| e.row_number).collect()
    }

    pub fn duplicate_rows(&self) -> BTreeSet<usize> {
        self.duplicates.iter().map(|d| d.row_number).collect()
    }

    pub fn errors_for(&self, row_number: usize) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.row_number == row_number)
    }

    pub fn duplicates_for(&self, row_number: usize) -> impl Iterator<Item = &DuplicateFlag> {
        self.duplicates
            .iter()
            .filter(move |d| d.row_number == row_number)
    }

    pub fn is_degraded(&self) -> bool {
        self.duplicate_check == DuplicateCheckMode::WithinFileOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_source_serializes_kebab_case() {
        let json = serde_json::to_string(&MatchSource::ExistingRepository).unwrap();
        assert_eq!(json, "\"existing-repository\"");
        assert_eq!(MatchSource::WithinFile.to_string(), "within-file");
    }

    #[test]
    fn test_row_sets() {
        let outcome = ValidationOutcome {
            errors: vec![
                ValidationError {
                    row_number: 3,
                    field_key: "name".into(),
                    message: "required field missing".into(),
                },
                ValidationError {
                    row_number: 3,
                    field_key: "email".into(),
                    message: "invalid format".into(),
                },
            ],
            duplicates: vec![DuplicateFlag {
                row_number: 4,
                matched_against: MatchSource::WithinFile,
                matched_field: MatchedField::Phone,
            }],
            duplicate_check: DuplicateCheckMode::Full,
            warnings: Vec::new(),
        };

        assert_eq!(outcome.invalid_rows().into_iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(outcome.duplicate_rows().into_iter().collect::<Vec<_>>(), vec![4]);
        assert_eq!(outcome.errors_for(3).count(), 2);
        assert!(!outcome.is_degraded());
    }
}
