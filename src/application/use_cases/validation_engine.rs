//! Validation Engine
//!
//! Applies the per-row rules under a committed mapping:
//! 1. every required field resolves to a non-empty value
//! 2. a mapped, non-empty email has `local@domain.tld` shape
//! 3. email/phone keys shared by several rows of the file flag all of them
//! 4. email/phone keys present in the repository snapshot flag the row
//!
//! Errors and duplicate flags are computed independently. The repository
//! snapshot is read once per pass; when it cannot be loaded, rule 4 is
//! skipped and the outcome is marked as within-file only.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::domain::import::{
    keys, CommittedMapping, DuplicateCheckMode, DuplicateFlag, MatchSource, MatchedField, RawRow,
    ValidationError, ValidationOutcome,
};
use crate::domain::lead::ExistingRecord;
use crate::domain::text_normalization::{email_key, phone_key};
use crate::infrastructure::db::LeadRepository;

pub const REQUIRED_FIELD_MISSING: &str = "required field missing";
pub const INVALID_EMAIL_FORMAT: &str = "invalid format";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    )
    .unwrap()
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Identity keys of the repository snapshot
#[derive(Debug, Default)]
pub struct ExistingIndex {
    emails: HashSet<String>,
    phones: HashSet<String>,
}

impl ExistingIndex {
    pub fn from_records(records: &[ExistingRecord]) -> Self {
        let mut index = Self::default();
        for record in records {
            if let Some(key) = record.email.as_deref().and_then(email_key) {
                index.emails.insert(key);
            }
            if let Some(key) = record.phone.as_deref().and_then(phone_key) {
                index.phones.insert(key);
            }
        }
        index
    }

    fn contains(&self, field: MatchedField, key: &str) -> bool {
        match field {
            MatchedField::Email => self.emails.contains(key),
            MatchedField::Phone => self.phones.contains(key),
        }
    }
}

/// Identity keys of one row
struct RowKeys {
    row_number: usize,
    email: Option<String>,
    phone: Option<String>,
}

impl RowKeys {
    fn get(&self, field: MatchedField) -> Option<&str> {
        match field {
            MatchedField::Email => self.email.as_deref(),
            MatchedField::Phone => self.phone.as_deref(),
        }
    }
}

/// Run all rules over `rows`. `existing == None` means the snapshot was unavailable.
pub fn validate_rows(
    rows: &[RawRow],
    mapping: &CommittedMapping,
    existing: Option<&ExistingIndex>,
) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut row_keys = Vec::with_capacity(rows.len());

    for row in rows {
        for key in mapping.required_keys() {
            if mapping.text(row, key).is_none() {
                errors.push(ValidationError {
                    row_number: row.row_number,
                    field_key: key.clone(),
                    message: REQUIRED_FIELD_MISSING.to_string(),
                });
            }
        }

        let email = mapping.text(row, keys::EMAIL);
        if let Some(email) = &email {
            if !is_valid_email(email) {
                errors.push(ValidationError {
                    row_number: row.row_number,
                    field_key: keys::EMAIL.to_string(),
                    message: INVALID_EMAIL_FORMAT.to_string(),
                });
            }
        }

        row_keys.push(RowKeys {
            row_number: row.row_number,
            email: email.as_deref().and_then(email_key),
            phone: mapping.text(row, keys::PHONE).as_deref().and_then(phone_key),
        });
    }

    let mut duplicates = BTreeSet::new();
    for field in [MatchedField::Email, MatchedField::Phone] {
        flag_within_file(&row_keys, field, &mut duplicates);
        if let Some(index) = existing {
            flag_existing(&row_keys, field, index, &mut duplicates);
        }
    }

    let duplicate_check = if existing.is_some() {
        DuplicateCheckMode::Full
    } else {
        DuplicateCheckMode::WithinFileOnly
    };

    ValidationOutcome {
        errors,
        duplicates: duplicates.into_iter().collect(),
        duplicate_check,
        warnings: Vec::new(),
    }
}

fn flag_within_file(rows: &[RowKeys], field: MatchedField, flags: &mut BTreeSet<DuplicateFlag>) {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for row in rows {
        if let Some(key) = row.get(field) {
            groups.entry(key).or_default().push(row.row_number);
        }
    }

    for row_numbers in groups.values().filter(|rows| rows.len() > 1) {
        for &row_number in row_numbers {
            flags.insert(DuplicateFlag {
                row_number,
                matched_against: MatchSource::WithinFile,
                matched_field: field,
            });
        }
    }
}

fn flag_existing(
    rows: &[RowKeys],
    field: MatchedField,
    index: &ExistingIndex,
    flags: &mut BTreeSet<DuplicateFlag>,
) {
    for row in rows {
        if row.get(field).is_some_and(|key| index.contains(field, key)) {
            flags.insert(DuplicateFlag {
                row_number: row.row_number,
                matched_against: MatchSource::ExistingRepository,
                matched_field: field,
            });
        }
    }
}

/// Validation against a fresh repository snapshot
#[derive(Debug, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Load the repository snapshot, then validate. Never fails: an
    /// unreachable repository degrades duplicate detection to the
    /// within-file rule.
    ///
    /// The snapshot is read exactly once per call and not kept afterwards.
    pub async fn validate(
        &self,
        rows: &[RawRow],
        mapping: &CommittedMapping,
        repository: &dyn LeadRepository,
    ) -> ValidationOutcome {
        let (index, warning) = match repository.list_existing().await {
            Ok(records) => {
                debug!(records = records.len(), "Loaded repository snapshot");
                (Some(ExistingIndex::from_records(&records)), None)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "Repository snapshot unavailable, checking duplicates within the file only"
                );
                (
                    None,
                    Some(format!(
                        "Existing leads could not be loaded ({}); \
                         duplicates were only checked within the file",
                        err
                    )),
                )
            }
        };

        let mut outcome = validate_rows(rows, mapping, index.as_ref());
        outcome.warnings.extend(warning);

        info!(
            rows = rows.len(),
            errors = outcome.errors.len(),
            invalid_rows = outcome.invalid_rows().len(),
            duplicate_rows = outcome.duplicate_rows().len(),
            degraded = outcome.is_degraded(),
            "Validation finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::column_mapper::ColumnMapper;
    use crate::domain::error::{AppError, Result};
    use crate::domain::import::{CellValue, FieldCatalog, ParsedSheet};
    use crate::domain::lead::{LeadId, LeadRecord};
    use crate::infrastructure::tabular::TabularFileParser;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn sheet(csv: &str) -> (ParsedSheet, CommittedMapping) {
        let sheet = TabularFileParser::new()
            .parse(csv.as_bytes(), "csv".parse().unwrap())
            .unwrap();
        let mapper = ColumnMapper::new(FieldCatalog::lead_defaults());
        let mapping = mapper.suggest(&sheet.headers);
        let committed = mapper.commit(&sheet.headers, &mapping).unwrap();
        (sheet, committed)
    }

    struct SnapshotRepo {
        records: Mutex<Option<Vec<ExistingRecord>>>,
        loads: AtomicUsize,
    }

    impl SnapshotRepo {
        fn new(records: Option<Vec<ExistingRecord>>) -> Self {
            Self {
                records: Mutex::new(records),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LeadRepository for SnapshotRepo {
        async fn create(&self, _record: &LeadRecord) -> Result<LeadId> {
            Err(AppError::Internal("read-only".to_string()))
        }

        async fn find_by_email(&self, _email: &str) -> Result<Option<ExistingRecord>> {
            Ok(None)
        }

        async fn find_by_phone(&self, _phone: &str) -> Result<Option<ExistingRecord>> {
            Ok(None)
        }

        async fn list_existing(&self) -> Result<Vec<ExistingRecord>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.records
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| AppError::DatabaseError("connection refused".to_string()))
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ana@x.com"));
        assert!(is_valid_email("ana.silva+crm@mail.empresa.com.br"));
        assert!(!is_valid_email("ana@x"));
        assert!(!is_valid_email("ana x@x.com"));
        assert!(!is_valid_email("anã@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn test_missing_name_is_the_only_error() {
        let (sheet, mapping) = sheet("Nome,Email\nAna,a@x.com\n ,b@x.com\nCaio,c@x.com\n");
        let outcome = validate_rows(&sheet.rows, &mapping, Some(&ExistingIndex::default()));

        assert_eq!(
            outcome.errors,
            vec![ValidationError {
                row_number: 3,
                field_key: "name".to_string(),
                message: REQUIRED_FIELD_MISSING.to_string(),
            }]
        );
        assert!(outcome.duplicates.is_empty());
    }

    #[test]
    fn test_row_can_collect_several_errors() {
        let (sheet, mapping) = sheet("Nome,Email\n,not-an-email\n");
        let outcome = validate_rows(&sheet.rows, &mapping, None);
        let fields: Vec<_> = outcome.errors.iter().map(|e| e.field_key.as_str()).collect();
        assert_eq!(fields, vec!["name", "email"]);
    }

    #[test]
    fn test_within_file_duplicates_are_symmetric_and_case_insensitive() {
        let (sheet, mapping) =
            sheet("Nome,Email\nAna,a@x.com\nBia,b@x.com\nAna 2,A@X.COM\n");
        let outcome = validate_rows(&sheet.rows, &mapping, Some(&ExistingIndex::default()));

        assert_eq!(
            outcome.duplicates,
            vec![
                DuplicateFlag {
                    row_number: 2,
                    matched_against: MatchSource::WithinFile,
                    matched_field: MatchedField::Email,
                },
                DuplicateFlag {
                    row_number: 4,
                    matched_against: MatchSource::WithinFile,
                    matched_field: MatchedField::Email,
                },
            ]
        );
    }

    #[test]
    fn test_phone_duplicates_compare_digits_only() {
        let (sheet, mapping) =
            sheet("Nome;Telefone\nAna;(11) 98765-4321\nBia;11 98765 4321\nCaio;n/a\nDani;n/a\n");
        let outcome = validate_rows(&sheet.rows, &mapping, None);
        assert_eq!(
            outcome.duplicate_rows().into_iter().collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(outcome
            .duplicates
            .iter()
            .all(|d| d.matched_field == MatchedField::Phone));
    }

    #[test]
    fn test_invalid_rows_still_get_duplicate_flags() {
        let (sheet, mapping) = sheet("Nome,Email\n,a@x.com\nBia,a@x.com\n");
        let outcome = validate_rows(&sheet.rows, &mapping, None);
        assert_eq!(outcome.invalid_rows().into_iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!(outcome.duplicate_rows().into_iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_existing_repository_matches() {
        let (sheet, mapping) = sheet(
            "Nome,Email,Telefone\nAna,ANA@x.com,\nBia,b@x.com,+55 (11) 5555-0000\nCaio,c@x.com,\n",
        );
        let index = ExistingIndex::from_records(&[ExistingRecord {
            id: "1".to_string(),
            email: Some("ana@x.com".to_string()),
            phone: Some("551155550000".to_string()),
        }]);

        let outcome = validate_rows(&sheet.rows, &mapping, Some(&index));
        assert_eq!(
            outcome.duplicates,
            vec![
                DuplicateFlag {
                    row_number: 2,
                    matched_against: MatchSource::ExistingRepository,
                    matched_field: MatchedField::Email,
                },
                DuplicateFlag {
                    row_number: 3,
                    matched_against: MatchSource::ExistingRepository,
                    matched_field: MatchedField::Phone,
                },
            ]
        );
        assert_eq!(outcome.duplicate_check, DuplicateCheckMode::Full);
    }

    #[test]
    fn test_unmapped_email_column_is_not_validated() {
        let (sheet, _) = sheet("Nome,Email\nAna,broken\n");
        let mapper = ColumnMapper::new(FieldCatalog::lead_defaults());
        let mut mapping = mapper.suggest(&sheet.headers);
        mapping
            .set("Email", crate::domain::import::MappingTarget::Ignore)
            .unwrap();
        let committed = mapper.commit(&sheet.headers, &mapping).unwrap();

        let outcome = validate_rows(&sheet.rows, &committed, None);
        assert!(outcome.errors.is_empty());
        assert_eq!(sheet.rows[0].cells[1], CellValue::Text("broken".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_repository_degrades() {
        let (sheet, mapping) = sheet("Nome,Email\nAna,a@x.com\nBia,a@x.com\n");
        let repo = SnapshotRepo::new(None);

        let outcome = ValidationEngine::new()
            .validate(&sheet.rows, &mapping, &repo)
            .await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.duplicate_rows().len(), 2);
    }

    #[tokio::test]
    async fn test_each_pass_reads_a_fresh_snapshot() {
        let (sheet, mapping) = sheet("Nome,Email\nAna,a@x.com\n");
        let repo = SnapshotRepo::new(Some(Vec::new()));
        let engine = ValidationEngine::new();

        let first = engine.validate(&sheet.rows, &mapping, &repo).await;
        assert!(first.duplicates.is_empty());

        // Another session stores the same lead between two passes
        *repo.records.lock().unwrap() = Some(vec![ExistingRecord {
            id: "1".to_string(),
            email: Some("a@x.com".to_string()),
            phone: None,
        }]);

        let second = engine.validate(&sheet.rows, &mapping, &repo).await;
        assert_eq!(repo.loads.load(Ordering::SeqCst), 2);
        assert_eq!(
            second.duplicates,
            vec![DuplicateFlag {
                row_number: 2,
                matched_against: MatchSource::ExistingRepository,
                matched_field: MatchedField::Email,
            }]
        );
    }
}
