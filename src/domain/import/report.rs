// ============================================================
// IMPORT REPORT
// ============================================================
// Per-row outcomes of a batch commit and their totals

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::DuplicateCheckMode;
use crate::domain::lead::LeadId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeKind {
    Succeeded,
    SkippedDuplicate,
    SkippedInvalid,
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Succeeded => write!(f, "succeeded"),
            OutcomeKind::SkippedDuplicate => write!(f, "skipped-duplicate"),
            OutcomeKind::SkippedInvalid => write!(f, "skipped-invalid"),
            OutcomeKind::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    pub row_number: usize,
    pub outcome: OutcomeKind,
    pub detail: Option<String>,
    pub lead_id: Option<LeadId>,
}

impl RowOutcome {
    pub fn succeeded(row_number: usize, lead_id: LeadId) -> Self {
        Self {
            row_number,
            outcome: OutcomeKind::Succeeded,
            detail: None,
            lead_id: Some(lead_id),
        }
    }

    pub fn skipped(row_number: usize, outcome: OutcomeKind, detail: String) -> Self {
        Self {
            row_number,
            outcome,
            detail: Some(detail),
            lead_id: None,
        }
    }

    pub fn failed(row_number: usize, detail: String) -> Self {
        Self {
            row_number,
            outcome: OutcomeKind::Failed,
            detail: Some(detail),
            lead_id: None,
        }
    }
}

/// Result of a batch commit.
///
/// Counters are derived from `per_row` when the report is sealed, so
/// `total_rows == succeeded + skipped_duplicate + skipped_invalid + failed`
/// holds for every value of this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    total_rows: usize,
    succeeded: usize,
    skipped_duplicate: usize,
    skipped_invalid: usize,
    failed: usize,
    per_row: Vec<RowOutcome>,
    duplicate_check: DuplicateCheckMode,
    warnings: Vec<String>,
    source_digest: String,
    cancelled: bool,
    not_attempted: Vec<usize>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn skipped_duplicate(&self) -> usize {
        self.skipped_duplicate
    }

    pub fn skipped_invalid(&self) -> usize {
        self.skipped_invalid
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn per_row(&self) -> &[RowOutcome] {
        &self.per_row
    }

    pub fn outcome_for(&self, row_number: usize) -> Option<&RowOutcome> {
        self.per_row.iter().find(|o| o.row_number == row_number)
    }

    pub fn duplicate_check(&self) -> DuplicateCheckMode {
        self.duplicate_check
    }

    /// Duplicate detection ran without the repository snapshot
    pub fn is_reduced_confidence(&self) -> bool {
        self.duplicate_check == DuplicateCheckMode::WithinFileOnly
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn source_digest(&self) -> &str {
        &self.source_digest
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Rows never dispatched because the run was cancelled
    pub fn not_attempted(&self) -> &[usize] {
        &self.not_attempted
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// Fold state for building an `ImportReport` one row at a time
#[derive(Debug)]
pub struct ReportAccumulator {
    per_row: Vec<RowOutcome>,
    duplicate_check: DuplicateCheckMode,
    warnings: Vec<String>,
    source_digest: String,
    started_at: DateTime<Utc>,
}

impl ReportAccumulator {
    pub fn new(
        source_digest: String,
        duplicate_check: DuplicateCheckMode,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            per_row: Vec::new(),
            duplicate_check,
            warnings,
            source_digest,
            started_at: Utc::now(),
        }
    }

    pub fn push(mut self, outcome: RowOutcome) -> Self {
        self.per_row.push(outcome);
        self
    }

    pub fn seal(self, not_attempted: Vec<usize>) -> ImportReport {
        let count = |kind: OutcomeKind| self.per_row.iter().filter(|o| o.outcome == kind).count();

        ImportReport {
            total_rows: self.per_row.len(),
            succeeded: count(OutcomeKind::Succeeded),
            skipped_duplicate: count(OutcomeKind::SkippedDuplicate),
            skipped_invalid: count(OutcomeKind::SkippedInvalid),
            failed: count(OutcomeKind::Failed),
            cancelled: !not_attempted.is_empty(),
            not_attempted,
            per_row: self.per_row,
            duplicate_check: self.duplicate_check,
            warnings: self.warnings,
            source_digest: self.source_digest,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_outcomes() {
        let report = ReportAccumulator::new("abc".into(), DuplicateCheckMode::Full, Vec::new())
            .push(RowOutcome::succeeded(2, "id-1".into()))
            .push(RowOutcome::skipped(
                3,
                OutcomeKind::SkippedInvalid,
                "name: required field missing".into(),
            ))
            .push(RowOutcome::skipped(
                4,
                OutcomeKind::SkippedDuplicate,
                "email matches within-file".into(),
            ))
            .push(RowOutcome::failed(5, "Database error: locked".into()))
            .seal(Vec::new());

        assert_eq!(report.total_rows(), 4);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped_invalid(), 1);
        assert_eq!(report.skipped_duplicate(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.cancelled());
        assert_eq!(report.outcome_for(2).and_then(|o| o.lead_id.as_deref()), Some("id-1"));
    }

    #[test]
    fn test_outcome_kind_serialization() {
        let json = serde_json::to_string(&OutcomeKind::SkippedDuplicate).unwrap();
        assert_eq!(json, "\"skipped-duplicate\"");
    }

    #[test]
    fn test_not_attempted_marks_cancelled() {
        let report =
            ReportAccumulator::new(String::new(), DuplicateCheckMode::WithinFileOnly, Vec::new())
                .push(RowOutcome::succeeded(2, "id".into()))
                .seal(vec![3, 4]);
        assert!(report.cancelled());
        assert_eq!(report.total_rows(), 1);
        assert!(report.is_reduced_confidence());
    }
}
