//! Import Executor
//!
//! Commits a validated sheet row by row. Duplicates are skipped before
//! invalid rows, every other row is projected into a `LeadRecord` and handed
//! to the repository. A failing `create` is recorded and the run continues.

use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::value_coercion::parse_decimal;
use crate::domain::import::{
    keys, CommittedMapping, ImportReport, OutcomeKind, ParsedSheet, RawRow, ReportAccumulator,
    RowOutcome, ValidationOutcome,
};
use crate::domain::lead::LeadRecord;
use crate::infrastructure::db::LeadRepository;

/// Build the record stored for `row`. Unparseable estimated values become `None`.
pub fn project_row(row: &RawRow, mapping: &CommittedMapping) -> LeadRecord {
    let mut record = LeadRecord::default();
    let mut extra = BTreeMap::new();

    for key in mapping.mapped_keys() {
        if key == keys::ESTIMATED_VALUE {
            record.estimated_value = mapping.cell(row, key).and_then(|cell| {
                let value = parse_decimal(cell);
                if value.is_none() {
                    debug!(
                        row = row.row_number,
                        raw = %cell.as_text(),
                        "Estimated value is not a number"
                    );
                }
                value
            });
            continue;
        }

        let value = mapping.text(row, key);
        match key {
            keys::NAME => record.name = value.unwrap_or_default(),
            keys::COMPANY => record.company = value,
            keys::EMAIL => record.email = value,
            keys::PHONE => record.phone = value,
            keys::SERVICE_INTEREST => record.service_interest = value,
            keys::ORIGIN => record.origin = value,
            keys::CITY => record.city = value,
            keys::STATE => record.state = value,
            keys::SOCIAL_HANDLE => record.social_handle = value,
            keys::NOTES => record.notes = value,
            other => {
                if let Some(value) = value {
                    extra.insert(other.to_string(), value);
                }
            }
        }
    }

    record.extra = extra;
    record
}

#[derive(Debug, Default)]
pub struct ImportExecutor;

impl ImportExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run the batch commit.
    ///
    /// Rows are dispatched in sheet order. The token is checked before each
    /// row; once cancelled, the remaining rows are listed as not attempted.
    pub async fn execute(
        &self,
        sheet: &ParsedSheet,
        mapping: &CommittedMapping,
        outcome: &ValidationOutcome,
        repository: &dyn LeadRepository,
        cancel: &CancellationToken,
    ) -> ImportReport {
        info!(
            rows = sheet.rows.len(),
            source_digest = %sheet.source_digest,
            "Starting import"
        );

        let invalid_rows = outcome.invalid_rows();
        let duplicate_rows = outcome.duplicate_rows();

        let mut report = ReportAccumulator::new(
            sheet.source_digest.clone(),
            outcome.duplicate_check,
            outcome.warnings.clone(),
        );
        let mut not_attempted = Vec::new();

        for (position, row) in sheet.rows.iter().enumerate() {
            if cancel.is_cancelled() {
                not_attempted = sheet.rows[position..]
                    .iter()
                    .map(|r| r.row_number)
                    .collect();
                warn!(
                    dispatched = position,
                    remaining = not_attempted.len(),
                    "Import cancelled"
                );
                break;
            }

            let row_number = row.row_number;
            let row_outcome = if duplicate_rows.contains(&row_number) {
                let detail = outcome
                    .duplicates_for(row_number)
                    .map(|flag| flag.describe())
                    .collect::<Vec<_>>()
                    .join("; ");
                RowOutcome::skipped(row_number, OutcomeKind::SkippedDuplicate, detail)
            } else if invalid_rows.contains(&row_number) {
                let detail = outcome
                    .errors_for(row_number)
                    .map(|e| format!("{}: {}", e.field_key, e.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                RowOutcome::skipped(row_number, OutcomeKind::SkippedInvalid, detail)
            } else {
                let record = project_row(row, mapping);
                match repository.create(&record).await {
                    Ok(lead_id) => RowOutcome::succeeded(row_number, lead_id),
                    Err(err) => {
                        warn!(row = row_number, error = %err, "Failed to create lead");
                        RowOutcome::failed(row_number, err.to_string())
                    }
                }
            };

            debug!(row = row_number, outcome = %row_outcome.outcome, "Row processed");
            report = report.push(row_outcome);
        }

        let report = report.seal(not_attempted);
        info!(
            total = report.total_rows(),
            succeeded = report.succeeded(),
            skipped_duplicate = report.skipped_duplicate(),
            skipped_invalid = report.skipped_invalid(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            "Import finished"
        );
        report
    }
}
