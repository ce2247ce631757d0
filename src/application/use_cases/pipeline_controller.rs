//! Pipeline Controller
//!
//! Drives one import session through
//! `Upload → Mapping → Validation → Import → Done`, with `Cancelled`
//! reachable from every state. Each stage owns exactly the data it needs,
//! so leaving a stage drops what it held.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::column_mapper::ColumnMapper;
use super::import_executor::ImportExecutor;
use super::validation_engine::ValidationEngine;
use crate::domain::error::{AppError, Result};
use crate::domain::import::{
    ColumnMapping, CommittedMapping, FileFormat, ImportConfig, ImportReport, MappingTarget,
    ParsedSheet, ValidationOutcome,
};
use crate::infrastructure::db::LeadRepository;
use crate::infrastructure::tabular::TabularFileParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Upload,
    Mapping,
    Validation,
    Import,
    Done,
    Cancelled,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Upload => write!(f, "upload"),
            PipelineState::Mapping => write!(f, "mapping"),
            PipelineState::Validation => write!(f, "validation"),
            PipelineState::Import => write!(f, "import"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Cancelled => write!(f, "cancelled"),
        }
    }
}

enum Stage {
    Upload,
    Mapping {
        sheet: ParsedSheet,
        mapping: ColumnMapping,
    },
    Validation {
        sheet: ParsedSheet,
        mapping: ColumnMapping,
        committed: CommittedMapping,
        outcome: ValidationOutcome,
    },
    Import,
    Done {
        report: ImportReport,
    },
    Cancelled,
}

impl Stage {
    fn state(&self) -> PipelineState {
        match self {
            Stage::Upload => PipelineState::Upload,
            Stage::Mapping { .. } => PipelineState::Mapping,
            Stage::Validation { .. } => PipelineState::Validation,
            Stage::Import => PipelineState::Import,
            Stage::Done { .. } => PipelineState::Done,
            Stage::Cancelled => PipelineState::Cancelled,
        }
    }
}

pub struct PipelineController {
    repository: Arc<dyn LeadRepository>,
    parser: TabularFileParser,
    mapper: ColumnMapper,
    engine: ValidationEngine,
    executor: ImportExecutor,
    stage: Stage,
    cancel: CancellationToken,
}

impl PipelineController {
    pub fn new(
        repository: Arc<dyn LeadRepository>,
        parser: TabularFileParser,
        mapper: ColumnMapper,
    ) -> Self {
        Self {
            repository,
            parser,
            mapper,
            engine: ValidationEngine::new(),
            executor: ImportExecutor::new(),
            stage: Stage::Upload,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(
        config: &ImportConfig,
        repository: Arc<dyn LeadRepository>,
    ) -> Result<Self> {
        Ok(Self::new(
            repository,
            TabularFileParser::from_config(config)?,
            ColumnMapper::new(config.field_catalog()?),
        ))
    }

    pub fn state(&self) -> PipelineState {
        self.stage.state()
    }

    /// Parse an upload and propose a mapping (`Upload → Mapping`).
    ///
    /// `format_hint` is `xlsx`, `xls` or `csv`, case-insensitive, with or
    /// without a leading dot. An unknown hint or a parse failure leaves the
    /// controller in `Upload`.
    pub fn upload(&mut self, bytes: &[u8], format_hint: &str) -> Result<&ColumnMapping> {
        self.expect_state(&[PipelineState::Upload], PipelineState::Mapping)?;

        let sheet = format_hint
            .parse::<FileFormat>()
            .and_then(|format| self.parser.parse(bytes, format))
            .map_err(|e| {
                warn!(error = %e, "Upload rejected");
                e
            })?;
        let mapping = self.mapper.suggest(&sheet.headers);

        self.transition(PipelineState::Upload, Stage::Mapping { sheet, mapping });
        match &self.stage {
            Stage::Mapping { mapping, .. } => Ok(mapping),
            _ => Err(AppError::Internal("mapping stage lost after upload".to_string())),
        }
    }

    /// Change the target of one column while in `Mapping`
    pub fn override_mapping(&mut self, column: &str, target: MappingTarget) -> Result<()> {
        if let MappingTarget::Field(key) = &target {
            if !self.mapper.catalog().contains(key) {
                return Err(AppError::MappingError(format!("unknown-field: {}", key)));
            }
        }

        match &mut self.stage {
            Stage::Mapping { mapping, .. } => mapping.set(column, target),
            stage => Err(invalid_transition(stage.state(), "override mapping")),
        }
    }

    /// Commit the mapping and validate every row (`Mapping → Validation`).
    /// A mapping error leaves the controller in `Mapping`.
    pub async fn validate(&mut self) -> Result<&ValidationOutcome> {
        self.expect_state(&[PipelineState::Mapping], PipelineState::Validation)?;

        let Stage::Mapping { sheet, mapping } = std::mem::replace(&mut self.stage, Stage::Upload)
        else {
            return Err(AppError::Internal("mapping stage lost before validation".to_string()));
        };

        let committed = match self.mapper.commit(&sheet.headers, &mapping) {
            Ok(committed) => committed,
            Err(err) => {
                self.stage = Stage::Mapping { sheet, mapping };
                return Err(err);
            }
        };

        let outcome = self
            .engine
            .validate(&sheet.rows, &committed, self.repository.as_ref())
            .await;

        self.transition(PipelineState::Mapping, Stage::Validation {
            sheet,
            mapping,
            committed,
            outcome,
        });
        match &self.stage {
            Stage::Validation { outcome, .. } => Ok(outcome),
            _ => Err(AppError::Internal("validation stage lost".to_string())),
        }
    }

    /// `Validation → Mapping`; the draft mapping is kept, findings are dropped
    pub fn back_to_mapping(&mut self) -> Result<()> {
        self.expect_state(&[PipelineState::Validation], PipelineState::Mapping)?;
        if let Stage::Validation { sheet, mapping, .. } =
            std::mem::replace(&mut self.stage, Stage::Upload)
        {
            self.transition(PipelineState::Validation, Stage::Mapping { sheet, mapping });
        }
        Ok(())
    }

    /// `Mapping | Validation → Upload`; the parsed file is dropped
    pub fn back_to_upload(&mut self) -> Result<()> {
        self.expect_state(
            &[PipelineState::Mapping, PipelineState::Validation],
            PipelineState::Upload,
        )?;
        self.transition(self.state(), Stage::Upload);
        Ok(())
    }

    /// Commit the validated rows (`Validation → Import → Done`).
    ///
    /// When the cancellation token fires mid-run the controller ends in
    /// `Cancelled` and the partial report is returned without being kept.
    pub async fn run_import(&mut self) -> Result<ImportReport> {
        self.expect_state(&[PipelineState::Validation], PipelineState::Import)?;

        let Stage::Validation {
            sheet,
            committed,
            outcome,
            ..
        } = std::mem::replace(&mut self.stage, Stage::Import)
        else {
            return Err(AppError::Internal("validation stage lost before import".to_string()));
        };
        info!(
            from = %PipelineState::Validation,
            to = %PipelineState::Import,
            "Pipeline transition"
        );

        let report = self
            .executor
            .execute(
                &sheet,
                &committed,
                &outcome,
                self.repository.as_ref(),
                &self.cancel,
            )
            .await;

        if report.cancelled() {
            self.transition(PipelineState::Import, Stage::Cancelled);
        } else {
            self.transition(PipelineState::Import, Stage::Done {
                report: report.clone(),
            });
        }
        Ok(report)
    }

    /// Any state `→ Cancelled`. In-memory data is dropped; the repository is untouched.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.state() != PipelineState::Cancelled {
            self.transition(self.state(), Stage::Cancelled);
        }
    }

    /// `Done | Cancelled → Upload` with a fresh cancellation token
    pub fn restart(&mut self) -> Result<()> {
        self.expect_state(
            &[PipelineState::Done, PipelineState::Cancelled],
            PipelineState::Upload,
        )?;
        self.cancel = CancellationToken::new();
        self.transition(self.state(), Stage::Upload);
        Ok(())
    }

    /// Token observed by the executor between rows; clone it to cancel a
    /// running import from another task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn sheet(&self) -> Option<&ParsedSheet> {
        match &self.stage {
            Stage::Mapping { sheet, .. } | Stage::Validation { sheet, .. } => Some(sheet),
            _ => None,
        }
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        match &self.stage {
            Stage::Mapping { mapping, .. } | Stage::Validation { mapping, .. } => Some(mapping),
            _ => None,
        }
    }

    pub fn committed_mapping(&self) -> Option<&CommittedMapping> {
        match &self.stage {
            Stage::Validation { committed, .. } => Some(committed),
            _ => None,
        }
    }

    pub fn validation_outcome(&self) -> Option<&ValidationOutcome> {
        match &self.stage {
            Stage::Validation { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&ImportReport> {
        match &self.stage {
            Stage::Done { report } => Some(report),
            _ => None,
        }
    }

    fn expect_state(&self, allowed: &[PipelineState], target: PipelineState) -> Result<()> {
        let current = self.state();
        if allowed.contains(&current) {
            Ok(())
        } else {
            Err(invalid_transition(current, &target.to_string()))
        }
    }

    fn transition(&mut self, from: PipelineState, next: Stage) {
        self.stage = next;
        info!(from = %from, to = %self.state(), "Pipeline transition");
    }
}

fn invalid_transition(from: PipelineState, to: &str) -> AppError {
    AppError::InvalidTransition(format!("{} -> {}", from, to))
}
