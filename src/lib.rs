//! Lead import pipeline: turn an uploaded spreadsheet into lead records.
//!
//! `PipelineController` walks a session through upload, column mapping,
//! validation and import. The pieces it drives (`TabularFileParser`,
//! `ColumnMapper`, `ValidationEngine`, `ImportExecutor`) are usable on their
//! own; persistence goes through the `LeadRepository` trait.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    ColumnMapper, ImportExecutor, PipelineController, PipelineState, ValidationEngine,
};
pub use domain::error::{AppError, Result};
pub use domain::import::{
    ColumnMapping, FieldCatalog, FieldDefinition, FileFormat, ImportConfig, ImportReport,
    MappingTarget, ParsedSheet, ValidationOutcome,
};
pub use domain::lead::{ExistingRecord, LeadId, LeadRecord};
pub use infrastructure::bootstrap::setup;
pub use infrastructure::db::{LeadRepository, SqliteLeadRepository};
pub use infrastructure::tabular::TabularFileParser;
