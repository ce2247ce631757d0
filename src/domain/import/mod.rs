// ============================================================
// IMPORT DOMAIN LAYER
// ============================================================
// Types flowing through the lead import pipeline
// No I/O, no async

mod column_mapping;
mod field_catalog;
mod findings;
mod import_config;
mod raw_row;
mod report;

pub use column_mapping::{ColumnMapping, CommittedMapping, MappingEntry, MappingTarget};
pub use field_catalog::{FieldCatalog, FieldDefinition};
pub use findings::{
    DuplicateCheckMode, DuplicateFlag, MatchSource, MatchedField, ValidationError,
    ValidationOutcome,
};
pub use import_config::ImportConfig;
pub use raw_row::{CellValue, FileFormat, ParsedSheet, RawRow};
pub use report::{ImportReport, OutcomeKind, ReportAccumulator, RowOutcome};

/// Field keys with dedicated meaning in the pipeline.
pub mod keys {
    pub const NAME: &str = "name";
    pub const COMPANY: &str = "company";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const SERVICE_INTEREST: &str = "serviceInterest";
    pub const ESTIMATED_VALUE: &str = "estimatedValue";
    pub const ORIGIN: &str = "origin";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const SOCIAL_HANDLE: &str = "socialHandle";
    pub const NOTES: &str = "notes";
}
