use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload of `ParseError` when the file has no header + data row pair.
pub const EMPTY_FILE: &str = "empty-file";
/// Payload of `MappingError` when a required catalog field has no column.
pub const MISSING_REQUIRED: &str = "missing-required";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    ParseError(String),
    MappingError(String),
    DuplicateError(String),
    DatabaseError(String),
    ConfigError(String),
    InvalidTransition(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::MappingError(msg) => write!(f, "Mapping error: {}", msg),
            AppError::DuplicateError(msg) => write!(f, "Duplicate: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Parse and mapping failures block the pipeline; everything else is
    /// either row-scoped or an infrastructure problem.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, AppError::ParseError(_) | AppError::MappingError(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
