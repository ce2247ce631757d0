// ============================================================
// IMPORT CONFIGURATION
// ============================================================
// Tunables for parsing and persistence

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{FieldCatalog, FieldDefinition};
use crate::domain::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImportConfig {
    /// Upper bound on data rows held in memory (default: 10_000)
    #[validate(range(min = 1, max = 1_000_000))]
    pub max_rows: usize,

    /// Fixed CSV delimiter; `None` detects one of `,` `;` tab `|`
    pub csv_delimiter: Option<char>,

    #[validate(length(min = 1))]
    pub database_url: String,

    #[validate(length(min = 1))]
    pub log_filter: String,

    /// Replaces the built-in lead catalog when present
    #[validate(custom(function = "validate_catalog"))]
    pub catalog: Option<Vec<FieldDefinition>>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            csv_delimiter: None,
            database_url: "sqlite://leads.db".to_string(),
            log_filter: "info".to_string(),
            catalog: None,
        }
    }
}

impl ImportConfig {
    /// Catalog in effect for this configuration
    pub fn field_catalog(&self) -> Result<FieldCatalog> {
        match &self.catalog {
            Some(fields) => FieldCatalog::new(fields.clone()),
            None => Ok(FieldCatalog::lead_defaults()),
        }
    }

    /// CSV delimiter as a byte, if one is fixed
    pub fn csv_delimiter_byte(&self) -> Result<Option<u8>> {
        match self.csv_delimiter {
            None => Ok(None),
            Some(c) if c.is_ascii() => Ok(Some(c as u8)),
            Some(c) => Err(AppError::ConfigError(format!(
                "csv_delimiter must be ASCII, got {:?}",
                c
            ))),
        }
    }
}

fn validate_catalog(
    fields: &Vec<FieldDefinition>,
) -> std::result::Result<(), validator::ValidationError> {
    FieldCatalog::new(fields.clone()).map(|_| ()).map_err(|e| {
        let mut error = validator::ValidationError::new("invalid_catalog");
        error.message = Some(e.to_string().into());
        error
    })
}
