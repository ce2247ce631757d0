// ============================================================
// FIELD CATALOG
// ============================================================
// Ordered list of target fields a column can be mapped to

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::keys;
use crate::domain::error::{AppError, Result};

/// A target domain field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique field key (e.g. "email")
    pub key: String,

    /// Display label shown to the user; may carry a trailing "*"
    pub label: String,

    /// Whether a column must be mapped to this field
    #[serde(default)]
    pub required: bool,

    /// Extra labels considered when suggesting a mapping
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl FieldDefinition {
    pub fn new(key: &str, label: &str, required: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required,
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Label first, then aliases
    pub fn match_labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Static, ordered field configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
}

impl FieldCatalog {
    /// Build a catalog, rejecting duplicate keys and catalogs without a required field
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self> {
        if fields.is_empty() {
            return Err(AppError::ConfigError("field catalog is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.key.trim().is_empty() {
                return Err(AppError::ConfigError("field key must not be blank".to_string()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(AppError::ConfigError(format!(
                    "duplicate field key in catalog: {}",
                    field.key
                )));
            }
        }

        if !fields.iter().any(|f| f.required) {
            return Err(AppError::ConfigError(
                "field catalog needs at least one required field".to_string(),
            ));
        }

        Ok(Self { fields })
    }

    /// Catalog used for lead imports
    pub fn lead_defaults() -> Self {
        Self {
            fields: vec![
                FieldDefinition::new(keys::NAME, "Nome *", true)
                    .with_aliases(&["Nome completo", "Full Name"]),
                FieldDefinition::new(keys::COMPANY, "Empresa", false)
                    .with_aliases(&["Company", "Razão social"]),
                FieldDefinition::new(keys::EMAIL, "Email", false).with_aliases(&["E-mail"]),
                FieldDefinition::new(keys::PHONE, "Telefone", false)
                    .with_aliases(&["Phone", "Celular", "WhatsApp"]),
                FieldDefinition::new(keys::SERVICE_INTEREST, "Interesse", false)
                    .with_aliases(&["Serviço", "Service"]),
                FieldDefinition::new(keys::ESTIMATED_VALUE, "Valor Estimado", false)
                    .with_aliases(&["Valor", "Value"]),
                FieldDefinition::new(keys::ORIGIN, "Origem", false).with_aliases(&["Source"]),
                FieldDefinition::new(keys::CITY, "Cidade", false).with_aliases(&["City"]),
                FieldDefinition::new(keys::STATE, "Estado", false),
                FieldDefinition::new(keys::SOCIAL_HANDLE, "Instagram", false)
                    .with_aliases(&["Rede social"]),
                FieldDefinition::new(keys::NOTES, "Observações", false)
                    .with_aliases(&["Notas", "Notes"]),
            ],
        }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.key.as_str())
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::lead_defaults()
    }
}
