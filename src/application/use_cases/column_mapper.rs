//! Column Mapper
//!
//! Proposes a header → field mapping by fuzzy label matching and turns a
//! (possibly hand-edited) mapping into the immutable snapshot used by
//! validation and import.
//!
//! Matching: header and field labels are folded (lowercase, no diacritics,
//! no `*`) and a header maps to the first catalog field where either string
//! contains the other.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::domain::error::{AppError, Result, MISSING_REQUIRED};
use crate::domain::import::{
    ColumnMapping, CommittedMapping, FieldCatalog, FieldDefinition, MappingTarget,
};
use crate::domain::text_normalization::normalize_label;

/// Suggest a mapping for `headers`. Pure: identical input gives identical output.
pub fn suggest_mapping(headers: &[String], catalog: &FieldCatalog) -> ColumnMapping {
    let mut mapping = ColumnMapping::unmapped(headers);

    for header in headers {
        if let Some(field) = match_field(header, catalog) {
            // `header` comes from the same list the mapping was built from
            let _ = mapping.set(header, MappingTarget::field(&field.key));
        }
    }

    mapping
}

fn match_field<'a>(header: &str, catalog: &'a FieldCatalog) -> Option<&'a FieldDefinition> {
    let normalized_header = normalize_label(header);
    if normalized_header.is_empty() {
        return None;
    }

    catalog.fields().iter().find(|field| {
        field.match_labels().any(|label| {
            let normalized_label = normalize_label(label);
            !normalized_label.is_empty()
                && (normalized_header.contains(&normalized_label)
                    || normalized_label.contains(&normalized_header))
        })
    })
}

/// Suggests and commits mappings against one catalog
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    catalog: FieldCatalog,
}

impl ColumnMapper {
    pub fn new(catalog: FieldCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn suggest(&self, headers: &[String]) -> ColumnMapping {
        let mapping = suggest_mapping(headers, &self.catalog);
        info!(
            columns = headers.len(),
            mapped = mapping
                .entries()
                .iter()
                .filter(|e| e.target != MappingTarget::Ignore)
                .count(),
            "Suggested column mapping"
        );
        mapping
    }

    /// Validate `mapping` against the sheet headers and the catalog.
    ///
    /// Fails with `missing-required` iff a required field has no column.
    pub fn commit(&self, headers: &[String], mapping: &ColumnMapping) -> Result<CommittedMapping> {
        let mut columns_by_key: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for entry in mapping.entries() {
            let index = headers
                .iter()
                .position(|h| h == &entry.column)
                .ok_or_else(|| {
                    AppError::MappingError(format!("unknown-column: {}", entry.column))
                })?;

            if let MappingTarget::Field(key) = &entry.target {
                if !self.catalog.contains(key) {
                    return Err(AppError::MappingError(format!("unknown-field: {}", key)));
                }
                columns_by_key.entry(key.clone()).or_default().push(index);
            }
        }

        let missing: Vec<&str> = self
            .catalog
            .required_keys()
            .filter(|key| !columns_by_key.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "Required fields are not mapped");
            return Err(AppError::MappingError(MISSING_REQUIRED.to_string()));
        }

        for columns in columns_by_key.values_mut() {
            columns.sort_unstable();
        }
        debug!(fields = ?columns_by_key.keys().collect::<Vec<_>>(), "Committed column mapping");

        let required_keys = self.catalog.required_keys().map(str::to_string).collect();
        Ok(CommittedMapping::new(
            mapping.clone(),
            columns_by_key,
            required_keys,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::FieldDefinition;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_scenario_nome_maps_to_name() {
        let mapper = ColumnMapper::new(FieldCatalog::lead_defaults());
        let headers = headers(&["Nome", "Telefone"]);
        let mapping = mapper.suggest(&headers);

        assert_eq!(mapping.field_for("Nome"), Some("name"));
        assert_eq!(mapping.field_for("Telefone"), Some("phone"));
        assert!(mapper.commit(&headers, &mapping).is_ok());
    }

    #[test]
    fn test_suggest_is_deterministic() {
        let catalog = FieldCatalog::lead_defaults();
        let headers = headers(&["E-mail", "Cidade", "Observações", "Valor (R$)", "Misc"]);
        let first = suggest_mapping(&headers, &catalog);
        let second = suggest_mapping(&headers, &catalog);
        assert_eq!(first, second);
        assert_eq!(first.field_for("E-mail"), Some("email"));
        assert_eq!(first.field_for("Cidade"), Some("city"));
        assert_eq!(first.field_for("Observações"), Some("notes"));
        assert_eq!(first.field_for("Valor (R$)"), Some("estimatedValue"));
        assert_eq!(first.field_for("Misc"), None);
    }

    #[test]
    fn test_accents_and_case_are_ignored() {
        let catalog = FieldCatalog::new(vec![
            FieldDefinition::new("name", "Nome *", true),
            FieldDefinition::new("notes", "Observações", false),
        ])
        .unwrap();
        let mapping = suggest_mapping(&headers(&["OBSERVACOES", "nome"]), &catalog);
        assert_eq!(mapping.field_for("OBSERVACOES"), Some("notes"));
        assert_eq!(mapping.field_for("nome"), Some("name"));
    }

    #[test]
    fn test_first_catalog_match_wins() {
        let catalog = FieldCatalog::new(vec![
            FieldDefinition::new("name", "Nome", true),
            FieldDefinition::new("company", "Nome da empresa", false),
        ])
        .unwrap();
        // "nome" is contained in the header, so the earlier field wins
        let mapping = suggest_mapping(&headers(&["Nome da empresa"]), &catalog);
        assert_eq!(mapping.field_for("Nome da empresa"), Some("name"));
    }

    #[test]
    fn test_commit_requires_required_field() {
        let mapper = ColumnMapper::new(FieldCatalog::lead_defaults());
        let headers = headers(&["Nome", "Email"]);
        let mut mapping = mapper.suggest(&headers);
        mapping.set("Nome", MappingTarget::Ignore).unwrap();

        let err = mapper.commit(&headers, &mapping).unwrap_err();
        assert_eq!(err, AppError::MappingError(MISSING_REQUIRED.to_string()));

        // Any column can satisfy the requirement through a manual override
        mapping.set("Email", MappingTarget::field("name")).unwrap();
        let committed = mapper.commit(&headers, &mapping).unwrap();
        assert!(committed.has("name"));
        assert!(!committed.has("email"));
    }

    #[test]
    fn test_commit_rejects_unknown_field_and_column() {
        let mapper = ColumnMapper::new(FieldCatalog::lead_defaults());
        let sheet_headers = headers(&["Nome"]);

        let mut mapping = ColumnMapping::unmapped(&sheet_headers);
        mapping.set("Nome", MappingTarget::field("shoeSize")).unwrap();
        assert_eq!(
            mapper.commit(&sheet_headers, &mapping).unwrap_err(),
            AppError::MappingError("unknown-field: shoeSize".to_string())
        );

        let foreign = ColumnMapping::unmapped(&headers(&["Outro"]));
        assert_eq!(
            mapper.commit(&sheet_headers, &foreign).unwrap_err(),
            AppError::MappingError("unknown-column: Outro".to_string())
        );
    }

    #[test]
    fn test_unmapped_headers_stay_ignored() {
        let mapping = suggest_mapping(
            &headers(&["Column 1", "***"]),
            &FieldCatalog::lead_defaults(),
        );
        assert!(mapping.entries().iter().all(|e| e.target == MappingTarget::Ignore));
    }

    #[test]
    fn test_company_name_header_is_not_taken_by_name() {
        let mapping = suggest_mapping(
            &headers(&["Name", "Company Name", "Full Name"]),
            &FieldCatalog::lead_defaults(),
        );
        assert_eq!(mapping.field_for("Name"), Some("name"));
        assert_eq!(mapping.field_for("Company Name"), Some("company"));
        assert_eq!(mapping.field_for("Full Name"), Some("name"));
    }
}
