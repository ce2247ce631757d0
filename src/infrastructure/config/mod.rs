// ============================================================
// CONFIGURATION LOADING
// ============================================================
// defaults -> optional TOML file -> LEAD_IMPORT_* environment

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::debug;
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::import::ImportConfig;

pub const ENV_PREFIX: &str = "LEAD_IMPORT_";

/// Provider stack without the environment layer
pub fn file_figment(path: Option<&Path>) -> Figment {
    let figment = Figment::from(Serialized::defaults(ImportConfig::default()));
    match path {
        Some(path) => figment.merge(Toml::file(path)),
        None => figment,
    }
}

/// Load and validate the import configuration.
///
/// A missing TOML file is not an error; `.env` is read when present.
pub fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    let _ = dotenvy::dotenv();

    let figment = file_figment(path).merge(Env::prefixed(ENV_PREFIX));
    extract(figment)
}

fn extract(figment: Figment) -> Result<ImportConfig> {
    let config: ImportConfig = figment
        .extract()
        .map_err(|e| AppError::ConfigError(format!("Failed to read configuration: {}", e)))?;

    config
        .validate()
        .map_err(|e| AppError::ConfigError(format!("Invalid configuration: {}", e)))?;
    // Catalog errors surface here instead of on first upload
    config.field_catalog()?;
    config.csv_delimiter_byte()?;

    debug!(
        max_rows = config.max_rows,
        database_url = %config.database_url,
        custom_catalog = config.catalog.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_toml(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("lead-import-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = extract(file_figment(None)).unwrap();
        assert_eq!(config, ImportConfig::default());

        let missing = std::env::temp_dir().join("lead-import-does-not-exist.toml");
        let config = extract(file_figment(Some(&missing))).unwrap();
        assert_eq!(config.max_rows, 10_000);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let path = write_toml(
            r#"
max_rows = 500
csv_delimiter = ";"
database_url = "sqlite::memory:"

[[catalog]]
key = "name"
label = "Cliente"
required = true

[[catalog]]
key = "email"
label = "Email"
aliases = ["Correio"]
"#,
        );

        let config = extract(file_figment(Some(&path))).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.max_rows, 500);
        assert_eq!(config.csv_delimiter_byte().unwrap(), Some(b';'));
        assert_eq!(config.log_filter, "info");
        let catalog = config.field_catalog().unwrap();
        assert_eq!(catalog.fields().len(), 2);
        assert_eq!(catalog.get("email").unwrap().aliases, vec!["Correio".to_string()]);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let path = write_toml("max_rows = 0\n");
        let err = extract(file_figment(Some(&path))).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, AppError::ConfigError(_)));

        let path = write_toml("[[catalog]]\nkey = \"notes\"\nlabel = \"Notas\"\n");
        let err = extract(file_figment(Some(&path))).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
