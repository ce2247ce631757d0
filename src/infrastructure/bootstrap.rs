use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::application::PipelineController;
use crate::domain::error::Result;
use crate::infrastructure::config::load_config;
use crate::infrastructure::db::SqliteLeadRepository;
use crate::infrastructure::logging::init_tracing;

/// Load configuration, install logging and open the lead store.
pub async fn setup(config_path: Option<&Path>) -> Result<PipelineController> {
    let config = load_config(config_path)?;
    init_tracing(&config.log_filter);

    let repository = SqliteLeadRepository::init(&config.database_url)
        .await
        .map_err(|err| {
            error!(error = %err, database_url = %config.database_url, "Failed to open lead store");
            err
        })?;

    let controller = PipelineController::from_config(&config, Arc::new(repository))?;
    info!(
        database_url = %config.database_url,
        max_rows = config.max_rows,
        "Lead import pipeline ready"
    );
    Ok(controller)
}
