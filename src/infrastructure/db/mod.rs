pub mod sqlite;

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::lead::{ExistingRecord, LeadId, LeadRecord};

pub use sqlite::SqliteLeadRepository;

/// Store the import pipeline writes leads into.
///
/// The pipeline only mutates it through `create`.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Insert a lead. A colliding email/phone yields `AppError::DuplicateError`.
    async fn create(&self, record: &LeadRecord) -> Result<LeadId>;

    async fn find_by_email(&self, email: &str) -> Result<Option<ExistingRecord>>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<ExistingRecord>>;

    /// Identity view of every stored lead
    async fn list_existing(&self) -> Result<Vec<ExistingRecord>>;
}
