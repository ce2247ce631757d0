use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::LeadRepository;
use crate::domain::error::{AppError, Result};
use crate::domain::lead::{ExistingRecord, LeadId, LeadRecord};
use crate::domain::text_normalization::{email_key, phone_key};

pub struct SqliteLeadRepository {
    pool: Pool<Sqlite>,
}

impl SqliteLeadRepository {
    pub async fn init(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS leads (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                company TEXT,
                email TEXT,
                phone TEXT,
                service_interest TEXT,
                estimated_value TEXT,
                origin TEXT,
                city TEXT,
                state TEXT,
                social_handle TEXT,
                notes TEXT,
                extra_json TEXT NOT NULL DEFAULT '{}',
                email_key TEXT UNIQUE,
                phone_key TEXT UNIQUE,
                created_at DATETIME NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(Self { pool })
    }

    async fn find_by_key(&self, column: &str, key: &str) -> Result<Option<ExistingRecord>> {
        // `column` is one of two fixed identifiers, never user input
        let sql = format!("SELECT id, email, phone FROM leads WHERE {} = ?", column);
        sqlx::query_as::<_, ExistingEntity>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to look up lead: {}", e)))
            .map(|entity| entity.map(Into::into))
    }
}

#[async_trait]
impl LeadRepository for SqliteLeadRepository {
    async fn create(&self, record: &LeadRecord) -> Result<LeadId> {
        let id = Uuid::new_v4().to_string();
        let extra_json = serde_json::to_string(&record.extra)
            .map_err(|e| AppError::Internal(format!("Failed to encode extra fields: {}", e)))?;

        sqlx::query(
            "INSERT INTO leads (id, name, company, email, phone, service_interest, estimated_value,
                origin, city, state, social_handle, notes, extra_json, email_key, phone_key, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&record.name)
        .bind(&record.company)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.service_interest)
        .bind(record.estimated_value.as_ref().map(|v| v.to_string()))
        .bind(&record.origin)
        .bind(&record.city)
        .bind(&record.state)
        .bind(&record.social_handle)
        .bind(&record.notes)
        .bind(extra_json)
        .bind(record.email.as_deref().and_then(email_key))
        .bind(record.phone.as_deref().and_then(phone_key))
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateError(format!(
                    "lead with the same email or phone already exists: {}",
                    db_err.message()
                ))
            }
            other => AppError::DatabaseError(format!("Failed to save lead: {}", other)),
        })?;

        debug!(lead_id = %id, "Lead created");
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<ExistingRecord>> {
        match email_key(email) {
            Some(key) => self.find_by_key("email_key", &key).await,
            None => Ok(None),
        }
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<ExistingRecord>> {
        match phone_key(phone) {
            Some(key) => self.find_by_key("phone_key", &key).await,
            None => Ok(None),
        }
    }

    async fn list_existing(&self) -> Result<Vec<ExistingRecord>> {
        sqlx::query_as::<_, ExistingEntity>(
            "SELECT id, email, phone FROM leads ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list leads: {}", e)))
        .map(|entities| entities.into_iter().map(Into::into).collect())
    }
}

// Internal entity for database mapping
#[derive(sqlx::FromRow)]
struct ExistingEntity {
    id: String,
    email: Option<String>,
    phone: Option<String>,
}

impl From<ExistingEntity> for ExistingRecord {
    fn from(e: ExistingEntity) -> Self {
        Self {
            id: e.id,
            email: e.email,
            phone: e.phone,
        }
    }
}
