//! SQLite storage implementation.
//!
//! The default backend: a single file next to the bot, or `sqlite::memory:`
//! for tests.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use super::{fold_counts, insert_error, parse_status};
use crate::error::{StoreError, StoreResult};
use crate::traits::store::ApplicationStore;
use crate::types::{ApplicationRecord, ApplicationStatus, StatusCounts};

/// SQLite-based application store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://applications.db` - File database, created if missing
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::Database)?
            .create_if_missing(true);

        let in_memory = database_url.contains(":memory:");
        let pool = if in_memory {
            // Every connection to :memory: is a separate database; pin one.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
        }
        .map_err(StoreError::Database)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Create the schema if it does not exist.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT,
                url TEXT NOT NULL,
                status TEXT NOT NULL
                    CHECK (status IN ('applied', 'skipped', 'manual_review', 'error')),
                cover_letter TEXT,
                applied_at TEXT NOT NULL,
                notes TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status)")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct RecordRow {
    job_id: String,
    title: String,
    company: String,
    location: Option<String>,
    url: String,
    status: String,
    cover_letter: Option<String>,
    applied_at: String,
    notes: Option<String>,
}

impl RecordRow {
    fn into_record(self) -> StoreResult<ApplicationRecord> {
        let status = parse_status(&self.job_id, &self.status)?;
        let applied_at = chrono::DateTime::parse_from_rfc3339(&self.applied_at)
            .map_err(|e| StoreError::Corrupt {
                job_id: self.job_id.clone(),
                reason: format!("invalid applied_at: {}", e),
            })?
            .with_timezone(&chrono::Utc);

        Ok(ApplicationRecord {
            job_id: self.job_id,
            title: self.title,
            company: self.company,
            location: self.location,
            url: self.url,
            status,
            cover_letter: self.cover_letter,
            applied_at,
            notes: self.notes,
        })
    }
}

const SELECT_RECORD: &str = "SELECT job_id, title, company, location, url, status, cover_letter, applied_at, notes FROM applications";

#[async_trait]
impl ApplicationStore for SqliteStore {
    async fn exists(&self, job_id: &str) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM applications WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        Ok(row.is_some())
    }

    async fn insert(&self, record: &ApplicationRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO applications (job_id, title, company, location, url, status, cover_letter, applied_at, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.job_id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.url)
        .bind(record.status.as_str())
        .bind(&record.cover_letter)
        .bind(record.applied_at.to_rfc3339())
        .bind(&record.notes)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, &record.job_id))?;

        Ok(())
    }

    async fn summary_counts(&self) -> StoreResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM applications GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::Database)?;

        Ok(fold_counts(rows))
    }

    async fn list(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<ApplicationRecord>> {
        let sql = match status {
            Some(_) => format!("{} WHERE status = ? ORDER BY seq", SELECT_RECORD),
            None => format!("{} ORDER BY seq", SELECT_RECORD),
        };
        let mut query = sqlx::query_as::<_, RecordRow>(&sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    async fn get(&self, job_id: &str) -> StoreResult<Option<ApplicationRecord>> {
        let sql = format!("{} WHERE job_id = ?", SELECT_RECORD);
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        row.map(|r| r.into_record()).transpose()
    }
}
