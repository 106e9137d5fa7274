//! Storage implementations for application records.
//!
//! - [`MemoryStore`]: in-process, for tests and development
//! - [`SqliteStore`]: embedded file database (default)
//! - [`PostgresStore`]: server database

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::ApplicationStore;
use crate::types::{ApplicationStatus, StatusCounts};

/// Open the store named by a database URL (`sqlite:` or `postgres://`).
pub async fn connect(database_url: &str) -> StoreResult<Arc<dyn ApplicationStore>> {
    if database_url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteStore::new(database_url).await?))
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok(Arc::new(PostgresStore::new(database_url).await?))
    } else {
        let scheme = database_url.split(':').next().unwrap_or_default();
        Err(StoreError::UnsupportedUrl(format!("{}:...", scheme)))
    }
}

/// Translate an insert failure, surfacing unique violations as `DuplicateKey`.
pub(crate) fn insert_error(err: sqlx::Error, job_id: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey {
            job_id: job_id.to_string(),
        },
        _ => StoreError::Database(err),
    }
}

pub(crate) fn parse_status(job_id: &str, raw: &str) -> StoreResult<ApplicationStatus> {
    raw.parse().map_err(|reason| StoreError::Corrupt {
        job_id: job_id.to_string(),
        reason,
    })
}

/// Fold `(status, count)` rows into counts; unknown statuses are ignored.
pub(crate) fn fold_counts(rows: Vec<(String, i64)>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for (status, n) in rows {
        match status.parse::<ApplicationStatus>() {
            Ok(status) => counts.add(status, n.max(0) as u64),
            Err(reason) => tracing::warn!(%reason, "ignoring unknown status in counts"),
        }
    }
    counts
}
