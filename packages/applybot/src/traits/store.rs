//! Persistence trait for application records.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{ApplicationRecord, ApplicationStatus, StatusCounts};

/// Durable record of every job seen.
///
/// The store, not the in-memory dedup check, is the uniqueness authority:
/// `insert` must fail with `StoreError::DuplicateKey` for a known identifier.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Indexed presence lookup by job identifier.
    async fn exists(&self, job_id: &str) -> StoreResult<bool>;

    /// Persist a new record; durable when this returns `Ok`.
    async fn insert(&self, record: &ApplicationRecord) -> StoreResult<()>;

    async fn summary_counts(&self) -> StoreResult<StatusCounts>;

    /// Records in insertion order, optionally restricted to one status.
    async fn list(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<ApplicationRecord>>;

    async fn get(&self, job_id: &str) -> StoreResult<Option<ApplicationRecord>> {
        Ok(self
            .list(None)
            .await?
            .into_iter()
            .find(|r| r.job_id == job_id))
    }
}
