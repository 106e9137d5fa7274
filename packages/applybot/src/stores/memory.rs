//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::ApplicationStore;
use crate::types::{ApplicationRecord, ApplicationStatus, StatusCounts};

/// In-memory application records.
///
/// Keeps insertion order and a hash index on job identifier. Not suitable
/// for production as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Vec<ApplicationRecord>,
    index: HashMap<String, usize>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records in insertion order.
    pub fn records(&self) -> Vec<ApplicationRecord> {
        self.inner.read().unwrap().records.clone()
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn exists(&self, job_id: &str) -> StoreResult<bool> {
        Ok(self.inner.read().unwrap().index.contains_key(job_id))
    }

    async fn insert(&self, record: &ApplicationRecord) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.index.contains_key(&record.job_id) {
            return Err(StoreError::DuplicateKey {
                job_id: record.job_id.clone(),
            });
        }
        let position = inner.records.len();
        inner.index.insert(record.job_id.clone(), position);
        inner.records.push(record.clone());
        Ok(())
    }

    async fn summary_counts(&self) -> StoreResult<StatusCounts> {
        let mut counts = StatusCounts::default();
        for record in &self.inner.read().unwrap().records {
            counts.add(record.status, 1);
        }
        Ok(counts)
    }

    async fn list(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<ApplicationRecord>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .records
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn get(&self, job_id: &str) -> StoreResult<Option<ApplicationRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.index.get(job_id).map(|&i| inner.records[i].clone()))
    }
}
