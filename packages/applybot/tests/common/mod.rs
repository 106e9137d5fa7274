//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use applybot::{
    ApplicationRecord, ApplicationStatus, ApplicationStore, JitterRange, JobPosting, MemoryStore,
    RunConfig, SessionLimits, StatusCounts, StoreError, StoreResult,
};
use async_trait::async_trait;
use tokio::time::Instant;

pub fn posting(id: &str, title: &str) -> JobPosting {
    JobPosting::new(id, title, "Acme", format!("https://jobs.example/view/{}", id))
        .with_location("Remote")
        .with_description(format!("{} working on retrieval and RAG systems", title))
}

pub fn postings(ids: &[&str]) -> Vec<JobPosting> {
    ids.iter()
        .map(|id| posting(id, "Machine Learning Engineer"))
        .collect()
}

/// Generous ceilings so only the limit under test bites. No jitter and no
/// throttle cooldowns, so holds are exact.
pub fn limits() -> SessionLimits {
    SessionLimits {
        max_jobs_total: 100,
        max_jobs_per_session: 100,
        min_seconds_per_job: 30,
        max_session_duration_secs: 10 * 60 * 60,
        max_browser_session_age_secs: None,
        restart_cooldown_secs: 5,
        job_jitter_ms: JitterRange::NONE,
        restart_jitter_ms: JitterRange::NONE,
        throttle_backoff_secs: 10,
        throttle_restart_after: 3,
        throttle_cooldown_secs: 0,
        throttle_total_cooldown_after: None,
        throttle_total_cooldown_base_secs: 0,
        throttle_total_cooldown_step_secs: 0,
    }
}

pub fn config() -> RunConfig {
    RunConfig::default().with_limits(limits())
}

/// A `MemoryStore` wrapper that timestamps inserts and can misbehave.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    inserted_at: Mutex<Vec<(String, Instant)>>,
    /// Inserts fail once this many have succeeded
    fail_after: Option<usize>,
    /// `exists` always answers false, as if another writer raced us
    blind_exists: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    pub fn blind() -> Self {
        Self {
            blind_exists: true,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn insert_times(&self) -> Vec<(String, Instant)> {
        self.inserted_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApplicationStore for RecordingStore {
    async fn exists(&self, job_id: &str) -> StoreResult<bool> {
        if self.blind_exists {
            return Ok(false);
        }
        self.inner.exists(job_id).await
    }

    async fn insert(&self, record: &ApplicationRecord) -> StoreResult<()> {
        if let Some(limit) = self.fail_after {
            if self.inner.len() >= limit {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
        }
        self.inner.insert(record).await?;
        self.inserted_at
            .lock()
            .unwrap()
            .push((record.job_id.clone(), Instant::now()));
        Ok(())
    }

    async fn summary_counts(&self) -> StoreResult<StatusCounts> {
        self.inner.summary_counts().await
    }

    async fn list(&self, status: Option<ApplicationStatus>) -> StoreResult<Vec<ApplicationRecord>> {
        self.inner.list(status).await
    }
}
