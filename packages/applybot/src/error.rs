//! Typed errors for the application orchestrator.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Per-job failures
//! (automation, generation) are recovered inside the run loop; only
//! [`RunError`] ever escapes `ApplicationOrchestrator::run`.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by an [`ApplicationStore`](crate::traits::store::ApplicationStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this job identifier already exists.
    ///
    /// Benign during resumption: the run logs it and moves on.
    #[error("duplicate job identifier: {job_id}")]
    DuplicateKey { job_id: String },

    /// The database rejected or failed the operation
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A stored row could not be decoded back into a record
    #[error("corrupt record {job_id}: {reason}")]
    Corrupt { job_id: String, reason: String },

    /// DATABASE_URL names a backend we do not ship
    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Errors raised while searching for or streaming job postings.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Could not reach the platform or sidecar
    #[error("fetch network error: {0}")]
    Network(String),

    /// Non-success response
    #[error("fetch rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response or file content was not a valid posting list
    #[error("fetch parse error: {0}")]
    Parse(String),

    #[error("fetch io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured failure reported by an [`Automator`](crate::traits::automator::Automator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("automation timed out: {0}")]
    Timeout(String),

    /// The platform throttled us (HTTP 429 or equivalent page)
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Browser session could not be created or is unusable
    #[error("browser session error: {0}")]
    Session(String),

    #[error("automation failed: {0}")]
    Other(String),
}

impl AutomationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Errors raised by a [`CoverLetterGenerator`](crate::traits::generator::CoverLetterGenerator).
///
/// Never fatal: the job proceeds without a cover letter.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider quota or rate limit exhausted
    #[error("generation quota exceeded: {0}")]
    Quota(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// Provider answered but the content was unusable
    #[error("malformed generation response: {0}")]
    Malformed(String),

    /// Non-success API response
    #[error("generation API error: {0}")]
    Api(String),

    #[error("generation network error: {0}")]
    Network(String),
}

/// Invalid run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal errors that abort a run.
///
/// Everything persisted before the failure stays valid; a later run resumes
/// through deduplication.
#[derive(Debug, Error)]
pub enum RunError {
    /// Outcome durability can no longer be guaranteed
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    /// The posting source failed
    #[error("posting source failure: {0}")]
    Fetch(#[from] FetchError),

    /// A browser session could not be (re)established
    #[error("could not establish browser session: {0}")]
    Session(#[source] AutomationError),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, RunError>;
