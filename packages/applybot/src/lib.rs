//! Job Application Orchestrator
//!
//! Applies to "Easy Apply" job postings on a professional networking platform
//! at a human-like cadence, and keeps a durable ledger of every job seen.
//!
//! # Design
//!
//! - One sequential loop; no parallel submissions
//! - Every outcome is persisted before the next posting is pulled
//! - The store's unique key on job id makes reruns resume, not repeat
//! - Browser automation, search and text generation sit behind traits
//!
//! # Usage
//!
//! ```rust,ignore
//! use applybot::{ApplicationOrchestrator, RunConfig, SqliteStore};
//! use applybot::testing::{MockAutomator, MockFetcher};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = Arc::new(SqliteStore::new("sqlite://applications.db").await?);
//! let orchestrator = ApplicationOrchestrator::new(store, MockAutomator::new(), RunConfig::default());
//!
//! let summary = orchestrator
//!     .run_search(&MockFetcher::new(), &CancellationToken::new())
//!     .await?;
//! println!("applied to {} jobs", summary.applied());
//! ```
//!
//! # Modules
//!
//! - [`orchestrator`] - The run loop
//! - [`budget`] - Session budget and pacing policy
//! - [`security`] - Redacted credentials
//! - [`filter`] - Dedup and title/description keyword filters
//! - [`traits`] - Collaborator seams (fetcher, automator, generator, store)
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore, PostgresStore)
//! - [`generators`] - OpenAI cover-letter generator
//! - [`automation`] - Automation sidecar client and file fetcher
//! - [`testing`] - Mock implementations for testing

pub mod automation;
pub mod budget;
pub mod config;
pub mod error;
pub mod filter;
pub mod generators;
pub mod orchestrator;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use budget::{BudgetDecision, SessionBudget};
pub use config::{Config, CoverLetterConfig, JitterRange, RunConfig, SessionLimits};
pub use error::{
    AutomationError, ConfigError, FetchError, GenerationError, RunError, StoreError, StoreResult,
};
pub use filter::{is_excluded, Deduplicator, KeywordMatcher, PostingFilter};
pub use orchestrator::ApplicationOrchestrator;
pub use security::SecretString;
pub use traits::{ApplicationStore, Automator, CoverLetterGenerator, JobFetcher, PostingStream};
pub use types::{
    ApplicationRecord, ApplicationStatus, ContactInfo, JobOutcome, JobPosting, RecruiterContact,
    RunSummary, SearchCriteria, StatusCounts, StopReason, SubmitOutcome, TimeFilter, UserProfile,
};

// Re-export backends
pub use automation::{JsonFileFetcher, SidecarClient};
pub use generators::OpenAiGenerator;
pub use stores::{MemoryStore, PostgresStore, SqliteStore};
