//! Testing utilities including mock implementations.
//!
//! These let the orchestrator run without a browser, a network or a model.
//! Every mock is cheap to clone and clones share state, so a test can hand one
//! copy to the orchestrator and inspect calls on the other.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{AutomationError, FetchError, GenerationError};
use crate::traits::{Automator, CoverLetterGenerator, JobFetcher, PostingStream};
use crate::types::{JobPosting, SearchCriteria, SubmitOutcome, UserProfile};

/// A fetcher that yields a fixed list of postings.
#[derive(Clone, Default)]
pub struct MockFetcher {
    postings: Arc<RwLock<Vec<JobPosting>>>,

    /// Yield a network error after this many postings
    fail_after: Arc<RwLock<Option<usize>>>,

    /// Fail `search` itself
    fail_search: Arc<RwLock<Option<String>>>,

    /// Criteria of every search, for assertions
    searches: Arc<RwLock<Vec<SearchCriteria>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_postings(self, postings: impl IntoIterator<Item = JobPosting>) -> Self {
        self.postings.write().unwrap().extend(postings);
        self
    }

    /// Break the stream after `n` postings.
    pub fn fail_after(self, n: usize) -> Self {
        *self.fail_after.write().unwrap() = Some(n);
        self
    }

    pub fn fail_search(self, message: impl Into<String>) -> Self {
        *self.fail_search.write().unwrap() = Some(message.into());
        self
    }

    pub fn searches(&self) -> Vec<SearchCriteria> {
        self.searches.read().unwrap().clone()
    }

    /// The configured postings as a stream, bypassing `search`.
    pub fn stream(&self) -> PostingStream {
        let postings = self.postings.read().unwrap().clone();
        let fail_after = *self.fail_after.read().unwrap();

        let mut items: Vec<Result<JobPosting, FetchError>> = match fail_after {
            Some(n) => postings.into_iter().take(n).map(Ok).collect(),
            None => postings.into_iter().map(Ok).collect(),
        };
        if fail_after.is_some() {
            items.push(Err(FetchError::Network("connection reset".into())));
        }
        stream::iter(items).boxed()
    }
}

#[async_trait]
impl JobFetcher for MockFetcher {
    async fn search(&self, criteria: &SearchCriteria) -> Result<PostingStream, FetchError> {
        self.searches.write().unwrap().push(criteria.clone());
        if let Some(message) = self.fail_search.read().unwrap().clone() {
            return Err(FetchError::Network(message));
        }
        Ok(self.stream())
    }
}

/// Session handle issued by [`MockAutomator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSession {
    pub id: u64,
}

/// Record of a call made to the mock automator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAutomatorCall {
    StartSession { session: u64 },
    Submit {
        session: u64,
        job_id: String,
        cover_letter: Option<String>,
    },
    EndSession { session: u64 },
    RestartSession { old: u64 },
}

/// An automator with scripted per-job results.
///
/// Jobs without a script are `Submitted`.
#[derive(Clone, Default)]
pub struct MockAutomator {
    results: Arc<RwLock<HashMap<String, Result<SubmitOutcome, AutomationError>>>>,

    /// Simulated page-interaction time by job id
    delays: Arc<RwLock<HashMap<String, Duration>>>,

    fail_start: Arc<RwLock<bool>>,

    next_session: Arc<AtomicU64>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAutomatorCall>>>,
}

impl MockAutomator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(
        self,
        job_id: impl Into<String>,
        result: Result<SubmitOutcome, AutomationError>,
    ) -> Self {
        self.results.write().unwrap().insert(job_id.into(), result);
        self
    }

    pub fn with_delay(self, job_id: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(job_id.into(), delay);
        self
    }

    /// Make every `start_session` fail.
    pub fn failing_start(self) -> Self {
        *self.fail_start.write().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<MockAutomatorCall> {
        self.calls.read().unwrap().clone()
    }

    /// Job ids passed to `submit`, in call order.
    pub fn submitted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockAutomatorCall::Submit { job_id, .. } => Some(job_id),
                _ => None,
            })
            .collect()
    }

    pub fn restarts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockAutomatorCall::RestartSession { .. }))
            .count()
    }

    /// Sessions started but not ended.
    pub fn open_sessions(&self) -> usize {
        let calls = self.calls();
        let started = calls
            .iter()
            .filter(|c| matches!(c, MockAutomatorCall::StartSession { .. }))
            .count();
        let ended = calls
            .iter()
            .filter(|c| matches!(c, MockAutomatorCall::EndSession { .. }))
            .count();
        started - ended
    }

    fn record(&self, call: MockAutomatorCall) {
        self.calls.write().unwrap().push(call);
    }
}

#[async_trait]
impl Automator for MockAutomator {
    type Session = MockSession;

    async fn start_session(&self) -> Result<MockSession, AutomationError> {
        if *self.fail_start.read().unwrap() {
            return Err(AutomationError::Session("browser failed to launch".into()));
        }
        let id = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(MockAutomatorCall::StartSession { session: id });
        Ok(MockSession { id })
    }

    async fn submit(
        &self,
        session: &mut MockSession,
        posting: &JobPosting,
        cover_letter: Option<&str>,
    ) -> Result<SubmitOutcome, AutomationError> {
        self.record(MockAutomatorCall::Submit {
            session: session.id,
            job_id: posting.id.clone(),
            cover_letter: cover_letter.map(str::to_string),
        });

        let delay = self.delays.read().unwrap().get(&posting.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.results
            .read()
            .unwrap()
            .get(&posting.id)
            .cloned()
            .unwrap_or(Ok(SubmitOutcome::Submitted))
    }

    async fn end_session(&self, session: MockSession) {
        self.record(MockAutomatorCall::EndSession {
            session: session.id,
        });
    }

    async fn restart_session(&self, session: MockSession) -> Result<MockSession, AutomationError> {
        self.record(MockAutomatorCall::RestartSession { old: session.id });
        self.end_session(session).await;
        self.start_session().await
    }
}

/// How [`MockGenerator`] answers.
#[derive(Debug, Clone)]
pub enum MockGeneration {
    Letter(String),
    QuotaExceeded,
    /// Never completes; exercises the caller's timeout
    Hang,
}

/// A cover-letter generator with a fixed answer.
#[derive(Clone)]
pub struct MockGenerator {
    mode: MockGeneration,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockGenerator {
    pub fn letter(text: impl Into<String>) -> Self {
        Self::with_mode(MockGeneration::Letter(text.into()))
    }

    pub fn quota_exceeded() -> Self {
        Self::with_mode(MockGeneration::QuotaExceeded)
    }

    pub fn hanging() -> Self {
        Self::with_mode(MockGeneration::Hang)
    }

    fn with_mode(mode: MockGeneration) -> Self {
        Self {
            mode,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Job ids generation was requested for.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl CoverLetterGenerator for MockGenerator {
    async fn generate(
        &self,
        profile: &UserProfile,
        posting: &JobPosting,
    ) -> Result<String, GenerationError> {
        self.calls.write().unwrap().push(posting.id.clone());
        match &self.mode {
            MockGeneration::Letter(text) => Ok(format!(
                "{}\n\nBest regards,\n{}",
                text, profile.full_name
            )),
            MockGeneration::QuotaExceeded => {
                Err(GenerationError::Quota("insufficient_quota".into()))
            }
            MockGeneration::Hang => {
                std::future::pending::<()>().await;
                Err(GenerationError::Malformed("unreachable".into()))
            }
        }
    }
}
