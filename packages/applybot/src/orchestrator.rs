//! The application run loop.
//!
//! `ApplicationOrchestrator` consumes postings one at a time and, for each,
//! decides and records exactly one outcome:
//!
//! ```text
//! posting
//!     │
//!     ├─► already recorded?          → tally duplicate, no write
//!     ├─► no url / applied / excluded → write Applied|Skipped, no budget
//!     ├─► budget exhausted?          → stop
//!     ├─► session start / restart (+ cooldown)
//!     ├─► hold until the floor has passed since the last outcome
//!     ├─► cover letter (optional, one attempt, non-fatal)
//!     ├─► submit via automator
//!     ├─► persist outcome            (before the next posting is pulled)
//!     └─► hold until the per-job floor (+ jitter, throttle backoff)
//! ```
//!
//! Everything is sequential. The browser session lives in the run and is lent
//! to the automator for each submission.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::budget::{BudgetDecision, SessionBudget};
use crate::config::RunConfig;
use crate::error::{AutomationError, GenerationError, RunError};
use crate::filter::{Deduplicator, PostingFilter};
use crate::traits::{ApplicationStore, Automator, CoverLetterGenerator, JobFetcher, PostingStream};
use crate::types::{
    ApplicationRecord, ApplicationStatus, JobOutcome, JobPosting, RunSummary, StopReason,
    UserProfile,
};

/// Drives one run over a posting sequence.
pub struct ApplicationOrchestrator<S: ApplicationStore + ?Sized, A: Automator> {
    store: Arc<S>,
    dedup: Deduplicator<S>,
    automator: A,
    generator: Option<Arc<dyn CoverLetterGenerator>>,
    profile: Arc<UserProfile>,
    config: Arc<RunConfig>,
    filter: PostingFilter,
}

/// What happened during the submission step of one job.
struct Attempt {
    outcome: JobOutcome,
    cover_letter: Option<String>,
    generation_note: Option<String>,
    throttled: bool,
}

impl<S: ApplicationStore + ?Sized, A: Automator> ApplicationOrchestrator<S, A> {
    pub fn new(store: Arc<S>, automator: A, config: RunConfig) -> Self {
        let filter = PostingFilter::new(
            &config.exclude_title_keywords,
            &config.cover_letter.triggers,
        );
        Self {
            dedup: Deduplicator::new(store.clone()),
            store,
            automator,
            generator: None,
            profile: Arc::new(UserProfile::default()),
            config: Arc::new(config),
            filter,
        }
    }

    /// Enable cover-letter generation for `profile`.
    ///
    /// Still subject to `cover_letter.enabled` and the trigger keywords.
    pub fn with_generator(
        mut self,
        generator: Arc<dyn CoverLetterGenerator>,
        profile: impl Into<Arc<UserProfile>>,
    ) -> Self {
        self.generator = Some(generator);
        self.profile = profile.into();
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Search with `fetcher` using the configured criteria, then run.
    pub async fn run_search(
        &self,
        fetcher: &dyn JobFetcher,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let search = &self.config.search;
        info!(
            keywords = %search.keywords,
            location = %search.location,
            time_filter = %search.time_filter,
            "searching postings"
        );
        let postings = fetcher.search(search).await?;
        self.run(postings, cancel).await
    }

    /// Process `postings` until they run out, the budget stops the run, or
    /// `cancel` fires.
    ///
    /// Only store failures, fetch failures and a browser session that cannot
    /// be started are returned as errors; per-job failures are recorded.
    pub async fn run(
        &self,
        postings: PostingStream,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let limits = &self.config.limits;
        info!(
            max_jobs = limits.max_jobs_total,
            max_jobs_per_session = limits.max_jobs_per_session,
            min_seconds_per_job = limits.min_seconds_per_job,
            max_session_duration_secs = limits.max_session_duration_secs,
            "run starting"
        );

        let mut session = None;
        let mut summary = RunSummary::default();
        let result = self
            .drive(postings, cancel, &mut session, &mut summary)
            .await;

        if let Some(session) = session.take() {
            self.automator.end_session(session).await;
            debug!("browser session closed");
        }

        match result {
            Ok(()) => {
                info!(
                    applied = summary.applied(),
                    skipped = summary.skipped(),
                    manual_review = summary.manual_review(),
                    errors = summary.errors(),
                    duplicates = summary.duplicates,
                    session_restarts = summary.session_restarts,
                    stop_reason = ?summary.stop_reason,
                    "run finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, submissions = summary.submissions, "run aborted");
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        mut postings: PostingStream,
        cancel: &CancellationToken,
        session: &mut Option<A::Session>,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        let mut budget = SessionBudget::new(self.config.limits.clone());

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.stop_reason = StopReason::Cancelled;
                    return Ok(());
                }
                next = postings.next() => next,
            };

            let posting = match next {
                Some(Ok(posting)) => posting,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    summary.stop_reason = StopReason::Exhausted;
                    return Ok(());
                }
            };

            if self.dedup.is_duplicate(&posting.id).await? {
                debug!(job_id = %posting.id, "already recorded, skipping");
                summary.duplicates += 1;
                continue;
            }

            if let Some(mut record) = self.screen(&posting) {
                info!(
                    job_id = %posting.id,
                    title = %posting.title,
                    status = %record.status,
                    notes = record.notes.as_deref().unwrap_or_default(),
                    "job screened out"
                );
                self.persist(&mut record, summary).await?;
                continue;
            }

            if let BudgetDecision::Terminate(reason) = budget.allow_next() {
                info!(
                    reason = ?reason,
                    jobs_processed = budget.jobs_processed(),
                    "budget exhausted, stopping"
                );
                summary.stop_reason = reason;
                return Ok(());
            }

            let (current, restarted) = self
                .prepare_session(session, &mut budget, summary)
                .await?;
            if restarted {
                let cooldown = budget.restart_hold();
                debug!(cooldown_ms = cooldown.as_millis() as u64, "restart cooldown");
                if !hold(cooldown, cancel).await {
                    summary.stop_reason = StopReason::Cancelled;
                    return Ok(());
                }
            }

            let gap = budget.submission_gap();
            if !gap.is_zero() {
                debug!(job_id = %posting.id, gap_ms = gap.as_millis() as u64, "holding before submission");
                if !hold(gap, cancel).await {
                    summary.stop_reason = StopReason::Cancelled;
                    return Ok(());
                }
            }

            budget.record_job_start();
            summary.submissions += 1;

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(job_id = %posting.id, "cancelled mid-job, outcome not recorded");
                    summary.stop_reason = StopReason::Cancelled;
                    return Ok(());
                }
                attempt = self.attempt(current, &posting) => attempt,
            };

            let backoff = if attempt.throttled {
                let backoff = budget.record_throttle();
                warn!(job_id = %posting.id, backoff_secs = backoff.as_secs(), "throttled by platform");
                backoff
            } else {
                budget.record_unthrottled();
                Duration::ZERO
            };

            let mut record = build_record(&posting, attempt);
            self.persist(&mut record, summary).await?;
            budget.record_outcome();

            match record.status {
                ApplicationStatus::Error => warn!(
                    job_id = %record.job_id,
                    title = %record.title,
                    company = %record.company,
                    notes = record.notes.as_deref().unwrap_or_default(),
                    "job failed"
                ),
                status => info!(
                    job_id = %record.job_id,
                    title = %record.title,
                    company = %record.company,
                    status = %status,
                    cover_letter = record.cover_letter.is_some(),
                    "job processed"
                ),
            }

            let wait = budget.record_job_end().saturating_add(backoff);
            if !wait.is_zero() {
                debug!(wait_ms = wait.as_millis() as u64, backoff_ms = backoff.as_millis() as u64, "pacing hold");
            }
            if !hold(wait, cancel).await {
                summary.stop_reason = StopReason::Cancelled;
                return Ok(());
            }
        }
    }

    /// Outcome for postings that never reach the automator.
    fn screen(&self, posting: &JobPosting) -> Option<ApplicationRecord> {
        if posting.url.trim().is_empty() {
            return Some(
                ApplicationRecord::for_posting(posting, ApplicationStatus::Skipped)
                    .with_notes("missing posting url"),
            );
        }

        if posting.already_applied {
            return Some(
                ApplicationRecord::for_posting(posting, ApplicationStatus::Applied)
                    .with_notes("already applied on platform"),
            );
        }

        self.filter.excluded_by(&posting.title).map(|keyword| {
            ApplicationRecord::for_posting(posting, ApplicationStatus::Skipped)
                .with_notes(format!("title matched exclusion keyword '{}'", keyword))
        })
    }

    /// Make sure a usable session is in `slot`, restarting it when the budget
    /// says so. Returns the session and whether it was restarted.
    async fn prepare_session<'s>(
        &self,
        slot: &'s mut Option<A::Session>,
        budget: &mut SessionBudget,
        summary: &mut RunSummary,
    ) -> Result<(&'s mut A::Session, bool), RunError> {
        match slot.take() {
            None => {
                let fresh = self
                    .automator
                    .start_session()
                    .await
                    .map_err(RunError::Session)?;
                budget.reset_session();
                info!("browser session started");
                Ok((slot.insert(fresh), false))
            }
            Some(old) if budget.needs_session_restart() => {
                info!(
                    session_jobs = budget.session_jobs(),
                    jobs_processed = budget.jobs_processed(),
                    "restarting browser session"
                );
                let fresh = self
                    .automator
                    .restart_session(old)
                    .await
                    .map_err(RunError::Session)?;
                budget.reset_session();
                summary.session_restarts += 1;
                Ok((slot.insert(fresh), true))
            }
            Some(current) => Ok((slot.insert(current), false)),
        }
    }

    async fn attempt(&self, session: &mut A::Session, posting: &JobPosting) -> Attempt {
        let (cover_letter, generation_note) = self.draft_cover_letter(posting).await;

        let (outcome, throttled) = match self
            .automator
            .submit(session, posting, cover_letter.as_deref())
            .await
        {
            Ok(submitted) => (JobOutcome::from(submitted), false),
            Err(e) => (failure_outcome(&e), e.is_rate_limited()),
        };

        Attempt {
            outcome,
            cover_letter,
            generation_note,
            throttled,
        }
    }

    /// One generation attempt. Returns the letter, or a note saying why there
    /// is none.
    async fn draft_cover_letter(&self, posting: &JobPosting) -> (Option<String>, Option<String>) {
        let settings = &self.config.cover_letter;
        let generator = match &self.generator {
            Some(generator) if settings.enabled => generator,
            _ => return (None, None),
        };

        if !self.filter.wants_cover_letter(posting.description.as_deref()) {
            debug!(job_id = %posting.id, "no cover letter trigger in description");
            return (None, None);
        }

        let timeout = settings.timeout();
        let result = match tokio::time::timeout(timeout, generator.generate(&self.profile, posting)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(timeout)),
        };

        match result {
            Ok(letter) => (Some(letter), None),
            Err(e) => {
                warn!(job_id = %posting.id, error = %e, "cover letter generation failed, submitting without");
                (None, Some(format!("cover letter unavailable: {}", e)))
            }
        }
    }

    /// Stamp and write one record. A duplicate key means another writer got
    /// there first; that is logged and tallied, not surfaced.
    async fn persist(
        &self,
        record: &mut ApplicationRecord,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        record.applied_at = Utc::now();
        match self.store.insert(record).await {
            Ok(()) => {
                summary.counts.add(record.status, 1);
                Ok(())
            }
            Err(e) if e.is_duplicate_key() => {
                warn!(job_id = %record.job_id, "record already exists, keeping stored outcome");
                summary.duplicates += 1;
                Ok(())
            }
            Err(e) => {
                error!(job_id = %record.job_id, error = %e, "failed to persist outcome");
                Err(e.into())
            }
        }
    }
}

fn failure_outcome(error: &AutomationError) -> JobOutcome {
    JobOutcome::Error {
        detail: error.to_string(),
    }
}

fn build_record(posting: &JobPosting, attempt: Attempt) -> ApplicationRecord {
    let notes: Vec<&str> = attempt
        .outcome
        .note()
        .into_iter()
        .chain(attempt.generation_note.as_deref())
        .collect();

    ApplicationRecord::for_posting(posting, attempt.outcome.status())
        .with_cover_letter(attempt.cover_letter)
        .with_notes(notes.join("; "))
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
async fn hold(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
