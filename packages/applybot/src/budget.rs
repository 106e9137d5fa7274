//! Session budget and pacing policy.
//!
//! Pure policy: no I/O and no sleeping. The orchestrator asks it whether to
//! proceed, whether to recycle the browser, and how long to hold before and
//! after a job. Time is read from `tokio::time::Instant`, which is monotonic.
//! Holds carry random jitter drawn from the configured ranges.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

use crate::config::{JitterRange, SessionLimits};
use crate::types::StopReason;

/// Verdict of [`SessionBudget::allow_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    Proceed,
    Terminate(StopReason),
}

/// In-memory budget of one run. Discarded when the run ends.
#[derive(Debug)]
pub struct SessionBudget {
    limits: SessionLimits,
    run_started: Instant,
    session_started: Instant,
    jobs_processed: u32,
    session_jobs: u32,
    job_started: Option<Instant>,
    last_outcome: Option<Instant>,
    consecutive_throttles: u32,
    run_throttles: u32,
    forced_restart: bool,
    rng: StdRng,
}

impl SessionBudget {
    pub fn new(limits: SessionLimits) -> Self {
        Self::with_rng(limits, StdRng::from_entropy())
    }

    /// Budget with a caller-supplied jitter source.
    pub fn with_rng(limits: SessionLimits, rng: StdRng) -> Self {
        let now = Instant::now();
        Self {
            limits,
            run_started: now,
            session_started: now,
            jobs_processed: 0,
            session_jobs: 0,
            job_started: None,
            last_outcome: None,
            consecutive_throttles: 0,
            run_throttles: 0,
            forced_restart: false,
            rng,
        }
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.limits
    }

    pub fn jobs_processed(&self) -> u32 {
        self.jobs_processed
    }

    pub fn session_jobs(&self) -> u32 {
        self.session_jobs
    }

    /// Whether the run may take on another job.
    pub fn allow_next(&self) -> BudgetDecision {
        if self.jobs_processed >= self.limits.max_jobs_total {
            return BudgetDecision::Terminate(StopReason::MaxJobsReached);
        }
        if self.run_started.elapsed() >= self.limits.max_run_duration() {
            return BudgetDecision::Terminate(StopReason::RunDurationExceeded);
        }
        BudgetDecision::Proceed
    }

    /// Whether the current browser session must be recreated before the next job.
    pub fn needs_session_restart(&self) -> bool {
        if self.forced_restart {
            return true;
        }
        if self.session_jobs >= self.limits.max_jobs_per_session {
            return true;
        }
        match self.limits.max_browser_session_age() {
            Some(max_age) => self.session_jobs > 0 && self.session_started.elapsed() >= max_age,
            None => false,
        }
    }

    /// Start counters for a fresh browser session.
    pub fn reset_session(&mut self) {
        self.session_started = Instant::now();
        self.session_jobs = 0;
        self.forced_restart = false;
    }

    /// Mark the start of a job's processing.
    pub fn record_job_start(&mut self) {
        self.jobs_processed += 1;
        self.session_jobs += 1;
        self.job_started = Some(Instant::now());
    }

    /// Mark the end of a job; returns how long to hold before the next one.
    ///
    /// The hold tops the job up to the minimum per-job duration, plus jitter.
    pub fn record_job_end(&mut self) -> Duration {
        let elapsed = self
            .job_started
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default();
        let jitter = self.jitter(self.limits.job_jitter_ms);
        self.limits
            .min_per_job()
            .saturating_sub(elapsed)
            .saturating_add(jitter)
    }

    /// Time still owed before the next submission may start.
    ///
    /// A job that overran the floor leaves no post-job hold, so the next
    /// submission waits here until the floor has passed since the last
    /// recorded outcome.
    pub fn submission_gap(&self) -> Duration {
        match self.last_outcome {
            Some(at) => self.limits.min_per_job().saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Mark that a processed job's outcome was recorded.
    pub fn record_outcome(&mut self) {
        self.last_outcome = Some(Instant::now());
    }

    /// Hold after a session restart: the cooldown plus jitter.
    pub fn restart_hold(&mut self) -> Duration {
        let jitter = self.jitter(self.limits.restart_jitter_ms);
        self.limits.restart_cooldown().saturating_add(jitter)
    }

    /// Register a throttled job; returns the extra hold to add after it.
    ///
    /// Backoff grows with each consecutive throttle. Reaching
    /// `throttle_restart_after` in a row forces a restart and a cooldown.
    /// Reaching `throttle_total_cooldown_after` across the run triggers a
    /// longer pause that grows with the count. The hold is the largest that
    /// applies.
    pub fn record_throttle(&mut self) -> Duration {
        self.consecutive_throttles += 1;
        self.run_throttles += 1;

        let mut hold = self
            .limits
            .throttle_backoff()
            .saturating_mul(self.consecutive_throttles);

        if self.consecutive_throttles >= self.limits.throttle_restart_after {
            self.forced_restart = true;
            self.consecutive_throttles = 0;
            self.run_throttles = 0;
            return hold.max(self.limits.throttle_cooldown());
        }

        if let Some(after) = self.limits.throttle_total_cooldown_after {
            if self.run_throttles >= after {
                hold = hold.max(self.limits.throttle_total_cooldown(self.run_throttles));
                self.run_throttles = 0;
            }
        }
        hold
    }

    /// Register a job that was not throttled.
    pub fn record_unthrottled(&mut self) {
        self.consecutive_throttles = 0;
    }

    fn jitter(&mut self, range: JitterRange) -> Duration {
        if range.is_none() || range.min_ms > range.max_ms {
            return range.min();
        }
        Duration::from_millis(self.rng.gen_range(range.min_ms..=range.max_ms))
    }
}
