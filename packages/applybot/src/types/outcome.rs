//! Per-job and per-run outcomes.

use serde::{Deserialize, Serialize};

use super::record::{ApplicationStatus, StatusCounts};

/// What the automator reports for a completed Easy-Apply attempt.
///
/// Failures are carried separately as [`AutomationError`](crate::error::AutomationError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// The form has custom questions the automator cannot answer.
    RequiresManualFields { detail: Option<String> },
}

/// Result of the per-job step, replacing exceptions as skip signalling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Applied,
    Skipped { reason: String },
    ManualReview { detail: Option<String> },
    Error { detail: String },
}

impl JobOutcome {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            Self::Applied => ApplicationStatus::Applied,
            Self::Skipped { .. } => ApplicationStatus::Skipped,
            Self::ManualReview { .. } => ApplicationStatus::ManualReview,
            Self::Error { .. } => ApplicationStatus::Error,
        }
    }

    /// Note text persisted alongside the status.
    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Applied => None,
            Self::Skipped { reason } => Some(reason),
            Self::ManualReview { detail } => detail.as_deref(),
            Self::Error { detail } => Some(detail),
        }
    }
}

impl From<SubmitOutcome> for JobOutcome {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Submitted => Self::Applied,
            SubmitOutcome::RequiresManualFields { detail } => Self::ManualReview { detail },
        }
    }
}

/// Why the run loop stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The posting sequence ran out.
    #[default]
    Exhausted,
    MaxJobsReached,
    RunDurationExceeded,
    Cancelled,
}

/// Aggregate of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records written by this run, per status
    pub counts: StatusCounts,
    /// Postings skipped because a record already existed
    pub duplicates: u64,
    /// Postings that reached a submission attempt
    pub submissions: u64,
    pub session_restarts: u64,
    pub stop_reason: StopReason,
}

impl RunSummary {
    pub fn applied(&self) -> u64 {
        self.counts.applied
    }

    pub fn skipped(&self) -> u64 {
        self.counts.skipped
    }

    pub fn manual_review(&self) -> u64 {
        self.counts.manual_review
    }

    pub fn errors(&self) -> u64 {
        self.counts.error
    }
}
