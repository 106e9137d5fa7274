//! Durable application records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::posting::JobPosting;

/// Terminal status of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Skipped,
    /// The form needs answers only a human can give.
    ManualReview,
    Error,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        Self::Applied,
        Self::Skipped,
        Self::ManualReview,
        Self::Error,
    ];

    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::ManualReview => "manual_review",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(Self::Applied),
            "skipped" => Ok(Self::Skipped),
            "manual_review" | "manual-review" => Ok(Self::ManualReview),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown application status '{}'", other)),
        }
    }
}

/// One row per distinct job identifier. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Platform job identifier (unique key)
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub url: String,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    /// When the decision was made
    pub applied_at: DateTime<Utc>,
    /// Skip reason, error detail, follow-up hints
    pub notes: Option<String>,
}

impl ApplicationRecord {
    /// Create a record for a posting, stamped now.
    pub fn for_posting(posting: &JobPosting, status: ApplicationStatus) -> Self {
        Self {
            job_id: posting.id.clone(),
            title: posting.title.clone(),
            company: posting.company.clone(),
            location: (!posting.location.is_empty()).then(|| posting.location.clone()),
            url: posting.url.clone(),
            status,
            cover_letter: None,
            applied_at: Utc::now(),
            notes: None,
        }
    }

    pub fn with_cover_letter(mut self, cover_letter: Option<String>) -> Self {
        self.cover_letter = cover_letter;
        self
    }

    /// Set notes; empty strings are stored as NULL.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = (!notes.is_empty()).then_some(notes);
        self
    }
}

/// Per-status record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub applied: u64,
    pub skipped: u64,
    pub manual_review: u64,
    pub error: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: ApplicationStatus, n: u64) {
        match status {
            ApplicationStatus::Applied => self.applied += n,
            ApplicationStatus::Skipped => self.skipped += n,
            ApplicationStatus::ManualReview => self.manual_review += n,
            ApplicationStatus::Error => self.error += n,
        }
    }

    pub fn get(&self, status: ApplicationStatus) -> u64 {
        match status {
            ApplicationStatus::Applied => self.applied,
            ApplicationStatus::Skipped => self.skipped,
            ApplicationStatus::ManualReview => self.manual_review,
            ApplicationStatus::Error => self.error,
        }
    }

    pub fn total(&self) -> u64 {
        self.applied + self.skipped + self.manual_review + self.error
    }
}
