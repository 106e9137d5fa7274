//! Job postings and the search criteria that produce them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A job posting as yielded by a [`JobFetcher`](crate::traits::fetcher::JobFetcher).
///
/// Immutable once produced and consumed exactly once by the run loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    /// Platform-assigned identifier; the dedup key.
    pub id: String,

    pub title: String,

    pub company: String,

    #[serde(default)]
    pub location: String,

    pub url: String,

    /// Recruiter or hiring contact shown on the posting, if any.
    #[serde(default)]
    pub recruiter: Option<RecruiterContact>,

    /// Full description text, when the fetcher retrieved it.
    #[serde(default)]
    pub description: Option<String>,

    /// The platform already shows this job as applied.
    #[serde(default)]
    pub already_applied: bool,
}

impl JobPosting {
    /// Create a posting with the required fields.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            company: company.into(),
            location: String::new(),
            url: url.into(),
            recruiter: None,
            description: None,
            already_applied: false,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_recruiter(mut self, recruiter: RecruiterContact) -> Self {
        self.recruiter = Some(recruiter);
        self
    }

    pub fn marked_applied(mut self) -> Self {
        self.already_applied = true;
        self
    }
}

/// Recruiter contact attached to a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterContact {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// How far back a search looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFilter {
    Day,
    #[default]
    Week,
    Month,
}

impl TimeFilter {
    /// Platform query value for the "date posted" facet.
    pub fn platform_code(&self) -> &'static str {
        match self {
            Self::Day => "r86400",
            Self::Week => "r604800",
            Self::Month => "r2592000",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown time filter '{}' (expected day, week or month)", other)),
        }
    }
}

/// Search parameters handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Keyword query; may contain `OR`-composed quoted phrases.
    pub keywords: String,

    pub location: String,

    #[serde(default)]
    pub time_filter: TimeFilter,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            location: "Remote".to_string(),
            time_filter: TimeFilter::Week,
        }
    }
}

impl SearchCriteria {
    pub fn new(keywords: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_time_filter(mut self, time_filter: TimeFilter) -> Self {
        self.time_filter = time_filter;
        self
    }
}
