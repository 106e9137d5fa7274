//! Process and run configuration.
//!
//! [`Config`] carries secrets and endpoints from the environment.
//! [`RunConfig`] carries the search and pacing settings of one run. Both are
//! built once at startup and handed down; nothing reads ambient state later.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::security::SecretString;
use crate::types::SearchCriteria;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub automation_url: Option<String>,
    /// Also write logs to daily files in this directory
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        let automation_url = env::var("AUTOMATION_URL").ok();
        if let Some(raw) = &automation_url {
            url::Url::parse(raw).map_err(|e| {
                ConfigError::Invalid(format!("AUTOMATION_URL must be a valid URL: {}", e))
            })?;
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://applications.db?mode=rwc".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            automation_url,
            log_dir: env::var("LOG_DIR")
                .ok()
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Settings of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub search: SearchCriteria,

    /// Titles containing any of these (case-insensitive) are skipped.
    pub exclude_title_keywords: Vec<String>,

    pub limits: SessionLimits,

    pub cover_letter: CoverLetterConfig,

    /// Resume file uploaded with each application
    pub resume_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            search: SearchCriteria::default(),
            exclude_title_keywords: ["junior", "jr.", "entry level", "intern", "internship"]
                .into_iter()
                .map(String::from)
                .collect(),
            limits: SessionLimits::default(),
            cover_letter: CoverLetterConfig::default(),
            resume_path: None,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn with_search(mut self, search: SearchCriteria) -> Self {
        self.search = search;
        self
    }

    pub fn with_exclusions(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_title_keywords = keywords.into_iter().map(|k| k.into()).collect();
        self
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cover_letter(mut self, cover_letter: CoverLetterConfig) -> Self {
        self.cover_letter = cover_letter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        if self.cover_letter.enabled && self.cover_letter.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "cover_letter.timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Ceilings and pacing for the session budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Submissions allowed in one run
    pub max_jobs_total: u32,

    /// Submissions before the browser session is recreated
    pub max_jobs_per_session: u32,

    /// Floor on the time spent per submitted job
    pub min_seconds_per_job: u64,

    /// Wall-clock ceiling of the whole run
    pub max_session_duration_secs: u64,

    /// Recreate the browser once it is older than this
    pub max_browser_session_age_secs: Option<u64>,

    /// Hold after every session restart
    pub restart_cooldown_secs: u64,

    /// Random extra hold after every submitted job
    pub job_jitter_ms: JitterRange,

    /// Random extra hold on top of the restart cooldown
    pub restart_jitter_ms: JitterRange,

    /// Extra hold per consecutive throttled job
    pub throttle_backoff_secs: u64,

    /// Consecutive throttles that force a session restart
    pub throttle_restart_after: u32,

    /// Pause taken when consecutive throttles force a restart
    pub throttle_cooldown_secs: u64,

    /// Throttles within a run that trigger a long pause. `None` disables it.
    pub throttle_total_cooldown_after: Option<u32>,

    /// Long pause length: `base + step * throttles so far`
    pub throttle_total_cooldown_base_secs: u64,
    pub throttle_total_cooldown_step_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_jobs_total: 40,
            max_jobs_per_session: 15,
            min_seconds_per_job: 30,
            max_session_duration_secs: 40 * 60,
            max_browser_session_age_secs: None,
            restart_cooldown_secs: 5,
            job_jitter_ms: JitterRange::new(4_000, 6_000),
            restart_jitter_ms: JitterRange::new(0, 5_000),
            throttle_backoff_secs: 30,
            throttle_restart_after: 3,
            throttle_cooldown_secs: 10 * 60,
            throttle_total_cooldown_after: Some(5),
            throttle_total_cooldown_base_secs: 5 * 60,
            throttle_total_cooldown_step_secs: 2 * 60,
        }
    }
}

impl SessionLimits {
    pub fn min_per_job(&self) -> Duration {
        Duration::from_secs(self.min_seconds_per_job)
    }

    pub fn max_run_duration(&self) -> Duration {
        Duration::from_secs(self.max_session_duration_secs)
    }

    pub fn max_browser_session_age(&self) -> Option<Duration> {
        self.max_browser_session_age_secs.map(Duration::from_secs)
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_secs(self.restart_cooldown_secs)
    }

    pub fn throttle_backoff(&self) -> Duration {
        Duration::from_secs(self.throttle_backoff_secs)
    }

    pub fn throttle_cooldown(&self) -> Duration {
        Duration::from_secs(self.throttle_cooldown_secs)
    }

    /// Long pause after `throttles` throttled jobs in the run.
    pub fn throttle_total_cooldown(&self, throttles: u32) -> Duration {
        Duration::from_secs(
            self.throttle_total_cooldown_step_secs
                .saturating_mul(u64::from(throttles))
                .saturating_add(self.throttle_total_cooldown_base_secs),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_jobs_per_session == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_jobs_per_session must be > 0".into(),
            ));
        }
        if self.throttle_restart_after == 0 {
            return Err(ConfigError::Invalid(
                "limits.throttle_restart_after must be > 0".into(),
            ));
        }
        if self.max_browser_session_age_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "limits.max_browser_session_age_secs must be > 0 when set".into(),
            ));
        }
        if self.throttle_total_cooldown_after == Some(0) {
            return Err(ConfigError::Invalid(
                "limits.throttle_total_cooldown_after must be > 0 when set".into(),
            ));
        }
        self.job_jitter_ms.validate("limits.job_jitter_ms")?;
        self.restart_jitter_ms.validate("limits.restart_jitter_ms")?;
        Ok(())
    }
}

/// Inclusive range of a random hold, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitterRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl JitterRange {
    pub const NONE: Self = Self::new(0, 0);

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn is_none(&self) -> bool {
        self.max_ms == 0
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::Invalid(format!(
                "{}: min_ms {} exceeds max_ms {}",
                field, self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Cover-letter generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverLetterConfig {
    pub enabled: bool,

    /// Generate only when the description mentions one of these.
    /// Empty means always.
    pub triggers: Vec<String>,

    pub timeout_secs: u64,
}

impl Default for CoverLetterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            triggers: Vec::new(),
            timeout_secs: 60,
        }
    }
}

impl CoverLetterConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_triggers(mut self, triggers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.triggers = triggers.into_iter().map(|t| t.into()).collect();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
