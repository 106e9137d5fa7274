//! HTTP client for the browser-automation sidecar.
//!
//! The sidecar owns the real browser. This client speaks its small REST API:
//!
//! - `GET /jobs?keywords&location&time_filter&page` → `{ postings, has_more }`
//! - `POST /sessions` → `{ session_id }`
//! - `POST /sessions/{id}/applications` → `{ result, detail? }`
//! - `DELETE /sessions/{id}`
//!
//! Failures come back as `{ error, detail }` with a non-success status; 429
//! always means the platform throttled us.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AutomationError, FetchError};
use crate::traits::{Automator, JobFetcher, PostingStream};
use crate::types::{JobPosting, SearchCriteria, SubmitOutcome};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the automation sidecar; both fetcher and automator.
#[derive(Clone)]
pub struct SidecarClient {
    http_client: Client,
    base_url: Url,
    resume_path: Option<PathBuf>,
    timeout: Duration,
}

/// A live sidecar browser session.
#[derive(Debug)]
pub struct SidecarSession {
    id: String,
}

impl SidecarSession {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl SidecarClient {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http_client: Client::new(),
            base_url,
            resume_path: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Per-request timeout. Never shorter than `floor`, the per-job minimum,
    /// so a slow form is not cut off before the pacing hold would end anyway.
    pub fn with_timeout(mut self, timeout: Duration, floor: Duration) -> Self {
        self.timeout = timeout.max(floor);
        self
    }

    /// Resume file the sidecar uploads with each application.
    pub fn with_resume(mut self, path: Option<PathBuf>) -> Self {
        self.resume_path = path;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        page: u32,
    ) -> Result<JobsPage, FetchError> {
        let url = self
            .endpoint("jobs")
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let response = self
            .http_client
            .get(url)
            .query(&[
                ("keywords", criteria.keywords.as_str()),
                ("location", criteria.location.as_str()),
                ("time_filter", criteria.time_filter.platform_code()),
            ])
            .query(&[("page", page)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let page: JobsPage = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(page)
    }
}

#[derive(Debug, Deserialize)]
struct JobsPage {
    #[serde(default)]
    postings: Vec<JobPosting>,
    #[serde(default)]
    has_more: bool,
}

#[async_trait]
impl JobFetcher for SidecarClient {
    /// The first page is fetched eagerly so connection and auth problems
    /// surface here; later pages are pulled as the stream is consumed.
    async fn search(&self, criteria: &SearchCriteria) -> Result<PostingStream, FetchError> {
        let first = self.fetch_page(criteria, 0).await?;
        info!(
            count = first.postings.len(),
            has_more = first.has_more,
            "fetched first page of postings"
        );

        let first_items = stream::iter(first.postings.into_iter().map(Ok::<_, FetchError>));
        if !first.has_more {
            return Ok(first_items.boxed());
        }

        let client = self.clone();
        let criteria = criteria.clone();
        let rest = stream::try_unfold(Some(1u32), move |page| {
            let client = client.clone();
            let criteria = criteria.clone();
            async move {
                let Some(page) = page else {
                    return Ok::<_, FetchError>(None);
                };
                let fetched = client.fetch_page(&criteria, page).await?;
                debug!(page, count = fetched.postings.len(), "fetched page of postings");
                let next = fetched.has_more.then_some(page + 1);
                Ok(Some((fetched.postings, next)))
            }
        })
        .map_ok(|postings| stream::iter(postings.into_iter().map(Ok::<_, FetchError>)))
        .try_flatten();

        Ok(first_items.chain(rest).boxed())
    }
}

#[derive(Debug, Serialize)]
struct ApplicationRequest<'a> {
    job_id: &'a str,
    url: &'a str,
    title: &'a str,
    company: &'a str,
    cover_letter: Option<&'a str>,
    resume_path: Option<&'a std::path::Path>,
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ApplicationResponse {
    result: String,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Map a sidecar application response to an outcome.
pub(crate) fn interpret_submit(status: u16, body: &str) -> Result<SubmitOutcome, AutomationError> {
    if status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
        return Err(AutomationError::RateLimited(non_empty_or(body, "HTTP 429")));
    }

    if (200..300).contains(&status) {
        let parsed: ApplicationResponse = serde_json::from_str(body)
            .map_err(|e| AutomationError::Other(format!("unreadable sidecar response: {}", e)))?;
        return match parsed.result.as_str() {
            "submitted" => Ok(SubmitOutcome::Submitted),
            "requires_manual_fields" => Ok(SubmitOutcome::RequiresManualFields {
                detail: parsed.detail,
            }),
            other => Err(AutomationError::Other(format!("unknown result '{}'", other))),
        };
    }

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or(ErrorBody {
        error: String::new(),
        detail: None,
    });
    let detail = parsed
        .detail
        .unwrap_or_else(|| non_empty_or(body, &format!("HTTP {}", status)));

    Err(match parsed.error.as_str() {
        "navigation" => AutomationError::Navigation(detail),
        "element_not_found" => AutomationError::ElementNotFound(detail),
        "timeout" => AutomationError::Timeout(detail),
        "rate_limited" => AutomationError::RateLimited(detail),
        "session" => AutomationError::Session(detail),
        _ => AutomationError::Other(format!("HTTP {}: {}", status, detail)),
    })
}

fn non_empty_or(body: &str, fallback: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        fallback.to_string()
    } else {
        body.to_string()
    }
}

fn transport_error(e: reqwest::Error) -> AutomationError {
    if e.is_timeout() {
        AutomationError::Timeout(e.to_string())
    } else {
        AutomationError::Navigation(e.to_string())
    }
}

#[async_trait]
impl Automator for SidecarClient {
    type Session = SidecarSession;

    async fn start_session(&self) -> Result<SidecarSession, AutomationError> {
        let url = self
            .endpoint("sessions")
            .map_err(|e| AutomationError::Session(e.to_string()))?;

        let response = self
            .http_client
            .post(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AutomationError::Session(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AutomationError::Session(format!("{}: {}", status, body)));
        }

        let created: SessionCreated = response
            .json()
            .await
            .map_err(|e| AutomationError::Session(e.to_string()))?;

        debug!(session_id = %created.session_id, "sidecar session created");
        Ok(SidecarSession {
            id: created.session_id,
        })
    }

    async fn submit(
        &self,
        session: &mut SidecarSession,
        posting: &JobPosting,
        cover_letter: Option<&str>,
    ) -> Result<SubmitOutcome, AutomationError> {
        let url = self
            .endpoint(&format!("sessions/{}/applications", session.id))
            .map_err(|e| AutomationError::Other(e.to_string()))?;

        let request = ApplicationRequest {
            job_id: &posting.id,
            url: &posting.url,
            title: &posting.title,
            company: &posting.company,
            cover_letter,
            resume_path: self.resume_path.as_deref(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        interpret_submit(status, &body)
    }

    async fn end_session(&self, session: SidecarSession) {
        let url = match self.endpoint(&format!("sessions/{}", session.id)) {
            Ok(url) => url,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "invalid session url");
                return;
            }
        };

        match self
            .http_client
            .delete(url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(session_id = %session.id, "sidecar session closed");
            }
            Ok(response) => {
                warn!(session_id = %session.id, status = %response.status(), "failed to close sidecar session");
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "failed to close sidecar session");
            }
        }
    }
}
