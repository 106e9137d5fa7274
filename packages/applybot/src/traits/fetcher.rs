//! Posting source trait.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::FetchError;
use crate::types::{JobPosting, SearchCriteria};

/// Lazy, finite sequence of postings. An `Err` item is fatal for the run.
pub type PostingStream = BoxStream<'static, Result<JobPosting, FetchError>>;

#[async_trait]
pub trait JobFetcher: Send + Sync {
    /// Start a search. Errors here are fatal startup errors for the search.
    async fn search(&self, criteria: &SearchCriteria) -> Result<PostingStream, FetchError>;
}
