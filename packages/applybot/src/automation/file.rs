//! Postings replayed from a JSON file.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::info;

use crate::error::FetchError;
use crate::traits::{JobFetcher, PostingStream};
use crate::types::{JobPosting, SearchCriteria};

/// Reads a JSON array of postings, e.g. an exported search.
///
/// The search criteria are not applied; the file is the result set.
pub struct JsonFileFetcher {
    path: PathBuf,
}

impl JsonFileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl JobFetcher for JsonFileFetcher {
    async fn search(&self, criteria: &SearchCriteria) -> Result<PostingStream, FetchError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let postings: Vec<JobPosting> = serde_json::from_str(&raw)
            .map_err(|e| FetchError::Parse(format!("{}: {}", self.path.display(), e)))?;

        info!(
            path = %self.path.display(),
            count = postings.len(),
            keywords = %criteria.keywords,
            "loaded postings from file"
        );

        Ok(stream::iter(postings.into_iter().map(Ok)).boxed())
    }
}
