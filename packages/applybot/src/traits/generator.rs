//! Cover-letter generation trait.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::types::{JobPosting, UserProfile};

#[async_trait]
pub trait CoverLetterGenerator: Send + Sync {
    /// Draft a cover letter for `posting`. One attempt; callers do not retry.
    async fn generate(
        &self,
        profile: &UserProfile,
        posting: &JobPosting,
    ) -> Result<String, GenerationError>;
}
