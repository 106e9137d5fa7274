//! Deduplication and posting filters.

use std::sync::Arc;

use crate::error::StoreResult;
use crate::traits::store::ApplicationStore;

/// Has this job already been recorded? Backed by the store's indexed lookup.
pub struct Deduplicator<S: ApplicationStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ApplicationStore + ?Sized> Deduplicator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn is_duplicate(&self, job_id: &str) -> StoreResult<bool> {
        self.store.exists(job_id).await
    }
}

/// Case-insensitive substring matcher over a fixed keyword list.
///
/// Keywords are matched in list order and the first hit wins, so the
/// reported keyword is deterministic. Blank keywords are dropped.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    /// (original, lowercased)
    keywords: Vec<(String, String)>,
}

impl KeywordMatcher {
    pub fn new(keywords: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| {
                let lower = k.to_lowercase();
                (k, lower)
            })
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// First keyword contained in `text`, as configured.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .find(|(_, lower)| text.contains(lower.as_str()))
            .map(|(original, _)| original.as_str())
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }
}

/// Title exclusion check.
pub fn is_excluded(title: &str, exclusion_keywords: &[String]) -> bool {
    KeywordMatcher::new(exclusion_keywords).matches(title)
}

/// Filters applied to each posting after dedup.
#[derive(Debug, Clone, Default)]
pub struct PostingFilter {
    exclusions: KeywordMatcher,
    cover_letter_triggers: KeywordMatcher,
}

impl PostingFilter {
    pub fn new(
        exclusions: impl IntoIterator<Item = impl AsRef<str>>,
        cover_letter_triggers: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            exclusions: KeywordMatcher::new(exclusions),
            cover_letter_triggers: KeywordMatcher::new(cover_letter_triggers),
        }
    }

    /// The exclusion keyword the title hits, if any.
    pub fn excluded_by(&self, title: &str) -> Option<&str> {
        self.exclusions.first_match(title)
    }

    /// Whether the description warrants a cover letter.
    ///
    /// With no triggers configured every posting qualifies.
    pub fn wants_cover_letter(&self, description: Option<&str>) -> bool {
        if self.cover_letter_triggers.is_empty() {
            return true;
        }
        description.is_some_and(|d| self.cover_letter_triggers.matches(d))
    }
}
