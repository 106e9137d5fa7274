//! Collaborator seams.
//!
//! - `JobFetcher`: yields postings for a search
//! - `Automator`: owns browser sessions and performs Easy-Apply submissions
//! - `CoverLetterGenerator`: drafts a cover letter from profile + posting
//! - `ApplicationStore`: durable outcome records, the authoritative dedup guard

pub mod automator;
pub mod fetcher;
pub mod generator;
pub mod store;

pub use automator::Automator;
pub use fetcher::{JobFetcher, PostingStream};
pub use generator::CoverLetterGenerator;
pub use store::ApplicationStore;
