//! Domain types.

pub mod outcome;
pub mod posting;
pub mod profile;
pub mod record;

pub use outcome::{JobOutcome, RunSummary, StopReason, SubmitOutcome};
pub use posting::{JobPosting, RecruiterContact, SearchCriteria, TimeFilter};
pub use profile::{ContactInfo, UserProfile};
pub use record::{ApplicationRecord, ApplicationStatus, StatusCounts};
