//! UI-automation trait.
//!
//! The browser session is a value owned by the caller. The automator creates
//! and destroys it, and borrows it mutably for each submission; a restart is an
//! explicit "end old, start new".

use async_trait::async_trait;

use crate::error::AutomationError;
use crate::types::{JobPosting, SubmitOutcome};

#[async_trait]
pub trait Automator: Send + Sync {
    /// Handle to one live browser session.
    type Session: Send;

    /// Launch a browser and log in.
    async fn start_session(&self) -> Result<Self::Session, AutomationError>;

    /// Run the Easy-Apply flow for one posting.
    ///
    /// May block for the whole page interaction.
    async fn submit(
        &self,
        session: &mut Self::Session,
        posting: &JobPosting,
        cover_letter: Option<&str>,
    ) -> Result<SubmitOutcome, AutomationError>;

    /// Tear a session down. Best effort; failures are logged by implementors.
    async fn end_session(&self, session: Self::Session);

    /// Destroy `session` and construct a fresh one.
    async fn restart_session(
        &self,
        session: Self::Session,
    ) -> Result<Self::Session, AutomationError> {
        self.end_session(session).await;
        self.start_session().await
    }
}
