use tracing::info;

use crate::errors::StoreError;
use crate::flows::draft::{DraftManager, SessionContext};
use crate::sync::{QuoteStore, StoredQuote, Subscription};

/// Everything tied to one signed-in user: the draft lifecycle and the live
/// history feed. Signing out consumes the session, which tears the feed down
/// so no further snapshots reach a stale identity.
pub struct UserSession<S> {
    drafts: DraftManager<S>,
    history: Option<Subscription>,
}

impl<S> UserSession<S>
where
    S: QuoteStore,
{
    pub async fn sign_in(store: S, context: SessionContext) -> Result<Self, StoreError> {
        let history = store.subscribe(&context.scope).await?;
        info!(
            event_name = "session.signed_in",
            scope = %context.scope,
            "user session started"
        );
        Ok(Self { drafts: DraftManager::new(store, context), history: Some(history) })
    }

    pub fn drafts(&self) -> &DraftManager<S> {
        &self.drafts
    }

    /// Next history snapshot, newest first. `None` after the feed closes.
    pub async fn next_history(&mut self) -> Option<Vec<StoredQuote>> {
        self.history.as_mut()?.next().await
    }

    pub fn sign_out(mut self) {
        if let Some(history) = self.history.take() {
            history.unsubscribe();
        }
        info!(
            event_name = "session.signed_out",
            scope = %self.drafts.context().scope,
            "user session ended"
        );
    }
}
