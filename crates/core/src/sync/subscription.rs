use tokio::sync::watch;
use tracing::debug;

use crate::sync::{CollectionScope, StoredQuote};

/// Live feed of one scope's records.
///
/// The first [`Subscription::next`] resolves immediately with the current
/// record set; later calls wait for the next write to the scope. Every
/// snapshot is the full set, sorted newest first. Dropping the subscription
/// (or calling [`Subscription::unsubscribe`]) tears it down.
pub struct Subscription {
    scope: CollectionScope,
    receiver: watch::Receiver<Vec<StoredQuote>>,
    primed: bool,
}

impl Subscription {
    pub fn new(scope: CollectionScope, receiver: watch::Receiver<Vec<StoredQuote>>) -> Self {
        Self { scope, receiver, primed: false }
    }

    pub fn scope(&self) -> &CollectionScope {
        &self.scope
    }

    /// Next snapshot, or `None` once the store has closed the feed.
    pub async fn next(&mut self) -> Option<Vec<StoredQuote>> {
        if self.primed {
            self.receiver.changed().await.ok()?;
        }
        self.primed = true;

        let snapshot = self.receiver.borrow_and_update().clone();
        debug!(
            event_name = "sync.subscription.snapshot",
            scope = %self.scope,
            record_count = snapshot.len(),
            "history snapshot delivered"
        );
        Some(sort_newest_first(snapshot))
    }

    pub fn unsubscribe(self) {
        debug!(event_name = "sync.subscription.closed", scope = %self.scope, "history feed closed");
    }
}

/// Orders by creation time, newest first; ties fall back to record id so the
/// order is stable across pushes.
pub fn sort_newest_first(mut records: Vec<StoredQuote>) -> Vec<StoredQuote> {
    records.sort_by(|left, right| {
        right.record.created_at.cmp(&left.record.created_at).then_with(|| left.id.cmp(&right.id))
    });
    records
}
