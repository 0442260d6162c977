use std::collections::HashMap;
use std::sync::Mutex;

use quickquote_core::sync::{sort_newest_first, CollectionScope, StoredQuote, Subscription};
use tokio::sync::watch;
use tracing::debug;

/// Per-scope broadcast of the full record set. Stores publish after every
/// successful write; subscribers see each new set as one snapshot.
#[derive(Default)]
pub struct ScopeFeeds {
    senders: Mutex<HashMap<CollectionScope, watch::Sender<Vec<StoredQuote>>>>,
}

impl ScopeFeeds {
    /// Opens a subscription primed with `current`.
    pub fn subscribe(&self, scope: &CollectionScope, current: Vec<StoredQuote>) -> Subscription {
        let current = sort_newest_first(current);
        let mut senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let receiver = match senders.get(scope) {
            Some(sender) => {
                sender.send_if_modified(|snapshot| {
                    if *snapshot == current {
                        return false;
                    }
                    *snapshot = current;
                    true
                });
                sender.subscribe()
            }
            None => {
                let (sender, receiver) = watch::channel(current);
                senders.insert(scope.clone(), sender);
                receiver
            }
        };

        debug!(event_name = "store.feed.subscribed", scope = %scope, "history feed opened");
        Subscription::new(scope.clone(), receiver)
    }

    /// Pushes `records` to every live subscriber of `scope`. Feeds nobody is
    /// listening to are dropped.
    pub fn publish(&self, scope: &CollectionScope, records: Vec<StoredQuote>) {
        let mut senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(sender) = senders.get(scope) else {
            return;
        };

        if sender.receiver_count() == 0 {
            senders.remove(scope);
            return;
        }

        sender.send_replace(sort_newest_first(records));
    }

    /// Ends every subscription to `scope`.
    pub fn close(&self, scope: &CollectionScope) {
        let mut senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        senders.remove(scope);
    }

    pub fn has_listeners(&self, scope: &CollectionScope) -> bool {
        let senders = self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        senders.get(scope).is_some_and(|sender| sender.receiver_count() > 0)
    }
}
