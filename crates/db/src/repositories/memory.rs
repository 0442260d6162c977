use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quickquote_core::errors::StoreError;
use quickquote_core::sync::{
    sort_newest_first, CollectionScope, QuoteRecord, QuoteStore, RecordId, RecordPatch,
    StoredQuote, Subscription,
};

use super::ScopeFeeds;

type ScopeRecords = BTreeMap<RecordId, QuoteRecord>;

/// Process-local store with the same create/update/subscribe contract as the
/// SQLite store. Writes can be made to fail on demand.
#[derive(Default)]
pub struct InMemoryQuoteStore {
    records: RwLock<HashMap<CollectionScope, ScopeRecords>>,
    feeds: ScopeFeeds,
    fail_next_create: AtomicBool,
    fail_next_update: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryQuoteStore {
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    /// Successful creates plus updates so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn feeds(&self) -> &ScopeFeeds {
        &self.feeds
    }

    fn injected_failure(flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("injected {operation} failure")));
        }
        Ok(())
    }

    fn snapshot(scope_records: Option<&ScopeRecords>) -> Vec<StoredQuote> {
        let records = scope_records
            .map(|records| {
                records
                    .iter()
                    .map(|(id, record)| StoredQuote { id: id.clone(), record: record.clone() })
                    .collect()
            })
            .unwrap_or_default();
        sort_newest_first(records)
    }
}

#[async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn create(
        &self,
        scope: &CollectionScope,
        record: QuoteRecord,
    ) -> Result<RecordId, StoreError> {
        Self::injected_failure(&self.fail_next_create, "create")?;

        let id = RecordId(Uuid::new_v4().to_string());
        let snapshot = {
            let mut records = self.records.write().await;
            let scope_records = records.entry(scope.clone()).or_default();
            scope_records.insert(id.clone(), record);
            Self::snapshot(Some(scope_records))
        };

        self.writes.fetch_add(1, Ordering::SeqCst);
        self.feeds.publish(scope, snapshot);
        Ok(id)
    }

    async fn update(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
        patch: RecordPatch,
    ) -> Result<(), StoreError> {
        Self::injected_failure(&self.fail_next_update, "update")?;

        let snapshot = {
            let mut records = self.records.write().await;
            let scope_records =
                records.get_mut(scope).ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let record =
                scope_records.get_mut(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
            record.apply(patch);
            Self::snapshot(Some(scope_records))
        };

        self.writes.fetch_add(1, Ordering::SeqCst);
        self.feeds.publish(scope, snapshot);
        Ok(())
    }

    async fn subscribe(&self, scope: &CollectionScope) -> Result<Subscription, StoreError> {
        let current = {
            let records = self.records.read().await;
            Self::snapshot(records.get(scope))
        };
        Ok(self.feeds.subscribe(scope, current))
    }

    async fn get(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
    ) -> Result<Option<StoredQuote>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(scope)
            .and_then(|scope_records| scope_records.get(id))
            .map(|record| StoredQuote { id: id.clone(), record: record.clone() }))
    }

    async fn list(&self, scope: &CollectionScope) -> Result<Vec<StoredQuote>, StoreError> {
        let records = self.records.read().await;
        Ok(Self::snapshot(records.get(scope)))
    }
}
