use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::company::CompanyDetails;
use crate::domain::extraction::{ExtractedQuote, QuoteExtractor};
use crate::domain::quote::{ItemField, LineItem, LocalQuoteId, Quote, QuoteField, QuoteStatus};
use crate::errors::{DomainError, LifecycleError, StoreError};
use crate::sync::{
    CollectionScope, QuoteRecord, QuoteStore, RecordId, RecordPatch, RecordStatus, StoredQuote,
};

/// Per-user state the manager is scoped to. Replaces any ambient "current
/// user" lookup: everything the lifecycle needs arrives here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub scope: CollectionScope,
    pub company: CompanyDetails,
}

impl SessionContext {
    pub fn new(scope: CollectionScope, company: CompanyDetails) -> Self {
        Self { scope, company }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub record_id: RecordId,
    /// `true` when this commit created the remote draft, `false` when it
    /// updated an existing one.
    pub created: bool,
    pub quote: Quote,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentReceipt {
    pub record_id: RecordId,
    /// `true` when no draft existed and the send created the record.
    pub created: bool,
    pub total: Decimal,
    /// The quote exactly as it was sent, status `Sent`.
    pub quote: Quote,
}

/// Owns the single editable quote of a session and decides, for every
/// lifecycle step, whether the remote record is created or updated.
///
/// Remote writes are bounded: one create when the extraction is first
/// committed and one update when the quote is sent. Field and item edits in
/// between only touch local state. Status only advances once the matching
/// remote call has succeeded.
///
/// Extraction, commit and send are serialized by a busy flag; a call made
/// while another is in flight fails with [`LifecycleError::Busy`] without
/// touching the store.
pub struct DraftManager<S> {
    store: S,
    context: SessionContext,
    quote: Mutex<Quote>,
    busy: AtomicBool,
    last_local_id: AtomicU64,
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<S> DraftManager<S>
where
    S: QuoteStore,
{
    pub fn new(store: S, context: SessionContext) -> Self {
        Self {
            store,
            context,
            quote: Mutex::new(Quote::new(LocalQuoteId(1))),
            busy: AtomicBool::new(false),
            last_local_id: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn snapshot(&self) -> Quote {
        self.lock_quote().clone()
    }

    pub fn status(&self) -> QuoteStatus {
        self.lock_quote().status()
    }

    pub fn total(&self) -> Decimal {
        self.lock_quote().total()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs `extractor` on the transcript and commits the result, holding the
    /// busy flag across both steps so a second recording cannot start a
    /// competing create.
    pub async fn record_and_commit<E>(
        &self,
        extractor: &E,
        transcript: &str,
    ) -> Result<CommitOutcome, LifecycleError>
    where
        E: QuoteExtractor + ?Sized,
    {
        let _guard = self.acquire("record_and_commit")?;
        let local_id = self.lock_quote().local_id;
        info!(
            event_name = "draft.extraction.started",
            scope = %self.context.scope,
            local_id = local_id.0,
            transcript_chars = transcript.chars().count(),
            "extracting quote from transcript"
        );

        let extraction = extractor.extract(transcript).await.map_err(|error| {
            warn!(
                event_name = "draft.extraction.failed",
                scope = %self.context.scope,
                local_id = local_id.0,
                error = %error,
                "extraction failed; draft not advanced"
            );
            LifecycleError::from(error)
        })?;

        self.commit_locked(extraction).await
    }

    /// Applies an extraction to the quote and saves it as a remote draft:
    /// create when the quote has never been persisted, update otherwise.
    pub async fn commit_extraction(
        &self,
        extraction: ExtractedQuote,
    ) -> Result<CommitOutcome, LifecycleError> {
        let _guard = self.acquire("commit_extraction")?;
        self.commit_locked(extraction).await
    }

    async fn commit_locked(
        &self,
        extraction: ExtractedQuote,
    ) -> Result<CommitOutcome, LifecycleError> {
        let snapshot = {
            let mut quote = self.lock_quote();
            let status = quote.status();
            if status != QuoteStatus::Draft && !quote.can_transition_to(QuoteStatus::Draft) {
                return Err(DomainError::InvalidQuoteTransition {
                    from: status,
                    to: QuoteStatus::Draft,
                }
                .into());
            }
            merge_extraction(&mut quote, extraction);
            quote.clone()
        };

        let now = Utc::now();
        let (record_id, created) = match snapshot.remote_id() {
            None => {
                let record = QuoteRecord::from_quote(&snapshot, RecordStatus::Draft, now);
                let id = self
                    .store
                    .create(&self.context.scope, record)
                    .await
                    .map_err(|error| self.persistence_failure("create", &snapshot, error))?;
                (id, true)
            }
            Some(id) => {
                self.store
                    .update(
                        &self.context.scope,
                        id,
                        RecordPatch::from_quote(&snapshot, RecordStatus::Draft),
                    )
                    .await
                    .map_err(|error| self.persistence_failure("update", &snapshot, error))?;
                (id.clone(), false)
            }
        };

        let quote = {
            let mut quote = self.lock_quote();
            quote.assign_remote_id(record_id.clone())?;
            if quote.created_at.is_none() {
                quote.created_at = Some(now);
            }
            advance_to_review(&mut quote)?;
            quote.clone()
        };

        let event_name = if created { "draft.created" } else { "draft.updated" };
        info!(
            event_name,
            scope = %self.context.scope,
            local_id = quote.local_id.0,
            record_id = %record_id,
            item_count = quote.items.len(),
            total = %quote.total(),
            "draft saved; awaiting review"
        );

        Ok(CommitOutcome { record_id, created, quote })
    }

    pub fn update_field(
        &self,
        field: QuoteField,
        value: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        let mut quote = self.editable_quote()?;
        quote.set_field(field, value);
        Ok(())
    }

    pub fn add_item(&self) -> Result<u32, LifecycleError> {
        let mut quote = self.editable_quote()?;
        Ok(quote.push_blank_item())
    }

    pub fn update_item(
        &self,
        item_id: u32,
        field: ItemField,
        raw: &str,
    ) -> Result<(), LifecycleError> {
        let mut quote = self.editable_quote()?;
        quote.set_item_field(item_id, field, raw)?;
        Ok(())
    }

    pub fn delete_item(&self, item_id: u32) -> Result<LineItem, LifecycleError> {
        let mut quote = self.editable_quote()?;
        Ok(quote.remove_item(item_id)?)
    }

    /// Commits the quote as sent. Updates the draft record when one exists;
    /// otherwise creates the record directly as sent. On success the session
    /// starts over with a fresh quote. On failure nothing local changes, so
    /// the user can retry.
    pub async fn finalize_send(&self) -> Result<SentReceipt, LifecycleError> {
        let _guard = self.acquire("finalize_send")?;
        let mut sent = self.snapshot();
        sent.transition_to(QuoteStatus::Sent)?;
        let total = sent.total();

        let now = Utc::now();
        let (record_id, created) = match sent.remote_id() {
            Some(id) => {
                self.store
                    .update(
                        &self.context.scope,
                        id,
                        RecordPatch::from_quote(&sent, RecordStatus::Sent),
                    )
                    .await
                    .map_err(|error| self.persistence_failure("update", &sent, error))?;
                (id.clone(), false)
            }
            None => {
                let record = QuoteRecord::from_quote(&sent, RecordStatus::Sent, now);
                let id = self
                    .store
                    .create(&self.context.scope, record)
                    .await
                    .map_err(|error| self.persistence_failure("create", &sent, error))?;
                (id, true)
            }
        };

        sent.assign_remote_id(record_id.clone())?;
        if sent.created_at.is_none() {
            sent.created_at = Some(now);
        }

        let fresh = self.reset_quote();
        info!(
            event_name = "draft.sent",
            scope = %self.context.scope,
            local_id = sent.local_id.0,
            next_local_id = fresh.0,
            record_id = %record_id,
            created,
            total = %total,
            "quote sent; session reset"
        );

        Ok(SentReceipt { record_id, created, total, quote: sent })
    }

    /// Reopens a saved remote draft in this session for review.
    pub fn resume(&self, stored: &StoredQuote) -> Result<Quote, LifecycleError> {
        let _guard = self.acquire("resume")?;
        let local_id = self.allocate_local_id();
        let quote = stored.to_review_quote(local_id)?;
        *self.lock_quote() = quote.clone();
        info!(
            event_name = "draft.resumed",
            scope = %self.context.scope,
            local_id = local_id.0,
            record_id = %stored.id,
            "saved draft reopened for review"
        );
        Ok(quote)
    }

    /// Throws away local work and starts a fresh quote. Any remote draft is
    /// left as history.
    pub fn discard(&self) -> Result<LocalQuoteId, LifecycleError> {
        let _guard = self.acquire("discard")?;
        Ok(self.reset_quote())
    }

    fn reset_quote(&self) -> LocalQuoteId {
        let local_id = self.allocate_local_id();
        *self.lock_quote() = Quote::new(local_id);
        local_id
    }

    fn allocate_local_id(&self) -> LocalQuoteId {
        LocalQuoteId(self.last_local_id.fetch_add(1, Ordering::AcqRel) + 1)
    }

    fn acquire(&self, operation: &'static str) -> Result<BusyGuard<'_>, LifecycleError> {
        if self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            warn!(
                event_name = "draft.busy_rejected",
                scope = %self.context.scope,
                operation,
                "rejected while another lifecycle operation is in flight"
            );
            return Err(LifecycleError::Busy);
        }
        Ok(BusyGuard { flag: &self.busy })
    }

    /// Local edits are refused while a lifecycle call is awaiting the store;
    /// that call owns the quote until it resolves.
    fn editable_quote(&self) -> Result<MutexGuard<'_, Quote>, LifecycleError> {
        if self.is_busy() {
            warn!(
                event_name = "draft.edit_rejected",
                scope = %self.context.scope,
                "edit rejected while a lifecycle operation is in flight"
            );
            return Err(LifecycleError::Busy);
        }
        let quote = self.lock_quote();
        if quote.status() == QuoteStatus::Sent {
            return Err(DomainError::InvariantViolation(
                "sent quotes are read-only".to_string(),
            )
            .into());
        }
        Ok(quote)
    }

    fn lock_quote(&self) -> MutexGuard<'_, Quote> {
        match self.quote.lock() {
            Ok(quote) => quote,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persistence_failure(
        &self,
        operation: &'static str,
        quote: &Quote,
        error: StoreError,
    ) -> LifecycleError {
        warn!(
            event_name = "draft.persistence_failed",
            scope = %self.context.scope,
            local_id = quote.local_id.0,
            operation,
            error = %error,
            "remote write failed; local quote kept for retry"
        );
        LifecycleError::Persistence(error)
    }
}

/// Extraction owns the job description; the client's name typed by the user
/// wins over the extracted one, and the email is never extracted.
fn merge_extraction(quote: &mut Quote, extraction: ExtractedQuote) {
    quote.job_address = extraction.job_address;
    quote.scope_summary = extraction.scope_summary;
    quote.items = extraction.items;
    if quote.client_name.trim().is_empty() {
        quote.client_name = extraction.client_name;
    }
}

fn advance_to_review(quote: &mut Quote) -> Result<(), DomainError> {
    if quote.status() != QuoteStatus::Draft {
        quote.transition_to(QuoteStatus::Draft)?;
    }
    quote.transition_to(QuoteStatus::ReviewPending)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::{watch, Notify};

    use super::{DraftManager, SessionContext};
    use crate::domain::company::CompanyDetails;
    use crate::domain::extraction::{ExtractedQuote, QuoteExtractor};
    use crate::domain::quote::{ItemField, LineItem, QuoteField, QuoteStatus};
    use crate::errors::{ExtractionError, LifecycleError, StoreError};
    use crate::sync::{
        CollectionScope, QuoteRecord, QuoteStore, RecordId, RecordPatch, RecordStatus,
        StoredQuote, Subscription,
    };

    #[derive(Clone, Debug, PartialEq)]
    enum StoreCall {
        Create(QuoteRecord),
        Update(RecordId, RecordPatch),
    }

    /// Scripted store: hands out ids from a queue, records every call, and
    /// can fail or park the next write.
    #[derive(Default)]
    struct RecordingStore {
        ids: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<StoreCall>>,
        fail_writes: AtomicBool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    impl RecordingStore {
        fn with_ids(ids: &[&str]) -> Self {
            Self {
                ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
                ..Self::default()
            }
        }

        fn gated(ids: &[&str], entered: Arc<Notify>, release: Arc<Notify>) -> Self {
            Self { gate: Some((entered, release)), ..Self::with_ids(ids) }
        }

        fn calls(&self) -> Vec<StoreCall> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }

        fn creates(&self) -> usize {
            self.calls().iter().filter(|call| matches!(call, StoreCall::Create(_))).count()
        }

        async fn write(&self, call: StoreCall) -> Result<(), StoreError> {
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("offline".to_string()));
            }
            self.calls.lock().map_err(|_| StoreError::Backend("poisoned".to_string()))?.push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl QuoteStore for RecordingStore {
        async fn create(
            &self,
            _scope: &CollectionScope,
            record: QuoteRecord,
        ) -> Result<RecordId, StoreError> {
            self.write(StoreCall::Create(record)).await?;
            let id = self
                .ids
                .lock()
                .map_err(|_| StoreError::Backend("poisoned".to_string()))?
                .pop_front()
                .unwrap_or_else(|| "generated".to_string());
            Ok(RecordId(id))
        }

        async fn update(
            &self,
            _scope: &CollectionScope,
            id: &RecordId,
            patch: RecordPatch,
        ) -> Result<(), StoreError> {
            self.write(StoreCall::Update(id.clone(), patch)).await
        }

        async fn subscribe(&self, scope: &CollectionScope) -> Result<Subscription, StoreError> {
            let (_sender, receiver) = watch::channel(Vec::new());
            Ok(Subscription::new(scope.clone(), receiver))
        }

        async fn get(
            &self,
            _scope: &CollectionScope,
            _id: &RecordId,
        ) -> Result<Option<StoredQuote>, StoreError> {
            Ok(None)
        }

        async fn list(&self, _scope: &CollectionScope) -> Result<Vec<StoredQuote>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct FixedExtractor(Result<ExtractedQuote, ExtractionError>);

    #[async_trait]
    impl QuoteExtractor for FixedExtractor {
        async fn extract(&self, _transcript: &str) -> Result<ExtractedQuote, ExtractionError> {
            self.0.clone()
        }
    }

    fn manager(store: RecordingStore) -> DraftManager<Arc<RecordingStore>> {
        DraftManager::new(
            Arc::new(store),
            SessionContext::new(CollectionScope::for_user("tradie-1"), CompanyDetails::default()),
        )
    }

    fn line(id: u32, description: &str, qty: i64, price: i64) -> LineItem {
        LineItem {
            id,
            description: description.to_string(),
            qty: Decimal::from(qty),
            price: Decimal::from(price),
        }
    }

    fn extraction() -> ExtractedQuote {
        ExtractedQuote {
            client_name: "A Smith".to_string(),
            job_address: "12 Gum St".to_string(),
            scope_summary: "Repaint the lounge".to_string(),
            items: vec![line(1, "Paint wall", 2, 50)],
        }
    }

    #[tokio::test]
    async fn first_commit_creates_and_second_updates() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));

        let first = drafts.commit_extraction(extraction()).await.expect("first commit");
        assert!(first.created);
        assert_eq!(first.record_id, RecordId("abc123".to_string()));
        assert_eq!(first.quote.status(), QuoteStatus::ReviewPending);
        assert!(first.quote.created_at.is_some());

        let mut again = extraction();
        again.items.push(line(2, "Prime ceiling", 1, 80));
        let second = drafts.commit_extraction(again).await.expect("second commit");
        assert!(!second.created);
        assert_eq!(second.record_id, first.record_id);

        let store = drafts.store();
        assert_eq!(store.creates(), 1);
        let calls = store.calls();
        assert!(matches!(
            &calls[1],
            StoreCall::Update(id, patch)
                if id.0 == "abc123"
                    && patch.status == Some(RecordStatus::Draft)
                    && patch.total == Some(Decimal::from(180))
        ));
    }

    #[tokio::test]
    async fn created_draft_record_is_a_draft_with_totals() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));
        drafts.commit_extraction(extraction()).await.expect("commit");

        let calls = drafts.store().calls();
        let StoreCall::Create(record) = &calls[0] else {
            panic!("expected a create call, got {calls:?}");
        };
        assert_eq!(record.status, RecordStatus::Draft);
        assert_eq!(record.total, Decimal::from(100));
        assert_eq!(record.client_name, "A Smith");
    }

    #[tokio::test]
    async fn user_entered_client_details_survive_extraction() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));
        drafts.update_field(QuoteField::ClientName, "Jo Typed").expect("edit name");
        drafts.update_field(QuoteField::ClientEmail, "jo@example.test").expect("edit email");

        let outcome = drafts.commit_extraction(extraction()).await.expect("commit");
        assert_eq!(outcome.quote.client_name, "Jo Typed");
        assert_eq!(outcome.quote.client_email, "jo@example.test");
        assert_eq!(outcome.quote.job_address, "12 Gum St");
    }

    #[tokio::test]
    async fn send_updates_existing_draft_and_resets_session() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));
        let mut payload = extraction();
        payload.items = vec![line(1, "Labour", 2, 10), line(2, "Materials", 1, 5)];
        drafts.commit_extraction(payload).await.expect("commit");
        let draft_local_id = drafts.snapshot().local_id;

        let receipt = drafts.finalize_send().await.expect("send");
        assert_eq!(receipt.record_id, RecordId("abc123".to_string()));
        assert!(!receipt.created);
        assert_eq!(receipt.total, Decimal::from(25));
        assert_eq!(receipt.quote.status(), QuoteStatus::Sent);

        let calls = drafts.store().calls();
        assert_eq!(calls.len(), 2, "one create and one update per quote");
        assert!(matches!(
            &calls[1],
            StoreCall::Update(id, patch)
                if id.0 == "abc123"
                    && patch.status == Some(RecordStatus::Sent)
                    && patch.total == Some(Decimal::from(25))
        ));

        let fresh = drafts.snapshot();
        assert_eq!(fresh.status(), QuoteStatus::NotStarted);
        assert!(fresh.items.is_empty());
        assert!(fresh.remote_id().is_none());
        assert_ne!(fresh.local_id, draft_local_id);
    }

    #[tokio::test]
    async fn edits_between_draft_and_send_stay_local() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));
        drafts.commit_extraction(extraction()).await.expect("commit");

        let added = drafts.add_item().expect("add item");
        drafts.update_item(added, ItemField::Description, "Sand skirting").expect("describe");
        drafts.update_item(added, ItemField::Qty, "3").expect("qty");
        drafts.update_item(added, ItemField::Price, "20").expect("price");
        drafts.delete_item(1).expect("delete extracted item");
        drafts.update_field(QuoteField::ScopeSummary, "Skirting only").expect("scope");

        assert_eq!(drafts.store().calls().len(), 1, "edits must not write remotely");
        assert_eq!(drafts.total(), Decimal::from(60));

        let receipt = drafts.finalize_send().await.expect("send");
        assert_eq!(receipt.total, Decimal::from(60));
        assert_eq!(receipt.quote.scope_summary, "Skirting only");
    }

    #[tokio::test]
    async fn send_without_draft_creates_sent_record() {
        let drafts = manager(RecordingStore::with_ids(&["hand-built"]));
        let id = drafts.add_item().expect("add item");
        drafts.update_item(id, ItemField::Price, "120").expect("price");

        let receipt = drafts.finalize_send().await.expect("send");
        assert!(receipt.created);
        assert_eq!(receipt.record_id, RecordId("hand-built".to_string()));

        let calls = drafts.store().calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            StoreCall::Create(record)
                if record.status == RecordStatus::Sent && record.total == Decimal::from(120)
        ));
    }

    #[tokio::test]
    async fn failed_create_keeps_extraction_but_not_status() {
        let store = RecordingStore::with_ids(&["abc123"]);
        store.fail_writes.store(true, Ordering::SeqCst);
        let drafts = manager(store);

        let error = drafts.commit_extraction(extraction()).await.expect_err("offline");
        assert!(matches!(error, LifecycleError::Persistence(StoreError::Backend(_))));

        let quote = drafts.snapshot();
        assert_eq!(quote.status(), QuoteStatus::NotStarted);
        assert!(quote.remote_id().is_none());
        assert_eq!(quote.scope_summary, "Repaint the lounge");
        assert!(!drafts.is_busy(), "busy flag must clear on failure");

        drafts.store().fail_writes.store(false, Ordering::SeqCst);
        let receipt = drafts.finalize_send().await.expect("fallback create on send");
        assert!(receipt.created);
        assert_eq!(receipt.quote.scope_summary, "Repaint the lounge");
    }

    #[tokio::test]
    async fn failed_send_preserves_local_edits() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));
        drafts.commit_extraction(extraction()).await.expect("commit");
        drafts.update_field(QuoteField::ClientEmail, "a@smith.test").expect("email");

        drafts.store().fail_writes.store(true, Ordering::SeqCst);
        let error = drafts.finalize_send().await.expect_err("offline send");
        assert_eq!(error.error_class(), "persistence");

        let quote = drafts.snapshot();
        assert_eq!(quote.status(), QuoteStatus::ReviewPending);
        assert_eq!(quote.client_email, "a@smith.test");
        assert_eq!(quote.remote_id(), Some(&RecordId("abc123".to_string())));

        drafts.store().fail_writes.store(false, Ordering::SeqCst);
        let receipt = drafts.finalize_send().await.expect("retry succeeds");
        assert!(!receipt.created);
        assert_eq!(drafts.store().creates(), 1);
    }

    #[tokio::test]
    async fn overlapping_commit_is_rejected_while_create_is_in_flight() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let drafts = Arc::new(manager(RecordingStore::gated(
            &["abc123"],
            entered.clone(),
            release.clone(),
        )));

        let first = tokio::spawn({
            let drafts = drafts.clone();
            async move { drafts.commit_extraction(extraction()).await }
        });
        entered.notified().await;
        assert!(drafts.is_busy());

        let second = drafts.commit_extraction(extraction()).await;
        assert!(matches!(second, Err(LifecycleError::Busy)));
        assert!(matches!(drafts.finalize_send().await, Err(LifecycleError::Busy)));

        release.notify_one();
        let outcome = first.await.expect("task joins").expect("first commit succeeds");
        assert!(outcome.created);
        assert_eq!(drafts.store().creates(), 1);
        assert!(!drafts.is_busy());
    }

    #[tokio::test]
    async fn edits_are_refused_while_send_is_in_flight() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let drafts = Arc::new(manager(RecordingStore::gated(
            &["abc123"],
            entered.clone(),
            release.clone(),
        )));
        drafts.update_field(QuoteField::ClientEmail, "a@smith.test").expect("email");

        let send = tokio::spawn({
            let drafts = drafts.clone();
            async move { drafts.finalize_send().await }
        });
        entered.notified().await;

        let late = drafts.update_field(QuoteField::ClientEmail, "late@edit.test");
        assert!(matches!(late, Err(LifecycleError::Busy)));
        assert!(matches!(drafts.add_item(), Err(LifecycleError::Busy)));
        assert!(matches!(drafts.delete_item(1), Err(LifecycleError::Busy)));

        release.notify_one();
        let receipt = send.await.expect("task joins").expect("send succeeds");
        assert_eq!(receipt.quote.client_email, "a@smith.test");
        assert!(receipt.quote.items.is_empty());

        drafts.update_field(QuoteField::ClientEmail, "next@client.test").expect("edit after send");
        assert_eq!(drafts.snapshot().client_email, "next@client.test");
    }

    #[tokio::test]
    async fn record_and_commit_surfaces_extraction_errors_without_writing() {
        let drafts = manager(RecordingStore::with_ids(&["abc123"]));
        let extractor =
            FixedExtractor(Err(ExtractionError::GenerationService("HTTP 503".to_string())));

        let error = drafts.record_and_commit(&extractor, "replace two taps").await.expect_err("503");
        assert_eq!(error.error_class(), "generation_service");
        assert!(drafts.store().calls().is_empty());
        assert_eq!(drafts.status(), QuoteStatus::NotStarted);
        assert!(!drafts.is_busy());

        let extractor = FixedExtractor(Ok(extraction()));
        let outcome = drafts.record_and_commit(&extractor, "repaint the lounge").await.expect("ok");
        assert!(outcome.created);
    }

    #[tokio::test]
    async fn resume_reopens_saved_draft_for_sending() {
        let drafts = manager(RecordingStore::default());
        let stored = StoredQuote {
            id: RecordId("saved-1".to_string()),
            record: QuoteRecord::from_quote(
                &drafts.snapshot(),
                RecordStatus::Draft,
                chrono::Utc::now(),
            ),
        };

        let quote = drafts.resume(&stored).expect("resume");
        assert_eq!(quote.status(), QuoteStatus::ReviewPending);

        let receipt = drafts.finalize_send().await.expect("send");
        assert!(!receipt.created);
        assert_eq!(receipt.record_id, RecordId("saved-1".to_string()));
    }

    #[tokio::test]
    async fn discard_starts_a_new_quote_without_writing() {
        let drafts = manager(RecordingStore::default());
        drafts.add_item().expect("add");
        let before = drafts.snapshot().local_id;

        let after = drafts.discard().expect("discard");
        assert_ne!(before, after);
        assert!(drafts.snapshot().items.is_empty());
        assert!(drafts.store().calls().is_empty());
    }
}
