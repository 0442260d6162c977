//! Contract for the remote document store that holds each user's quotes.
//!
//! The store is the only shared state in the system. Every record lives in a
//! per-user [`CollectionScope`]; the draft lifecycle writes at most twice per
//! quote (one create, one update) and the history view reads through a live
//! [`Subscription`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

pub mod record;
pub mod subscription;

pub use record::{QuoteRecord, RecordPatch, RecordStatus, StoredQuote};
pub use subscription::{sort_newest_first, Subscription};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// "This authenticated user's quotes".
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionScope(pub String);

impl CollectionScope {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    pub fn user_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/quotes", self.0)
    }
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Inserts a new record and returns its generated id.
    async fn create(
        &self,
        scope: &CollectionScope,
        record: QuoteRecord,
    ) -> Result<RecordId, StoreError>;

    /// Merges `patch` into an existing record. Unknown ids fail with
    /// [`StoreError::NotFound`].
    async fn update(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
        patch: RecordPatch,
    ) -> Result<(), StoreError>;

    async fn subscribe(&self, scope: &CollectionScope) -> Result<Subscription, StoreError>;

    async fn get(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
    ) -> Result<Option<StoredQuote>, StoreError>;

    /// One-shot read of the scope, newest first.
    async fn list(&self, scope: &CollectionScope) -> Result<Vec<StoredQuote>, StoreError>;
}

#[async_trait]
impl<T> QuoteStore for Arc<T>
where
    T: QuoteStore + ?Sized,
{
    async fn create(
        &self,
        scope: &CollectionScope,
        record: QuoteRecord,
    ) -> Result<RecordId, StoreError> {
        (**self).create(scope, record).await
    }

    async fn update(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
        patch: RecordPatch,
    ) -> Result<(), StoreError> {
        (**self).update(scope, id, patch).await
    }

    async fn subscribe(&self, scope: &CollectionScope) -> Result<Subscription, StoreError> {
        (**self).subscribe(scope).await
    }

    async fn get(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
    ) -> Result<Option<StoredQuote>, StoreError> {
        (**self).get(scope, id).await
    }

    async fn list(&self, scope: &CollectionScope) -> Result<Vec<StoredQuote>, StoreError> {
        (**self).list(scope).await
    }
}
