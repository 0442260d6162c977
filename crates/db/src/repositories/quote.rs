use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, warn};
use uuid::Uuid;

use quickquote_core::domain::quote::LineItem;
use quickquote_core::errors::StoreError;
use quickquote_core::sync::{
    sort_newest_first, CollectionScope, QuoteRecord, QuoteStore, RecordId, RecordPatch,
    RecordStatus, StoredQuote, Subscription,
};

use super::{RepositoryError, ScopeFeeds};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, status, client_name, client_email, job_address,
        scope_summary, items_json, total, created_at, updated_at
 FROM quote_record";

/// SQLite-backed store. Subscribers are fed from this process's own writes.
pub struct SqlQuoteStore {
    pool: DbPool,
    feeds: ScopeFeeds,
}

impl SqlQuoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, feeds: ScopeFeeds::default() }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn load(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
    ) -> Result<Option<StoredQuote>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE owner_id = ? AND id = ?");
        let row = sqlx::query(&sql)
            .bind(scope.user_id())
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_stored_quote).transpose()
    }

    async fn load_scope(&self, scope: &CollectionScope) -> Result<Vec<StoredQuote>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE owner_id = ? ORDER BY created_at DESC, id ASC");
        let rows: Vec<SqliteRow> =
            sqlx::query(&sql).bind(scope.user_id()).fetch_all(&self.pool).await?;

        let records = rows.iter().map(row_to_stored_quote).collect::<Result<Vec<_>, _>>()?;
        Ok(sort_newest_first(records))
    }

    /// Pushes the scope to its subscribers. Runs after the write has
    /// committed, so a failed reload is logged and never fails the write.
    async fn publish(&self, scope: &CollectionScope) {
        if !self.feeds.has_listeners(scope) {
            return;
        }
        match self.load_scope(scope).await {
            Ok(records) => self.feeds.publish(scope, records),
            Err(error) => warn!(
                event_name = "store.sql.publish_failed",
                scope = %scope,
                error = %error,
                "write committed but subscribers were not refreshed"
            ),
        }
    }
}

fn decode_error(error: impl ToString) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc)).map_err(decode_error)
}

fn row_to_stored_quote(row: &SqliteRow) -> Result<StoredQuote, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let client_name: String = row.try_get("client_name").map_err(decode_error)?;
    let client_email: String = row.try_get("client_email").map_err(decode_error)?;
    let job_address: String = row.try_get("job_address").map_err(decode_error)?;
    let scope_summary: String = row.try_get("scope_summary").map_err(decode_error)?;
    let items_json: String = row.try_get("items_json").map_err(decode_error)?;
    let total: String = row.try_get("total").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let status = RecordStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown record status `{status}`")))?;
    let items = serde_json::from_str::<Vec<LineItem>>(&items_json).map_err(decode_error)?;
    let total = Decimal::from_str(&total).map_err(decode_error)?;

    Ok(StoredQuote {
        id: RecordId(id),
        record: QuoteRecord {
            client_name,
            client_email,
            job_address,
            scope_summary,
            items,
            total,
            status,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        },
    })
}

fn items_to_json(items: &[LineItem]) -> Result<String, RepositoryError> {
    serde_json::to_string(items).map_err(decode_error)
}

#[async_trait]
impl QuoteStore for SqlQuoteStore {
    async fn create(
        &self,
        scope: &CollectionScope,
        record: QuoteRecord,
    ) -> Result<RecordId, StoreError> {
        let id = RecordId(Uuid::new_v4().to_string());

        sqlx::query(
            "INSERT INTO quote_record (id, owner_id, status, client_name, client_email,
                                       job_address, scope_summary, items_json, total,
                                       created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id.0)
        .bind(scope.user_id())
        .bind(record.status.as_str())
        .bind(&record.client_name)
        .bind(&record.client_email)
        .bind(&record.job_address)
        .bind(&record.scope_summary)
        .bind(items_to_json(&record.items)?)
        .bind(record.total.to_string())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        debug!(event_name = "store.sql.created", record_id = %id, scope = %scope, "record inserted");
        self.publish(scope).await;
        Ok(id)
    }

    async fn update(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
        patch: RecordPatch,
    ) -> Result<(), StoreError> {
        let mut stored =
            self.load(scope, id).await?.ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored.record.apply(patch);
        let record = &stored.record;

        sqlx::query(
            "UPDATE quote_record
             SET status = ?, client_name = ?, client_email = ?, job_address = ?,
                 scope_summary = ?, items_json = ?, total = ?, updated_at = ?
             WHERE owner_id = ? AND id = ?",
        )
        .bind(record.status.as_str())
        .bind(&record.client_name)
        .bind(&record.client_email)
        .bind(&record.job_address)
        .bind(&record.scope_summary)
        .bind(items_to_json(&record.items)?)
        .bind(record.total.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(scope.user_id())
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        debug!(event_name = "store.sql.updated", record_id = %id, scope = %scope, "record updated");
        self.publish(scope).await;
        Ok(())
    }

    async fn subscribe(&self, scope: &CollectionScope) -> Result<Subscription, StoreError> {
        let current = self.load_scope(scope).await?;
        Ok(self.feeds.subscribe(scope, current))
    }

    async fn get(
        &self,
        scope: &CollectionScope,
        id: &RecordId,
    ) -> Result<Option<StoredQuote>, StoreError> {
        Ok(self.load(scope, id).await?)
    }

    async fn list(&self, scope: &CollectionScope) -> Result<Vec<StoredQuote>, StoreError> {
        Ok(self.load_scope(scope).await?)
    }
}
