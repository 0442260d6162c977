use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{compute_total, csv_row, LineItem, LocalQuoteId, Quote, QuoteStatus};
use crate::errors::DomainError;
use crate::sync::RecordId;

/// Status as persisted remotely. The remote record only ever distinguishes a
/// saved draft from a sent quote; review state is local.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    Draft,
    Sent,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Draft" => Some(Self::Draft),
            "Sent" => Some(Self::Sent),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub client_name: String,
    pub client_email: String,
    pub job_address: String,
    pub scope_summary: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuoteRecord {
    /// Snapshot of the quote's editable fields with a freshly computed total.
    pub fn from_quote(quote: &Quote, status: RecordStatus, now: DateTime<Utc>) -> Self {
        Self {
            client_name: quote.client_name.clone(),
            client_email: quote.client_email.clone(),
            job_address: quote.job_address.clone(),
            scope_summary: quote.scope_summary.clone(),
            items: quote.items.clone(),
            total: quote.total(),
            status,
            created_at: quote.created_at.unwrap_or(now),
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(client_name) = patch.client_name {
            self.client_name = client_name;
        }
        if let Some(client_email) = patch.client_email {
            self.client_email = client_email;
        }
        if let Some(job_address) = patch.job_address {
            self.job_address = job_address;
        }
        if let Some(scope_summary) = patch.scope_summary {
            self.scope_summary = scope_summary;
        }
        if let Some(items) = patch.items {
            self.items = items;
        }
        if let Some(total) = patch.total {
            self.total = total;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    /// Whether the stored total still matches its items.
    pub fn total_is_consistent(&self) -> bool {
        compute_total(&self.items) == self.total
    }
}

/// Partial record merged by `QuoteStore::update`; `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub job_address: Option<String>,
    pub scope_summary: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub total: Option<Decimal>,
    pub status: Option<RecordStatus>,
}

impl RecordPatch {
    /// Every editable field of `quote`, its current total, and `status`.
    pub fn from_quote(quote: &Quote, status: RecordStatus) -> Self {
        Self {
            client_name: Some(quote.client_name.clone()),
            client_email: Some(quote.client_email.clone()),
            job_address: Some(quote.job_address.clone()),
            scope_summary: Some(quote.scope_summary.clone()),
            items: Some(quote.items.clone()),
            total: Some(quote.total()),
            status: Some(status),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuote {
    pub id: RecordId,
    pub record: QuoteRecord,
}

impl StoredQuote {
    pub fn to_csv_row(&self) -> Vec<String> {
        csv_row(
            Some(self.record.created_at),
            &self.record.client_name,
            &self.record.client_email,
            &self.record.job_address,
            &self.record.scope_summary,
            self.record.items.len(),
            self.record.total,
            self.record.status.as_str(),
        )
    }

    /// Rebuilds an editable quote from a saved draft so it can be reviewed
    /// and sent later. Sent records are history and cannot be reopened.
    pub fn to_review_quote(&self, local_id: LocalQuoteId) -> Result<Quote, DomainError> {
        if self.record.status == RecordStatus::Sent {
            return Err(DomainError::InvariantViolation(format!(
                "record `{}` was already sent",
                self.id
            )));
        }

        let mut quote = Quote::new(local_id);
        quote.client_name = self.record.client_name.clone();
        quote.client_email = self.record.client_email.clone();
        quote.job_address = self.record.job_address.clone();
        quote.scope_summary = self.record.scope_summary.clone();
        quote.items = self.record.items.clone();
        quote.created_at = Some(self.record.created_at);
        quote.assign_remote_id(self.id.clone())?;
        quote.transition_to(QuoteStatus::Draft)?;
        quote.transition_to(QuoteStatus::ReviewPending)?;
        Ok(quote)
    }
}
