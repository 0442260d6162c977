use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;
use crate::sync::RecordId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalQuoteId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteStatus {
    NotStarted,
    Draft,
    ReviewPending,
    Sent,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Draft => "Draft",
            Self::ReviewPending => "ReviewPending",
            Self::Sent => "Sent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: u32,
    pub description: String,
    pub qty: Decimal,
    pub price: Decimal,
}

impl LineItem {
    /// Item appended by "add item" in the review screen.
    pub fn blank(id: u32) -> Self {
        Self { id, description: String::new(), qty: Decimal::ONE, price: Decimal::ZERO }
    }

    pub fn line_total(&self) -> Decimal {
        self.qty.saturating_mul(self.price)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteField {
    ClientName,
    ClientEmail,
    JobAddress,
    ScopeSummary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Qty,
    Price,
}

/// The locally held, editable quote for one recording session.
///
/// `status` and `remote_id` are only reachable through [`Quote::transition_to`]
/// and [`Quote::assign_remote_id`], so a quote cannot skip lifecycle steps or
/// be re-pointed at a different remote record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub local_id: LocalQuoteId,
    remote_id: Option<RecordId>,
    pub client_name: String,
    pub client_email: String,
    pub job_address: String,
    pub scope_summary: String,
    pub items: Vec<LineItem>,
    status: QuoteStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn new(local_id: LocalQuoteId) -> Self {
        Self {
            local_id,
            remote_id: None,
            client_name: String::new(),
            client_email: String::new(),
            job_address: String::new(),
            scope_summary: String::new(),
            items: Vec::new(),
            status: QuoteStatus::NotStarted,
            created_at: None,
        }
    }

    pub fn remote_id(&self) -> Option<&RecordId> {
        self.remote_id.as_ref()
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn total(&self) -> Decimal {
        compute_total(&self.items)
    }

    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::NotStarted, QuoteStatus::Draft)
                | (QuoteStatus::Draft, QuoteStatus::ReviewPending)
                | (QuoteStatus::ReviewPending, QuoteStatus::Draft)
                | (QuoteStatus::NotStarted, QuoteStatus::Sent)
                | (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::ReviewPending, QuoteStatus::Sent)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }

    /// Links this quote to its remote record. Re-assigning the same id is a
    /// no-op; pointing at a different record is rejected.
    pub fn assign_remote_id(&mut self, id: RecordId) -> Result<(), DomainError> {
        match &self.remote_id {
            None => {
                self.remote_id = Some(id);
                Ok(())
            }
            Some(existing) if *existing == id => Ok(()),
            Some(existing) => Err(DomainError::RemoteIdAlreadyAssigned {
                existing: existing.clone(),
                attempted: id,
            }),
        }
    }

    pub fn set_field(&mut self, field: QuoteField, value: impl Into<String>) {
        let value = value.into();
        match field {
            QuoteField::ClientName => self.client_name = value,
            QuoteField::ClientEmail => self.client_email = value,
            QuoteField::JobAddress => self.job_address = value,
            QuoteField::ScopeSummary => self.scope_summary = value,
        }
    }

    pub fn push_blank_item(&mut self) -> u32 {
        let id = next_item_id(&self.items);
        self.items.push(LineItem::blank(id));
        id
    }

    pub fn set_item_field(
        &mut self,
        item_id: u32,
        field: ItemField,
        raw: &str,
    ) -> Result<(), DomainError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(DomainError::UnknownItem(item_id))?;

        match field {
            ItemField::Description => item.description = raw.to_string(),
            ItemField::Qty => item.qty = parse_number_text(raw),
            ItemField::Price => item.price = parse_number_text(raw),
        }
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: u32) -> Result<LineItem, DomainError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(DomainError::UnknownItem(item_id))?;
        Ok(self.items.remove(position))
    }
}

pub fn compute_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_total).fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Total over an untyped item payload. Anything that is not an array totals
/// to zero; each element contributes `qty * price` after coercion.
pub fn compute_total_value(items: &Value) -> Decimal {
    let Some(items) = items.as_array() else {
        return Decimal::ZERO;
    };

    items
        .iter()
        .map(|item| coerce_number(&item["qty"]).saturating_mul(coerce_number(&item["price"])))
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

pub fn next_item_id(items: &[LineItem]) -> u32 {
    items.iter().map(|item| item.id).max().map_or(1, |max| max.saturating_add(1))
}

pub fn coerce_number(value: &Value) -> Decimal {
    match value {
        Value::Number(number) => parse_number_text(&number.to_string()),
        Value::String(text) => parse_number_text(text),
        _ => Decimal::ZERO,
    }
}

/// Lenient numeric parse for model output and raw form input: plain or
/// scientific notation, surrounding whitespace ignored, anything else is zero.
pub fn parse_number_text(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO)
}

pub const CSV_HEADER: [&str; 8] =
    ["Date", "Client", "Email", "Job Address", "Scope", "Items", "Total", "Status"];

pub fn to_csv_row(quote: &Quote) -> Vec<String> {
    csv_row(
        quote.created_at,
        &quote.client_name,
        &quote.client_email,
        &quote.job_address,
        &quote.scope_summary,
        quote.items.len(),
        quote.total(),
        quote.status.as_str(),
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn csv_row(
    created_at: Option<DateTime<Utc>>,
    client_name: &str,
    client_email: &str,
    job_address: &str,
    scope_summary: &str,
    item_count: usize,
    total: Decimal,
    status: &str,
) -> Vec<String> {
    let date = created_at.map(|at| at.format("%Y-%m-%d").to_string()).unwrap_or_default();

    [
        date,
        client_name.to_string(),
        client_email.to_string(),
        job_address.to_string(),
        scope_summary.to_string(),
        item_count.to_string(),
        total.round_dp(2).to_string(),
        status.to_string(),
    ]
    .into_iter()
    .map(|cell| escape_csv_cell(&cell))
    .collect()
}

fn escape_csv_cell(cell: &str) -> String {
    cell.replace('"', "\"\"")
}

/// Joins already-escaped cells into one quoted CSV line.
pub fn to_csv_line<S: AsRef<str>>(cells: &[S]) -> String {
    cells.iter().map(|cell| format!("\"{}\"", cell.as_ref())).collect::<Vec<_>>().join(",")
}
