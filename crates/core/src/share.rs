//! Outbound renderings of a sent quote: email, short message, and the JSON
//! document posted to an accounting webhook.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};

use crate::domain::company::CompanyDetails;
use crate::domain::quote::{parse_number_text, LineItem, Quote};
use crate::flows::draft::SentReceipt;

const EMAIL_SUBJECT: &str = "email_subject.txt";
const EMAIL_BODY: &str = "email_body.txt";
const MESSAGE: &str = "message.txt";

const EMAIL_SUBJECT_TEMPLATE: &str = "Quote from {{ company.business_name }}\
{% if quote.job_address %} for {{ quote.job_address }}{% endif %}";

const EMAIL_BODY_TEMPLATE: &str = r#"{% if quote.client_name %}Hi {{ quote.client_name }},{% else %}Hi there,{% endif %}

Thanks for the opportunity to quote{% if quote.job_address %} on {{ quote.job_address }}{% endif %}.
{% if quote.scope_summary %}
{{ quote.scope_summary }}
{% endif %}
{% for item in quote.items %}- {{ item.description }}: {{ item.qty }} x ${{ item.price | money }} = ${{ item.line_total | money }}
{% endfor %}
Total: ${{ quote.total | money }}{% if company.gst_registered %} (inc. GST){% endif %}
{% if company.has_bank_details %}
Payment details:
{{ company.bank_name }}
BSB: {{ company.bsb }}  Account: {{ company.account_number }}
{% endif %}
Regards,
{{ company.business_name }}{% if company.phone %}
{{ company.phone }}{% endif %}
"#;

const MESSAGE_TEMPLATE: &str = "{{ company.business_name }}: quote {% if quote.job_address %}for \
{{ quote.job_address }} {% endif %}is ${{ quote.total | money }}\
{% if company.gst_registered %} inc. GST{% endif %}. Reply to accept or ask questions.";

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("template error: {0}")]
    Template(String),
    #[error("webhook delivery failed: {0}")]
    Delivery(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct QuoteRenderer {
    tera: Tera,
}

impl QuoteRenderer {
    pub fn new() -> Result<Self, ShareError> {
        let mut tera = Tera::default();
        tera.register_filter("money", money_filter);
        tera.add_raw_templates(vec![
            (EMAIL_SUBJECT, EMAIL_SUBJECT_TEMPLATE),
            (EMAIL_BODY, EMAIL_BODY_TEMPLATE),
            (MESSAGE, MESSAGE_TEMPLATE),
        ])
        .map_err(|error| ShareError::Template(error.to_string()))?;
        Ok(Self { tera })
    }

    pub fn email(
        &self,
        quote: &Quote,
        company: &CompanyDetails,
    ) -> Result<EmailMessage, ShareError> {
        let context = share_context(quote, company);
        Ok(EmailMessage {
            to: quote.client_email.clone(),
            subject: self.render(EMAIL_SUBJECT, &context)?.trim().to_string(),
            body: self.render(EMAIL_BODY, &context)?,
        })
    }

    pub fn message(&self, quote: &Quote, company: &CompanyDetails) -> Result<String, ShareError> {
        let context = share_context(quote, company);
        self.render(MESSAGE, &context)
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, ShareError> {
        self.tera.render(template, context).map_err(|error| ShareError::Template(error.to_string()))
    }
}

#[derive(Serialize)]
struct CompanyView<'a> {
    business_name: &'a str,
    phone: &'a str,
    bank_name: &'a str,
    bsb: &'a str,
    account_number: &'a str,
    gst_registered: bool,
    has_bank_details: bool,
}

#[derive(Serialize)]
struct ItemView<'a> {
    description: &'a str,
    qty: Decimal,
    price: Decimal,
    line_total: Decimal,
}

#[derive(Serialize)]
struct QuoteView<'a> {
    client_name: &'a str,
    job_address: &'a str,
    scope_summary: &'a str,
    items: Vec<ItemView<'a>>,
    total: Decimal,
}

fn share_context(quote: &Quote, company: &CompanyDetails) -> Context {
    let mut context = Context::new();
    context.insert(
        "company",
        &CompanyView {
            business_name: &company.business_name,
            phone: &company.phone,
            bank_name: &company.bank_name,
            bsb: &company.bsb,
            account_number: &company.account_number,
            gst_registered: company.gst_registered,
            has_bank_details: company.has_bank_details(),
        },
    );
    context.insert(
        "quote",
        &QuoteView {
            client_name: &quote.client_name,
            job_address: &quote.job_address,
            scope_summary: &quote.scope_summary,
            items: quote.items.iter().map(item_view).collect(),
            total: quote.total(),
        },
    );
    context
}

fn item_view(item: &LineItem) -> ItemView<'_> {
    ItemView {
        description: &item.description,
        qty: item.qty.normalize(),
        price: item.price,
        line_total: item.line_total(),
    }
}

/// Formats a number (or numeric string, which is how decimals serialize) to
/// two places.
fn money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::Number(number) => parse_number_text(&number.to_string()),
        tera::Value::String(text) => parse_number_text(text),
        _ => Decimal::ZERO,
    };
    Ok(tera::Value::String(format!("{:.2}", amount.round_dp(2))))
}

/// Document posted to the accounting webhook once a quote is sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentQuotePayload {
    pub record_id: String,
    pub business_name: String,
    pub gst_registered: bool,
    pub client_name: String,
    pub client_email: String,
    pub job_address: String,
    pub scope_summary: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub status: &'static str,
    pub sent_at: DateTime<Utc>,
}

impl SentQuotePayload {
    pub fn new(receipt: &SentReceipt, company: &CompanyDetails, sent_at: DateTime<Utc>) -> Self {
        let quote = &receipt.quote;
        Self {
            record_id: receipt.record_id.0.clone(),
            business_name: company.business_name.clone(),
            gst_registered: company.gst_registered,
            client_name: quote.client_name.clone(),
            client_email: quote.client_email.clone(),
            job_address: quote.job_address.clone(),
            scope_summary: quote.scope_summary.clone(),
            items: quote.items.clone(),
            total: receipt.total,
            status: "Sent",
            sent_at,
        }
    }
}
