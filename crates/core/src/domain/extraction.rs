use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::quote::LineItem;
use crate::errors::ExtractionError;

/// Vetted partial quote produced from one model response.
///
/// Field names serialize in the same camelCase shape the model is asked to
/// emit, so a sanitized payload can be fed back through the sanitizer
/// unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedQuote {
    pub client_name: String,
    pub job_address: String,
    pub scope_summary: String,
    pub items: Vec<LineItem>,
}

impl ExtractedQuote {
    /// Zero-item payload carrying the unparseable model text as the scope, so
    /// the user still has something to review.
    pub fn fallback(raw: &str) -> Self {
        Self { scope_summary: raw.trim().to_string(), ..Self::default() }
    }
}

#[async_trait]
pub trait QuoteExtractor: Send + Sync {
    async fn extract(&self, transcript: &str) -> Result<ExtractedQuote, ExtractionError>;
}
