use async_trait::async_trait;
use quickquote_core::domain::extraction::{ExtractedQuote, QuoteExtractor};
use quickquote_core::errors::ExtractionError;
use tracing::{info, warn};

use crate::llm::{LlmClient, ResponseFormat};
use crate::prompts::{extraction_prompt, rewrite_prompt};
use crate::sanitize::sanitize;

/// Shortest transcript, in trimmed characters, worth sending to the model.
pub const MIN_TRANSCRIPT_CHARS: usize = 5;

pub struct AiQuoteExtractor<C> {
    client: C,
}

impl<C> AiQuoteExtractor<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Like [`QuoteExtractor::extract`] but surfaces malformed model output
    /// instead of falling back.
    pub async fn extract_strict(&self, transcript: &str) -> Result<ExtractedQuote, ExtractionError> {
        let transcript = usable_transcript(transcript)?;
        let raw = self.client.complete(&extraction_prompt(transcript), ResponseFormat::Json).await?;
        sanitize(&raw)
    }

    /// Rewrites a scope summary into customer-facing prose. The reply is
    /// used verbatim apart from trimming.
    pub async fn rewrite_summary(&self, text: &str) -> Result<String, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::InsufficientInput { length: 0 });
        }

        let reply = self.client.complete(&rewrite_prompt(text), ResponseFormat::Text).await?;
        let rewritten = reply.trim();
        if rewritten.is_empty() {
            return Err(ExtractionError::GenerationService(
                "rewrite returned no text".to_string(),
            ));
        }
        Ok(rewritten.to_string())
    }
}

#[async_trait]
impl<C> QuoteExtractor for AiQuoteExtractor<C>
where
    C: LlmClient,
{
    async fn extract(&self, transcript: &str) -> Result<ExtractedQuote, ExtractionError> {
        match self.extract_strict(transcript).await {
            Ok(extracted) => {
                info!(
                    event_name = "extraction.completed",
                    item_count = extracted.items.len(),
                    "transcript extracted"
                );
                Ok(extracted)
            }
            Err(ExtractionError::MalformedResponse { raw }) => {
                warn!(
                    event_name = "extraction.fallback",
                    raw_length = raw.len(),
                    "model response was not a quote payload, using it as the scope"
                );
                Ok(ExtractedQuote::fallback(&raw))
            }
            Err(error) => Err(error),
        }
    }
}

fn usable_transcript(transcript: &str) -> Result<&str, ExtractionError> {
    let trimmed = transcript.trim();
    let length = trimmed.chars().count();
    if length < MIN_TRANSCRIPT_CHARS {
        return Err(ExtractionError::InsufficientInput { length });
    }
    Ok(trimmed)
}
