//! Model-facing side of QuickQuote.
//!
//! The generation service is treated as an untrusted text source. Everything
//! it returns passes through [`sanitize`] before it reaches the draft
//! lifecycle, so the rest of the system only ever sees payloads that satisfy
//! the quote invariants.
//!
//! - `llm` - the [`LlmClient`] seam and the HTTP client for the generation
//!   endpoint
//! - `prompts` - fixed extraction and rewrite prompts
//! - `sanitize` - fence stripping, JSON slicing, and field coercion
//! - `extractor` - [`AiQuoteExtractor`], the `QuoteExtractor` used by the CLI
//! - `webhook` - delivery of sent quotes to an accounting endpoint

pub mod extractor;
pub mod llm;
pub mod prompts;
pub mod sanitize;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use extractor::{AiQuoteExtractor, MIN_TRANSCRIPT_CHARS};
pub use llm::{GeminiClient, LlmClient, ResponseFormat};
pub use sanitize::sanitize;
pub use webhook::WebhookNotifier;
