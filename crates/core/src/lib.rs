//! Core of the voice-to-quote workflow: the quote domain, the draft
//! lifecycle that auto-saves and sends quotes, the remote store contract and
//! its live history feed, share rendering, and configuration.

pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod session;
pub mod share;
pub mod sync;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::company::CompanyDetails;
pub use domain::extraction::{ExtractedQuote, QuoteExtractor};
pub use domain::quote::{ItemField, LineItem, LocalQuoteId, Quote, QuoteField, QuoteStatus};
pub use errors::{DomainError, ExtractionError, LifecycleError, StoreError};
pub use flows::{CommitOutcome, DraftManager, SentReceipt, SessionContext};
pub use session::UserSession;
pub use share::{EmailMessage, QuoteRenderer, SentQuotePayload, ShareError};
pub use sync::{
    CollectionScope, QuoteRecord, QuoteStore, RecordId, RecordPatch, RecordStatus, StoredQuote,
    Subscription,
};
