use thiserror::Error;

use crate::domain::quote::QuoteStatus;
use crate::sync::RecordId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid quote transition from {from:?} to {to:?}")]
    InvalidQuoteTransition { from: QuoteStatus, to: QuoteStatus },
    #[error("quote is already linked to record `{existing}`, refusing `{attempted}`")]
    RemoteIdAlreadyAssigned { existing: RecordId, attempted: RecordId },
    #[error("no line item with id {0}")]
    UnknownItem(u32),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("transcript too short to extract a quote ({length} characters)")]
    InsufficientInput { length: usize },
    #[error("generation service failure: {0}")]
    GenerationService(String),
    #[error("model response is not a quote payload")]
    MalformedResponse { raw: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record `{0}` does not exist")]
    NotFound(RecordId),
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("another extraction or send is already in flight")]
    Busy,
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl LifecycleError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Extraction(ExtractionError::InsufficientInput { .. }) => "insufficient_input",
            Self::Extraction(ExtractionError::GenerationService(_)) => "generation_service",
            Self::Extraction(ExtractionError::MalformedResponse { .. }) => "malformed_response",
            Self::Persistence(_) => "persistence",
            Self::Domain(_) => "domain",
        }
    }

    /// Message safe to show the user. Every failure is recoverable from the
    /// same screen, so each one says what to do next.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Busy => "Still working on the last recording. Please wait a moment.",
            Self::Extraction(ExtractionError::InsufficientInput { .. }) => {
                "That recording was too short. Please describe the job and try again."
            }
            Self::Extraction(ExtractionError::GenerationService(_)) => {
                "The quote assistant could not be reached. Please try recording again."
            }
            Self::Extraction(ExtractionError::MalformedResponse { .. }) => {
                "The quote assistant returned something unexpected. Please review the draft."
            }
            Self::Persistence(_) => {
                "Your quote could not be saved. Your changes are kept; please try again."
            }
            Self::Domain(_) => "That change is not allowed for this quote.",
        }
    }
}
