use quickquote_core::errors::StoreError;
use thiserror::Error;

pub mod feed;
pub mod memory;
pub mod quote;

pub use feed::ScopeFeeds;
pub use memory::InMemoryQuoteStore;
pub use quote::SqlQuoteStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => StoreError::Backend(error.to_string()),
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}
