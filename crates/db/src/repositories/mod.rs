use thiserror::Error;

use autoquote_core::errors::PersistenceError;

pub mod memory;
pub mod quote;

pub use memory::InMemoryQuoteStore;
pub use quote::SqlQuoteStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for PersistenceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Storage(error.to_string()),
            RepositoryError::Encode(message) => Self::Encode(message),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}
