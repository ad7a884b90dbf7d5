use thiserror::Error;

/// Failure taxonomy surfaced to the user.
///
/// Only `Storage` is propagated out of the service; the other variants are
/// turned into notifications and leave the store untouched.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid import file: {0}")]
    MalformedImport(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl QuoteError {
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

pub type Result<T, E = QuoteError> = std::result::Result<T, E>;
