use std::time::Duration;

use thiserror::Error;

/// Rejected input. Messages are what HTTP callers see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("either fruit or quantity is not provided but required")]
    MissingField,
    #[error("quantity must be a number")]
    NotANumber,
    #[error("quantity must be a positive number")]
    NotPositive,
}

/// Failures of the backing counter store. None of these are retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    #[error("counter store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("counter store error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidArgument(#[from] ValidationError),
    #[error("not enough fruits")]
    InsufficientStock {
        fruit: String,
        available: i64,
        requested: i64,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn insufficient(fruit: &str, available: i64, requested: i64) -> Self {
        Self::InsufficientStock { fruit: fruit.to_string(), available, requested }
    }
}
