use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by the account store and the forms in front of it.
///
/// None of these are fatal: the console prints the message and re-prompts.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid user ID or password")]
    Authentication,

    #[error("Too many failed attempts. Please try again later.")]
    LockedOut { until: DateTime<Utc> },

    #[error("User with email {0} already exists!")]
    AlreadyExists(String),

    #[error("{0}")]
    Validation(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Cannot delete default user: {0}")]
    BuiltInProtected(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed stored data: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
