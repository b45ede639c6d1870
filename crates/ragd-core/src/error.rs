use thiserror::Error;

/// Core error type for ragd operations.
#[derive(Error, Debug)]
pub enum RagdError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Work unit error: {0}")]
    WorkUnit(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for RagdError {
    fn from(e: serde_json::Error) -> Self {
        RagdError::Serialization(e.to_string())
    }
}

/// Result type alias using RagdError.
pub type Result<T> = std::result::Result<T, RagdError>;
