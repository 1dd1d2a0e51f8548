//! Error types for the reservation core

use thiserror::Error;

use crate::policy::PolicyViolation;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error kinds, one per the error taxonomy the API gateway maps to HTTP status
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict with existing reservations: {conflicting_ids:?}")]
    Conflict { conflicting_ids: Vec<uuid::Uuid> },

    #[error("Policy violation: {0}")]
    PolicyViolation(PolicyViolation),

    #[error("Operation not allowed on a terminal reservation")]
    TerminalState,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Storage temporarily unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<PolicyViolation> for Error {
    fn from(v: PolicyViolation) -> Self {
        Error::PolicyViolation(v)
    }
}
