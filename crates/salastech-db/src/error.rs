//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),
    
    #[error("Query error: {0}")]
    Query(String),
    
    #[error("Migration error: {0}")]
    Migration(String),
    
    #[error("Serialization error: {0}")]
    Serialization(String),
    
    #[error("Not found: {0}")]
    NotFound(String),
    
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for salastech_core::Error {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => salastech_core::Error::NotFound {
                entity: "unknown".into(),
                id: msg,
            },
            DbError::ConstraintViolation(msg) => salastech_core::Error::Validation(msg),
            other => salastech_core::Error::StorageUnavailable(other.to_string()),
        }
    }
}
