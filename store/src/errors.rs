//! Custom error types specific to the `market-store` crate.
//!
//! This module defines errors that can occur while opening the database,
//! running queries, or decoding stored documents, providing a unified error
//! type for every `MarketStore` implementation.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("database migration failed: {message}")]
    Migration { message: String },

    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A stored column could not be decoded into its model type.
    #[error("corrupt {column} value: {message}")]
    Corrupt { column: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn corrupt(column: &'static str, message: impl ToString) -> Self {
        Self::Corrupt {
            column,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::corrupt("json", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display_is_the_bare_message() {
        let err = StoreError::conflict("User already exists");
        assert_eq!(err.to_string(), "User already exists");
        assert!(err.is_conflict());
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let err = StoreError::NotFound {
            entity: "vendor",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "vendor with id abc not found");
        assert!(!err.is_conflict());
    }

    #[test]
    fn json_errors_become_corrupt() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(matches!(err, StoreError::Corrupt { column: "json", .. }));
    }
}
