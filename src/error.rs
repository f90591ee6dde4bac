//! Error types for jsonrest
//!
//! Query errors come from the request and map to client errors. Store, I/O
//! and configuration errors map to server errors.

use std::io;
use thiserror::Error;

use jsonrest_query::query::QueryError;

use crate::store::StoreError;

/// Main error type for jsonrest operations
#[derive(Error, Debug)]
pub enum JsonRestError {
    /// Filter, orderby, select or pagination error from the query engine
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored or submitted collection is not a JSON array
    #[error("Invalid collection: {0}")]
    InvalidCollection(String),

    /// Request is missing a field or carries an invalid one
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for jsonrest operations
pub type Result<T> = std::result::Result<T, JsonRestError>;

impl JsonRestError {
    /// HTTP status the error is reported with
    #[cold]
    pub fn status_code(&self) -> u16 {
        match self {
            JsonRestError::Query(_)
            | JsonRestError::InvalidCollection(_)
            | JsonRestError::InvalidRequest(_) => 400,
            JsonRestError::Store(StoreError::NotFound(_)) => 404,
            _ => 500,
        }
    }

    /// Returns true if the request itself caused the error
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            JsonRestError::from(QueryError::Parse("x".into())).status_code(),
            400
        );
        assert_eq!(
            JsonRestError::from(StoreError::NotFound("abc".into())).status_code(),
            404
        );
        assert_eq!(
            JsonRestError::from(StoreError::Backend("down".into())).status_code(),
            500
        );
        assert_eq!(JsonRestError::Config("bad".into()).status_code(), 500);
    }

    #[test]
    fn test_client_errors() {
        assert!(JsonRestError::InvalidCollection("object".into()).is_client_error());
        assert!(!JsonRestError::Io(io::Error::other("disk")).is_client_error());
    }

    #[test]
    fn test_query_error_message_passes_through() {
        let err = JsonRestError::from(QueryError::TypeMismatch("tolower() only works with strings".into()));
        assert_eq!(err.to_string(), "Type mismatch: tolower() only works with strings");
    }
}
