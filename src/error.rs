use std::fmt;

use thiserror::Error;

/// The four external stores the reports read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Search,
    Graph,
    Relational,
    Cache,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Search => "search index",
            Backend::Graph => "graph store",
            Backend::Relational => "relational store",
            Backend::Cache => "profile cache",
        };
        f.write_str(name)
    }
}

/// Failure of a single adapter call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, transport or query execution failure
    #[error("{backend} unavailable: {message}")]
    BackendUnavailable { backend: Backend, message: String },

    /// The store answered, but not in the shape we expect
    #[error("{backend} returned an unexpected shape: {message}")]
    Decode { backend: Backend, message: String },

    /// A required record is absent
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn unavailable(backend: Backend, message: impl fmt::Display) -> Self {
        StoreError::BackendUnavailable {
            backend,
            message: message.to_string(),
        }
    }

    pub fn decode(backend: Backend, message: impl fmt::Display) -> Self {
        StoreError::Decode {
            backend,
            message: message.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("no matching row".to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => StoreError::decode(Backend::Relational, err),
            other => StoreError::unavailable(Backend::Relational, other),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::unavailable(Backend::Cache, err)
    }
}

/// Classifies a reqwest failure for one of the HTTP-speaking stores.
pub fn from_http(backend: Backend, err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::decode(backend, err)
    } else {
        StoreError::unavailable(backend, err)
    }
}
