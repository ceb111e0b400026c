//! Error types for the request cache
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error ==
/// Failure reported by a caller-supplied fetch function.
///
/// Cloning shares the underlying error, so every caller that joined the same
/// in-flight fetch observes the exact same failure.
#[derive(Clone)]
pub struct FetchError(Arc<anyhow::Error>);

impl FetchError {
    /// Wraps an error produced by a fetch function.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self(Arc::new(error.into()))
    }

    /// Attempts to downcast to the concrete error type the fetch produced.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// True if both values share the same underlying failure.
    pub fn same_failure(&self, other: &FetchError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for FetchError {}

// == Cache Error Enum ==
/// Unified error type for the request cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The fetch function failed while producing the value for a key
    #[error("Fetch failed for key {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },

    /// Invalidation pattern is not a valid regular expression
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Returns the fetch failure carried by this error, if any.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            CacheError::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            CacheError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Persistence Error ==
/// Failure while reading or writing the durable snapshot.
///
/// Never surfaced to cache callers; the engine logs it and keeps running
/// as a memory-only cache.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Storage read/write failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is not usable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

// == Result Type Alias ==
/// Convenience Result type for the request cache.
pub type Result<T> = std::result::Result<T, CacheError>;
