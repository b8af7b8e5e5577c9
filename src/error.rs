//! Error types for fetch and update operations

use std::fmt;

/// Result type alias for adapter fetches
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching a value from an external source.
///
/// All failure at the adapter boundary is one of these variants; adapters
/// never panic across the boundary. Every variant is transient from the
/// scheduler's point of view except `UnknownAdapterType`, which prevents a
/// connection from being scheduled at all.
#[derive(Debug)]
pub enum FetchError {
    /// Network-level failure (connect, timeout, TLS, ...)
    Transport(String),

    /// The endpoint answered with a non-success status code
    Http(u16),

    /// A response was received but could not be decoded
    MalformedResponse(String),

    /// The response decoded, but the expected value/column/row is absent
    Extraction(String),

    /// The configured adapter type is not in the catalog
    UnknownAdapterType(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {}", msg),
            FetchError::Http(status) => write!(f, "endpoint returned HTTP {}", status),
            FetchError::MalformedResponse(msg) => {
                write!(f, "malformed response: {}", msg)
            }
            FetchError::Extraction(msg) => write!(f, "value extraction failed: {}", msg),
            FetchError::UnknownAdapterType(kind) => {
                write!(f, "unknown adapter type '{}'", kind)
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Http(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// Errors that can occur while applying a new value to a quantity
#[derive(Debug)]
pub enum UpdateError {
    /// The target quantity does not exist; the caller logs and skips
    NotFound(String),

    /// The quantity store failed to load or save
    Store(String),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::NotFound(id) => write!(f, "quantity '{}' not found", id),
            UpdateError::Store(msg) => write!(f, "quantity store error: {}", msg),
        }
    }
}

impl std::error::Error for UpdateError {}
