//! Error types for the reconciliation engine.

use thiserror::Error;

/// Result type alias using [`SyncError`].
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while reconciling alert-condition membership.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote API answered with a non-success status.
    #[error("API error {status} on {url}: {detail}")]
    Api {
        status: u16,
        url: String,
        detail: String,
    },

    /// No remote policy matched the declared name exactly.
    #[error("alert policy not found: {0:?}")]
    PolicyNotFound(String),

    /// More than one remote policy matched the declared name.
    #[error("alert policy name {name:?} is ambiguous: {count} matches")]
    AmbiguousPolicy { name: String, count: usize },

    /// A server's `last_reported_at` violated the RFC 3339 contract.
    #[error("invalid last_reported_at {value:?} for server {server:?}")]
    Timestamp { server: String, value: String },
}
