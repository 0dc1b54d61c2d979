//! Error types for the Web API transport

use thiserror::Error;

/// Errors from the store's data and search endpoints
#[derive(Error, Debug)]
pub enum WebApiError {
    /// The configured base URL cannot be used
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The store rejected the credentials (401)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller lacks privileges for the operation (403)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The addressed record or endpoint does not exist (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing state, typically an
    /// association that already exists (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success status
    #[error("API error (status {status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        body: String,
    },

    /// Transport-level failure: connection, timeout, or body decoding
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body that does not match the documented shape
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for Web API operations
pub type WebApiResult<T> = std::result::Result<T, WebApiError>;
