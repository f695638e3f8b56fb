//! Error types for the `odinson-rest` crate.

use odinson_doc::DocError;
use thiserror::Error;

/// Errors that can occur when talking to an Odinson index.
#[derive(Debug, Error)]
pub enum OdinsonError {
    /// The request never produced an HTTP response.
    #[error("Odinson unavailable at {endpoint}: {message}")]
    RemoteUnavailable {
        /// The endpoint that was called.
        endpoint: String,
        /// A description of the transport failure.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("Odinson rejected request ({status}): {}", errors.join("; "))]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Error messages reported by the server, if any.
        errors: Vec<String>,
    },

    /// The response body could not be decoded.
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse {
        /// The endpoint that was called.
        endpoint: String,
        /// A description of the decode failure.
        message: String,
    },

    /// A client configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error propagated from `odinson-doc`.
    #[error(transparent)]
    Document(#[from] DocError),
}

/// A convenience result type for client operations.
pub type Result<T> = std::result::Result<T, OdinsonError>;
