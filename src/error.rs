//! Backend error classification.
//!
//! These never escape the search client's public operations; they are
//! flattened into the `error` field of the result shapes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout, broken body stream.
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body was not the JSON shape expected for this operation.
    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
}
