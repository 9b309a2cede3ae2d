//! Error types for the protocol layer.
//!
//! Each crate in Portcullis defines its own error enum. A `ProtocolError`
//! always means a body could not be turned into bytes or back, never that
//! the network or the session went wrong.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a request body into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a response body into a Rust type).
    ///
    /// Common causes: a proxy error page instead of JSON, missing required
    /// fields, or a truncated body.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body parsed but violates an expectation of the caller,
    /// e.g. a `/user` reply without an email.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
