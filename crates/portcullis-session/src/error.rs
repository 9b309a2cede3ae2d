//! Error types for the session layer.

use portcullis_protocol::ProtocolError;
use portcullis_transport::TransportError;

/// Errors that can occur during session management.
///
/// Only the caller-facing operations (`login`, `register`, `refresh`, the
/// account operations) ever return these. `resolve` and `logout` absorb
/// every failure into the safe `Unauthenticated` state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server refused the request: bad credentials, a duplicate
    /// registration, a wrong old password. Carries the server's own message
    /// (or a generic fallback when the body had none).
    #[error("request rejected: {0}")]
    AuthRejected(String),

    /// The server answered 401 to a request that needs a live session.
    /// The session is gone and the user has to sign in again.
    #[error("session expired: {0}")]
    Expired(String),

    /// The operation needs an authenticated session and there is none.
    #[error("no authenticated session")]
    NotAuthenticated,

    /// Token deployments only: the server accepted the login but issued
    /// no bearer token to persist.
    #[error("server accepted the login but issued no token")]
    MissingToken,

    /// The request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request body could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading or writing the durable credential slot failed.
    #[error("credential storage failed: {0}")]
    Storage(#[source] std::io::Error),
}

impl SessionError {
    /// The text to show the user for this error.
    ///
    /// For server rejections this is the server's message verbatim, so a
    /// 401 with `{"error":"bad creds"}` reads "bad creds", not
    /// "request rejected: bad creds".
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRejected(msg) | Self::Expired(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_auth_rejected_is_verbatim() {
        let err = SessionError::AuthRejected("bad creds".into());
        assert_eq!(err.user_message(), "bad creds");
        assert_eq!(err.to_string(), "request rejected: bad creds");
    }

    #[test]
    fn test_user_message_transport_is_display() {
        let err = SessionError::from(TransportError::Timeout);
        assert_eq!(err.user_message(), "request timed out");
    }
}
