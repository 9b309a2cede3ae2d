//! The session gateway: the remote operations that affect a session.
//!
//! The state machine never talks HTTP. It calls a [`SessionGateway`], which
//! issues one request per operation and folds the many ways a response can
//! look into a handful of outcomes:
//!
//! | Operation | Outcome |
//! |---|---|
//! | `authenticate` / `register` | `Ok(..)` or `Err(SessionError)` with the server's message |
//! | `deauthenticate` | always a [`LogoutAck`], never an error |
//! | `resolve_identity` | always a [`Resolution`], never an error |
//!
//! [`HttpGateway`](crate::HttpGateway) is the production implementation.
//! Tests implement the trait directly with scripted outcomes.

use std::future::Future;

use portcullis_protocol::{ActiveSession, Identity};

use crate::SessionError;

/// A successful `authenticate` or `refresh`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Grant {
    /// The server's confirmation text.
    pub message: String,
    /// A bearer token, in token deployments.
    pub token: Option<String>,
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grant")
            .field("message", &self.message)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What became of a `deauthenticate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutAck {
    /// The server confirmed the logout.
    Confirmed(String),
    /// The server could not be reached or refused. Local teardown
    /// proceeds anyway; the string says why.
    Unconfirmed(String),
}

/// What became of a `resolve_identity` call.
///
/// Callers that only care about "who is signed in" use
/// [`into_identity`](Self::into_identity): both negative outcomes mean
/// "nobody". The split exists so a bearer token is only thrown away when
/// the server actually rejected it, not when the network blinked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The server confirmed a session for this identity.
    Resolved(Identity),
    /// The server answered with a non-success status (usually 401).
    Rejected,
    /// No usable answer: transport failure or an unreadable body.
    Unreachable,
}

impl Resolution {
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::Resolved(identity) => Some(identity),
            Self::Rejected | Self::Unreachable => None,
        }
    }
}

/// Issues the session-affecting remote operations.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one gateway is shared by every clone of the
///   state machine and by in-flight resolutions running on any task.
/// - Every returned future is `Send` so resolutions can be shared between
///   tasks.
pub trait SessionGateway: Send + Sync + 'static {
    /// Signs in with an identifier (email) and secret (password).
    ///
    /// # Errors
    /// - [`SessionError::AuthRejected`] with the server's message on a
    ///   non-success status
    /// - [`SessionError::Transport`] when no response was obtained
    fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Result<Grant, SessionError>> + Send;

    /// Creates an account. Issues no credential.
    ///
    /// # Errors
    /// Same shape as [`authenticate`](Self::authenticate).
    fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Ends the server-side session. Best-effort: never fails.
    fn deauthenticate(&self) -> impl Future<Output = LogoutAck> + Send;

    /// Asks the server who the current credential belongs to.
    fn resolve_identity(&self) -> impl Future<Output = Resolution> + Send;

    /// Renews the current credential.
    ///
    /// The default does nothing and succeeds, for servers without a
    /// refresh endpoint.
    ///
    /// # Errors
    /// - [`SessionError::Expired`] when the server no longer accepts the
    ///   credential
    /// - [`SessionError::Transport`] when no response was obtained
    fn refresh(&self) -> impl Future<Output = Result<Grant, SessionError>> + Send {
        async { Ok(Grant::default()) }
    }
}

/// Account-management operations that need a live session.
///
/// Every method fails with [`SessionError::Expired`] when the server
/// answers 401, and with [`SessionError::AuthRejected`] on any other
/// non-success status.
pub trait AccountGateway: Send + Sync + 'static {
    fn update_username(
        &self,
        new_username: &str,
    ) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Requests an email change. The server typically confirms by mail
    /// before the identity changes.
    fn update_email(
        &self,
        new_email: &str,
    ) -> impl Future<Output = Result<String, SessionError>> + Send;

    fn update_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<String, SessionError>> + Send;

    fn active_sessions(
        &self,
    ) -> impl Future<Output = Result<Vec<ActiveSession>, SessionError>> + Send;

    fn revoke_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<String, SessionError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_into_identity() {
        let id = Identity::new("a@b.com");
        assert_eq!(
            Resolution::Resolved(id.clone()).into_identity(),
            Some(id)
        );
        assert_eq!(Resolution::Rejected.into_identity(), None);
        assert_eq!(Resolution::Unreachable.into_identity(), None);
    }

    #[test]
    fn test_grant_debug_redacts_token() {
        let grant = Grant {
            message: "ok".into(),
            token: Some("s3cret".into()),
        };
        assert!(!format!("{grant:?}").contains("s3cret"));
    }
}
