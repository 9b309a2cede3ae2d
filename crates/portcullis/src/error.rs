//! Unified error type for the Portcullis client.

use portcullis_protocol::ProtocolError;
use portcullis_router::RouterError;
use portcullis_session::SessionError;
use portcullis_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `portcullis` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PortcullisError {
    /// The HTTP client could not be built or a request never completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session operation failed (rejected, expired, not signed in).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Navigation failed (bad location, redirect loop).
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::RequestFailed("refused".into());
        let portcullis_err: PortcullisError = err.into();
        assert!(matches!(portcullis_err, PortcullisError::Transport(_)));
        assert!(portcullis_err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let portcullis_err: PortcullisError = err.into();
        assert!(matches!(portcullis_err, PortcullisError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthRejected("bad creds".into());
        let portcullis_err: PortcullisError = err.into();
        assert!(matches!(portcullis_err, PortcullisError::Session(_)));
        assert_eq!(portcullis_err.to_string(), "request rejected: bad creds");
    }

    #[test]
    fn test_from_router_error() {
        let err = RouterError::InvalidLocation("dashboard".into());
        let portcullis_err: PortcullisError = err.into();
        assert!(matches!(portcullis_err, PortcullisError::Router(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::Missing("PORTCULLIS_TOKEN_DIR");
        let portcullis_err: PortcullisError = err.into();
        assert!(matches!(portcullis_err, PortcullisError::Config(_)));
        assert!(portcullis_err.to_string().contains("PORTCULLIS_TOKEN_DIR"));
    }
}
