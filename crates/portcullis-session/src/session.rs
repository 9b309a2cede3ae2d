//! Session types: the data the state machine publishes.
//!
//! A session is the client's belief about who is signed in. It tracks:
//! - WHETHER someone is signed in (`SessionStatus`)
//! - WHO that is, as confirmed by the server (`Identity`)
//! - WHETHER an operation is running and what the last failure said
//!   (`SessionSnapshot`)

use std::fmt;

use portcullis_protocol::Identity;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Where the state machine sends the user after a login or logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Location navigated to after a successful login.
    ///
    /// Default: `/dashboard`.
    pub authenticated_landing: String,

    /// Location navigated to after a logout.
    ///
    /// Default: `/login`.
    pub login_location: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            authenticated_landing: "/dashboard".to_string(),
            login_location: "/login".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Whether anyone is signed in, as far as the client knows.
///
/// ```text
///                 resolve (server confirms)
///   Unknown ─────────────────────────────────→ Authenticated(identity)
///      │                                           │    ↑
///      │ resolve (rejected / unreachable)   logout │    │ login + resolve
///      ▼                                           ▼    │
///   Unauthenticated ←──────────────────────────────┘────┘
/// ```
///
/// - **Unknown**: nothing has been asked yet. Only the initial state;
///   nothing ever transitions back to it.
/// - **Authenticated**: the server confirmed a session. The identity lives
///   inside the variant, so "authenticated without an identity" cannot be
///   represented.
/// - **Unauthenticated**: confirmed signed out, or the server could not
///   confirm a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Unknown,
    Authenticated(Identity),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The confirmed identity, present exactly when authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Unknown | Self::Unauthenticated => None,
        }
    }

    /// Builds a status from a resolved identity (or its absence).
    pub fn from_identity(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => Self::Authenticated(identity),
            None => Self::Unauthenticated,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Authenticated(identity) => {
                write!(f, "authenticated as {identity}")
            }
            Self::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Everything an observer can see about the session at one instant.
///
/// Published through a `tokio::sync::watch` channel, so observers always
/// see a consistent triple and never a half-applied transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,

    /// `true` while a login, logout, or registration is running.
    pub busy: bool,

    /// User-facing text of the most recent failure, until cleared or until
    /// the next operation starts.
    pub error_message: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.status.is_authenticated()
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.status.identity()
    }
}
