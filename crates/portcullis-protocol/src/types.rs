//! Wire types: the request and response bodies of the session endpoints.
//!
//! Request bodies only derive `Serialize`, response bodies only
//! `Deserialize`. Response bodies also derive `Default` so they can be
//! decoded leniently (see [`Codec::decode_or_default`](crate::Codec)).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Server-confirmed attributes of the signed-in user, as returned by
/// `GET /user`.
///
/// Always replaced wholesale by the session layer, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// When the account was created, as the server formats it.
    #[serde(
        default,
        alias = "created_at",
        alias = "joinedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub joined: Option<String>,
}

impl Identity {
    /// An identity with only an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: None,
            joined: None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /login` and `POST /register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Hand-written so passwords never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /update-username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateUsername {
    pub new_username: String,
}

/// Body of `POST /update-email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateEmail {
    pub new_email: String,
}

/// Body of `POST /update-password`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePassword {
    pub old_password: String,
    pub new_password: String,
}

impl fmt::Debug for UpdatePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePassword").finish_non_exhaustive()
    }
}

/// Body of `POST /logout-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokeSession {
    pub session_id: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The generic `{message, token?}` success body.
///
/// `token` is only present when the deployment issues bearer tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
}

/// The `{error}` failure body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorReply {
    #[serde(default)]
    pub error: Option<String>,
}

/// One of the user's sessions, as listed by `GET /active-sessions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActiveSession {
    #[serde(alias = "ID")]
    pub id: String,

    #[serde(
        default,
        rename = "userAgent",
        alias = "UserAgent",
        alias = "user_agent"
    )]
    pub user_agent: String,

    #[serde(
        default,
        rename = "ipAddress",
        alias = "IPAddress",
        alias = "ip_address"
    )]
    pub ip_address: String,
}

/// `GET /active-sessions` reply. Servers send either a bare list or the
/// list wrapped in `{ "sessions": [...] }`; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ActiveSessionsReply {
    Wrapped { sessions: Vec<ActiveSession> },
    Bare(Vec<ActiveSession>),
}

impl Default for ActiveSessionsReply {
    fn default() -> Self {
        Self::Bare(Vec::new())
    }
}

impl ActiveSessionsReply {
    pub fn into_sessions(self) -> Vec<ActiveSession> {
        match self {
            Self::Wrapped { sessions } | Self::Bare(sessions) => sessions,
        }
    }
}
