//! Session management for Portcullis.
//!
//! This crate holds the client's view of an authenticated session:
//!
//! 1. **Credential storage**: where the credential lives
//!    ([`CredentialStore`]: cookies managed by the transport, or a bearer
//!    token in a durable [`KeySlot`])
//! 2. **Gateway**: the remote operations that affect the session
//!    ([`SessionGateway`], [`AccountGateway`], and the HTTP implementation
//!    [`HttpGateway`])
//! 3. **State machine**: the current status and identity, single-flight
//!    resolution, and the login/logout side effects ([`SessionMachine`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)      ← guards navigation on the machine's status
//!     ↕
//! Session (this crate) ← owns status, identity, credential
//!     ↕
//! Protocol / Transport (below) ← wire bodies, HTTP exchange
//! ```
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | authenticate | `POST /login` `{email, password}` |
//! | register | `POST /register` `{email, password}` |
//! | deauthenticate | `POST /logout` |
//! | resolve identity | `GET /user` |
//! | refresh | `POST /refresh` |
//! | update username | `POST /update-username` `{new_username}` |
//! | update email | `POST /update-email` `{new_email}` |
//! | update password | `POST /update-password` `{old_password, new_password}` |
//! | list sessions | `GET /active-sessions` |
//! | revoke session | `POST /logout-session` `{session_id}` |

mod credential;
mod error;
mod gateway;
mod http_gateway;
mod machine;
mod navigator;
mod session;

pub use credential::{
    CookieCredentials, Credential, CredentialMode, CredentialStore, FileSlot,
    KeySlot, MemorySlot, TOKEN_KEY, TokenCredentials,
};
pub use error::SessionError;
pub use gateway::{AccountGateway, Grant, LogoutAck, Resolution, SessionGateway};
pub use http_gateway::HttpGateway;
pub use machine::{SessionMachine, UNCONFIRMED_LOGOUT};
pub use navigator::{ChannelNavigator, Navigator, NoopNavigator};
pub use session::{SessionConfig, SessionSnapshot, SessionStatus};

pub use portcullis_protocol::{ActiveSession, Identity};
