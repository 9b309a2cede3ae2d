//! # Portcullis
//!
//! Client-side authentication sessions with guarded navigation.
//!
//! Portcullis keeps one answer current: *who is signed in right now?* It
//! resolves that against an auth server, keeps the credential (a cookie or a
//! bearer token) where later requests can find it, renews it before it
//! expires, and refuses navigation into protected routes without it.
//!
//! | Crate | Concern |
//! |---|---|
//! | `portcullis-transport` | HTTP exchange (`reqwest`, cookie jar) |
//! | `portcullis-protocol` | request/response bodies, lenient error decoding |
//! | `portcullis-session` | credential store, gateway, session state machine |
//! | `portcullis-router` | route table, navigation guard, router |
//! | `portcullis-refresh` | keep-alive schedule |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portcullis::prelude::*;
//!
//! # async fn run() -> Result<(), PortcullisError> {
//! portcullis::init_tracing();
//!
//! let mut client = PortcullisClient::builder(ClientConfig::from_env()?).build()?;
//! client.start("/").await?;
//!
//! client.machine().login("alice@example.com", "hunter2").await?;
//! // the router is now at /dashboard
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod keepalive;

pub use client::{ClientGateway, PortcullisClient, PortcullisClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use error::PortcullisError;
pub use keepalive::spawn_keepalive;

pub use portcullis_protocol as protocol;
pub use portcullis_refresh as refresh;
pub use portcullis_router as router;
pub use portcullis_session as session;
pub use portcullis_transport as transport;

/// Installs a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{ClientConfig, PortcullisClient, PortcullisError};
    pub use portcullis_refresh::RefreshConfig;
    pub use portcullis_router::{Decision, GuardPolicy, RouteAccess, RouteTable, Router};
    pub use portcullis_session::{
        CredentialMode, Identity, SessionError, SessionMachine, SessionSnapshot,
        SessionStatus,
    };
}
