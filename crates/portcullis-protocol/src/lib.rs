//! Wire protocol for Portcullis.
//!
//! This crate defines the bodies the client and the auth server exchange:
//!
//! - **Types** ([`Identity`], [`Credentials`], [`MessageReply`], etc.) —
//!   request and response bodies of the session endpoints.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those bodies are
//!   converted to/from bytes, including the lenient decoding rules for
//!   failure responses.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (bodies) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ActiveSession, ActiveSessionsReply, Credentials, ErrorReply, Identity,
    MessageReply, RevokeSession, UpdateEmail, UpdatePassword, UpdateUsername,
};
