//! Codec trait and implementations for serializing/deserializing bodies.
//!
//! The session gateway doesn't care HOW bodies are serialized, it just
//! needs something that implements [`Codec`]. The server speaks JSON, so
//! [`JsonCodec`] is the only implementation today.
//!
//! # Lenient decoding
//!
//! Response bodies are untrusted: a 502 from a proxy, an empty 401, or a
//! half-written body all happen in practice. [`Codec::decode_or_default`]
//! and [`Codec::error_message`] never fail. A body that is missing or does
//! not parse is treated as an empty object, so a bad body can never raise a
//! second error on top of the failed request it came with.

use serde::{Serialize, de::DeserializeOwned};

use crate::{ErrorReply, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one codec can live inside a gateway that is
/// shared across tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Decodes a body, falling back to `T::default()` when the body is
    /// empty, blank, or malformed.
    fn decode_or_default<T: DeserializeOwned + Default>(
        &self,
        data: &[u8],
    ) -> T {
        if data.iter().all(u8::is_ascii_whitespace) {
            return T::default();
        }
        self.decode(data).unwrap_or_default()
    }

    /// Extracts the `error` field of a failure body, if there is a
    /// non-empty one.
    fn error_message(&self, data: &[u8]) -> Option<String> {
        self.decode_or_default::<ErrorReply>(data)
            .error
            .filter(|msg| !msg.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use portcullis_protocol::{Codec, Identity, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let identity: Identity = codec.decode(br#"{"email":"a@b.com"}"#).unwrap();
/// assert_eq!(identity.email, "a@b.com");
///
/// // A failure body without JSON yields no message instead of an error.
/// assert_eq!(codec.error_message(b"<html>bad gateway</html>"), None);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Credentials, MessageReply};

    #[test]
    fn test_encode_credentials_uses_wire_field_names() {
        let bytes = JsonCodec
            .encode(&Credentials::new("a@b.com", "hunter2"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["email"], "a@b.com");
        assert_eq!(value["password"], "hunter2");
    }

    #[test]
    fn test_decode_malformed_returns_decode_error() {
        let result: Result<MessageReply, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_or_default_empty_body_is_default() {
        let reply: MessageReply = JsonCodec.decode_or_default(b"");
        assert_eq!(reply, MessageReply::default());

        let reply: MessageReply = JsonCodec.decode_or_default(b"  \n");
        assert_eq!(reply, MessageReply::default());
    }

    #[test]
    fn test_decode_or_default_malformed_body_is_default() {
        let reply: MessageReply = JsonCodec.decode_or_default(b"<html>");
        assert_eq!(reply, MessageReply::default());
    }

    #[test]
    fn test_decode_or_default_valid_body_is_decoded() {
        let reply: MessageReply =
            JsonCodec.decode_or_default(br#"{"message":"ok","token":"t"}"#);
        assert_eq!(reply.message.as_deref(), Some("ok"));
        assert_eq!(reply.token.as_deref(), Some("t"));
    }

    #[test]
    fn test_error_message_extracts_error_field() {
        let msg = JsonCodec.error_message(br#"{"error":"bad creds"}"#);
        assert_eq!(msg.as_deref(), Some("bad creds"));
    }

    #[test]
    fn test_error_message_missing_or_blank_is_none() {
        assert_eq!(JsonCodec.error_message(b""), None);
        assert_eq!(JsonCodec.error_message(br#"{"message":"x"}"#), None);
        assert_eq!(JsonCodec.error_message(br#"{"error":"  "}"#), None);
        assert_eq!(JsonCodec.error_message(br#"{"error":42}"#), None);
    }
}
