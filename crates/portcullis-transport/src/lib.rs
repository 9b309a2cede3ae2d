//! Transport abstraction layer for Portcullis.
//!
//! Provides the [`HttpTransport`] trait, an opaque request/response function
//! that the session gateway issues its calls through. Everything above this
//! crate speaks in [`HttpRequest`] / [`HttpResponse`] and never touches a
//! concrete HTTP client.
//!
//! # Feature Flags
//!
//! - `http` (default) — [`ReqwestTransport`] via `reqwest`

mod error;
#[cfg(feature = "http")]
mod reqwest_transport;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use reqwest_transport::{ReqwestTransport, ReqwestTransportBuilder};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// HTTP method of an outgoing request.
///
/// Only the two verbs the session endpoints use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// An outgoing request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/login`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attaches an `Authorization: Bearer <token>` header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    /// Sets a JSON body and the matching `Content-Type` header.
    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self.with_header("Content-Type", "application/json")
    }

    /// Returns the value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A completed exchange: status code plus raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends a request and waits for the response.
///
/// Implementations are responsible for attaching ambient credentials
/// (a cookie jar) when the deployment uses cookie sessions, and for
/// enforcing request timeouts. Explicit bearer tokens arrive as ordinary
/// request headers.
pub trait HttpTransport: Send + Sync + 'static {
    /// Performs a single request/response exchange.
    ///
    /// # Errors
    /// Returns a [`TransportError`] only when no response was obtained.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
    }

    #[test]
    fn test_with_bearer_sets_authorization_header() {
        let req = HttpRequest::get("/user").with_bearer("abc");
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_with_json_body_sets_content_type() {
        let req = HttpRequest::post("/login").with_json_body(b"{}".to_vec());
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_header_missing_returns_none() {
        let req = HttpRequest::post("/logout");
        assert!(req.header("Authorization").is_none());
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(HttpResponse::new(401, "").is_unauthorized());
    }
}
