/// Errors that can occur in the transport layer.
///
/// These only describe failures to complete an exchange. A response with a
/// non-2xx status is NOT a transport error; it comes back as an
/// [`HttpResponse`](crate::HttpResponse) for the layers above to interpret.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The configured base URL or a request path could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request never produced a response (DNS, refused, reset, TLS...).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be read.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
