//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A `reqwest`-backed [`HttpTransport`] bound to one base URL.
///
/// In cookie deployments the client keeps a cookie jar, so whatever the
/// server sets on `/login` rides along on every later request. That jar is
/// the whole "cookie credential store": the session layer never sees it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base: String,
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Starts building a transport for `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ReqwestTransportBuilder {
        ReqwestTransportBuilder {
            base_url: base_url.into(),
            cookie_store: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url_for(&self, path: &str) -> Result<reqwest::Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        reqwest::Url::parse(&joined)
            .map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    base_url: String,
    cookie_store: bool,
    timeout: Duration,
}

impl ReqwestTransportBuilder {
    /// Keep a cookie jar and attach it to every request.
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the transport.
    ///
    /// # Errors
    /// [`TransportError::InvalidUrl`] if the base URL does not parse, or
    /// [`TransportError::RequestFailed`] if the client cannot be created.
    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            TransportError::InvalidUrl(format!("{}: {e}", self.base_url))
        })?;

        let client = reqwest::Client::builder()
            .cookie_store(self.cookie_store)
            .timeout(self.timeout)
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        tracing::debug!(
            base_url = %self.base_url,
            cookie_store = self.cookie_store,
            "http transport ready"
        );

        Ok(ReqwestTransport {
            base: self.base_url,
            client,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "http exchange complete"
        );

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidHeader(e.to_string())
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}
