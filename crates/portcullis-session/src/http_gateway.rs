//! [`SessionGateway`] over an [`HttpTransport`].
//!
//! Maps each operation to one request (see the endpoint table in the crate
//! docs) and applies the response rules in one place:
//!
//! - any non-2xx is a failure; the failure text is the body's `error` field,
//!   or a per-operation fallback when there is none
//! - bodies are decoded leniently, so an empty or garbled body never turns
//!   into a second error
//! - in token deployments the stored bearer token is attached to every
//!   request

use std::sync::Arc;

use portcullis_protocol::{
    ActiveSession, ActiveSessionsReply, Codec, Credentials, Identity,
    JsonCodec, MessageReply, RevokeSession, UpdateEmail, UpdatePassword,
    UpdateUsername,
};
use portcullis_transport::{HttpRequest, HttpResponse, HttpTransport};
use serde::Serialize;

use crate::{
    AccountGateway, Credential, CredentialStore, Grant, LogoutAck,
    Resolution, SessionError, SessionGateway,
};

/// The production [`SessionGateway`]: JSON over HTTP.
pub struct HttpGateway<T: HttpTransport, C: Codec = JsonCodec> {
    transport: T,
    codec: C,
    store: Arc<dyn CredentialStore>,
}

impl<T: HttpTransport> HttpGateway<T> {
    /// Creates a JSON gateway. `store` decides whether requests carry a
    /// bearer token; it must be the same store the state machine writes to.
    pub fn new(transport: T, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_codec(transport, JsonCodec, store)
    }
}

impl<T: HttpTransport, C: Codec> HttpGateway<T, C> {
    pub fn with_codec(
        transport: T,
        codec: C,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            transport,
            codec,
            store,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request`, attaching the bearer token when one is stored.
    async fn exchange(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, SessionError> {
        let request = match self.store.read() {
            Some(Credential::Bearer(token)) => request.with_bearer(&token),
            _ => request,
        };
        Ok(self.transport.send(request).await?)
    }

    fn with_body<B: Serialize>(
        &self,
        request: HttpRequest,
        body: &B,
    ) -> Result<HttpRequest, SessionError> {
        Ok(request.with_json_body(self.codec.encode(body)?))
    }

    fn failure_text(&self, response: &HttpResponse, fallback: &str) -> String {
        self.codec
            .error_message(&response.body)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Failure of a request that needs a live session: 401 means the
    /// session is gone, anything else is a plain rejection.
    fn session_failure(
        &self,
        response: &HttpResponse,
        fallback: &str,
    ) -> SessionError {
        let text = self.failure_text(response, fallback);
        if response.is_unauthorized() {
            SessionError::Expired(text)
        } else {
            SessionError::AuthRejected(text)
        }
    }

    fn message_of(&self, response: &HttpResponse) -> String {
        self.codec
            .decode_or_default::<MessageReply>(&response.body)
            .message
            .unwrap_or_default()
    }

    /// The shape shared by every account mutation: send, map failure,
    /// return the server's message.
    async fn account_call(
        &self,
        request: HttpRequest,
        fallback: &str,
    ) -> Result<String, SessionError> {
        let response = self.exchange(request).await?;
        if !response.is_success() {
            return Err(self.session_failure(&response, fallback));
        }
        Ok(self.message_of(&response))
    }
}

impl<T: HttpTransport, C: Codec> SessionGateway for HttpGateway<T, C> {
    async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<Grant, SessionError> {
        let request = self.with_body(
            HttpRequest::post("/login"),
            &Credentials::new(identifier, secret),
        )?;
        let response = self.exchange(request).await?;

        if !response.is_success() {
            return Err(SessionError::AuthRejected(
                self.failure_text(&response, "Login failed"),
            ));
        }

        let reply: MessageReply = self.codec.decode_or_default(&response.body);
        Ok(Grant {
            message: reply.message.unwrap_or_default(),
            token: reply.token.filter(|t| !t.is_empty()),
        })
    }

    async fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<String, SessionError> {
        let request = self.with_body(
            HttpRequest::post("/register"),
            &Credentials::new(identifier, secret),
        )?;
        let response = self.exchange(request).await?;

        if !response.is_success() {
            return Err(SessionError::AuthRejected(
                self.failure_text(&response, "Registration failed"),
            ));
        }
        Ok(self.message_of(&response))
    }

    async fn deauthenticate(&self) -> LogoutAck {
        match self.exchange(HttpRequest::post("/logout")).await {
            Ok(response) if response.is_success() => {
                LogoutAck::Confirmed(self.message_of(&response))
            }
            Ok(response) => LogoutAck::Unconfirmed(self.failure_text(
                &response,
                &format!("server answered {}", response.status),
            )),
            Err(e) => LogoutAck::Unconfirmed(e.to_string()),
        }
    }

    async fn resolve_identity(&self) -> Resolution {
        let response = match self.exchange(HttpRequest::get("/user")).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "identity request failed");
                return Resolution::Unreachable;
            }
        };

        if !response.is_success() {
            tracing::debug!(status = response.status, "no authenticated session");
            return Resolution::Rejected;
        }

        match self.codec.decode::<Identity>(&response.body) {
            Ok(identity) => Resolution::Resolved(identity),
            Err(e) => {
                tracing::warn!(error = %e, "identity body unreadable");
                Resolution::Unreachable
            }
        }
    }

    async fn refresh(&self) -> Result<Grant, SessionError> {
        let response = self.exchange(HttpRequest::post("/refresh")).await?;

        if !response.is_success() {
            return Err(self.session_failure(&response, "Session refresh failed"));
        }

        let reply: MessageReply = self.codec.decode_or_default(&response.body);
        Ok(Grant {
            message: reply.message.unwrap_or_default(),
            token: reply.token.filter(|t| !t.is_empty()),
        })
    }
}

impl<T: HttpTransport, C: Codec> AccountGateway for HttpGateway<T, C> {
    async fn update_username(
        &self,
        new_username: &str,
    ) -> Result<String, SessionError> {
        let request = self.with_body(
            HttpRequest::post("/update-username"),
            &UpdateUsername {
                new_username: new_username.to_string(),
            },
        )?;
        self.account_call(request, "Failed to update username").await
    }

    async fn update_email(
        &self,
        new_email: &str,
    ) -> Result<String, SessionError> {
        let request = self.with_body(
            HttpRequest::post("/update-email"),
            &UpdateEmail {
                new_email: new_email.to_string(),
            },
        )?;
        self.account_call(request, "Failed to update email").await
    }

    async fn update_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, SessionError> {
        let request = self.with_body(
            HttpRequest::post("/update-password"),
            &UpdatePassword {
                old_password: old_password.to_string(),
                new_password: new_password.to_string(),
            },
        )?;
        self.account_call(request, "Failed to update password").await
    }

    async fn active_sessions(&self) -> Result<Vec<ActiveSession>, SessionError> {
        let response =
            self.exchange(HttpRequest::get("/active-sessions")).await?;

        if !response.is_success() {
            return Err(
                self.session_failure(&response, "Failed to retrieve sessions")
            );
        }

        Ok(self
            .codec
            .decode_or_default::<ActiveSessionsReply>(&response.body)
            .into_sessions())
    }

    async fn revoke_session(
        &self,
        session_id: &str,
    ) -> Result<String, SessionError> {
        let request = self.with_body(
            HttpRequest::post("/logout-session"),
            &RevokeSession {
                session_id: session_id.to_string(),
            },
        )?;
        self.account_call(request, "Failed to log out session").await
    }
}
