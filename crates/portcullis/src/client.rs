//! The assembled client: transport, credential store, gateway, state
//! machine and router wired together from one [`ClientConfig`].

use std::sync::Arc;

use portcullis_router::{RouteTable, Router};
use portcullis_session::{
    ChannelNavigator, CookieCredentials, CredentialMode, CredentialStore, FileSlot,
    HttpGateway, MemorySlot, SessionMachine, SessionStatus, TokenCredentials,
};
use portcullis_transport::ReqwestTransport;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{ClientConfig, PortcullisError, keepalive};

/// The gateway a [`PortcullisClient`] talks through.
pub type ClientGateway = HttpGateway<ReqwestTransport>;

/// A ready-to-use client.
///
/// ```text
///   ReqwestTransport ──→ HttpGateway ──→ SessionMachine ──→ Router
///         ↑                   ↑               │ navigate      ↑
///   cookie jar (cookie)  CredentialStore      └──channel──→ driver task
/// ```
///
/// Created via [`PortcullisClient::builder`]. Call [`start`](Self::start)
/// once inside a Tokio runtime before using the router.
pub struct PortcullisClient {
    config: ClientConfig,
    machine: SessionMachine<ClientGateway>,
    router: Router<ClientGateway>,
    navigation: Option<mpsc::UnboundedReceiver<String>>,
    driver: Option<JoinHandle<()>>,
}

impl PortcullisClient {
    pub fn builder(config: ClientConfig) -> PortcullisClientBuilder {
        PortcullisClientBuilder {
            config,
            routes: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session state machine. Clones share state.
    pub fn machine(&self) -> &SessionMachine<ClientGateway> {
        &self.machine
    }

    pub fn router(&self) -> &Router<ClientGateway> {
        &self.router
    }

    /// Resolves the session once, starts applying the machine's navigation
    /// requests, and navigates to `initial_location`.
    ///
    /// Returns the location finally admitted. Later calls skip the
    /// resolution and the driver and only navigate.
    ///
    /// # Errors
    /// [`PortcullisError::Router`] if `initial_location` is invalid or
    /// redirects loop.
    pub async fn start(&mut self, initial_location: &str) -> Result<String, PortcullisError> {
        let status = self.machine.init().await;
        tracing::info!(%status, mode = %self.config.credential_mode, "session initialized");

        if let Some(requests) = self.navigation.take() {
            self.driver = Some(self.router.drive(requests));
        }

        Ok(self.router.navigate(initial_location).await?)
    }

    /// Runs the bootstrap resolution without navigating.
    pub async fn init(&self) -> SessionStatus {
        self.machine.init().await
    }

    /// Spawns the keep-alive task on this client's refresh schedule.
    /// It stops when `shutdown` turns `true`.
    pub fn spawn_keepalive(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        keepalive::spawn_keepalive(self.machine.clone(), self.config.refresh.clone(), shutdown)
    }
}

impl Drop for PortcullisClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`PortcullisClient`].
pub struct PortcullisClientBuilder {
    config: ClientConfig,
    routes: Option<RouteTable>,
}

impl PortcullisClientBuilder {
    /// Replaces the standard route table.
    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Assembles the client.
    ///
    /// # Errors
    /// [`PortcullisError::Transport`] if the base URL doesn't parse or the
    /// HTTP client can't be created.
    pub fn build(self) -> Result<PortcullisClient, PortcullisError> {
        let config = self.config;
        let mode = config.credential_mode;

        let transport = ReqwestTransport::builder(&config.base_url)
            .cookie_store(mode == CredentialMode::Cookie)
            .timeout(config.timeout)
            .build()?;

        let store: Arc<dyn CredentialStore> = match (mode, &config.token_dir) {
            (CredentialMode::Cookie, _) => Arc::new(CookieCredentials),
            (CredentialMode::Token, Some(dir)) => {
                Arc::new(TokenCredentials::new(FileSlot::new(dir)))
            }
            (CredentialMode::Token, None) => {
                tracing::debug!("no token directory, keeping the token in memory");
                Arc::new(TokenCredentials::new(MemorySlot::new()))
            }
        };

        let gateway = HttpGateway::new(transport, Arc::clone(&store));
        let (navigator, navigation) = ChannelNavigator::new();
        let machine = SessionMachine::new(
            gateway,
            store,
            Arc::new(navigator),
            config.session_config(),
        );
        let router = Router::new(
            machine.clone(),
            self.routes.unwrap_or_else(RouteTable::standard),
            config.router_config(),
        );

        tracing::debug!(base_url = %config.base_url, %mode, "client built");

        Ok(PortcullisClient {
            config,
            machine,
            router,
            navigation: Some(navigation),
            driver: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_bad_base_url() {
        let result = PortcullisClient::builder(
            ClientConfig::default().with_base_url("not a url"),
        )
        .build();
        assert!(matches!(result, Err(PortcullisError::Transport(_))));
    }

    #[test]
    fn test_build_picks_store_for_mode() {
        let cookie = PortcullisClient::builder(ClientConfig::default())
            .build()
            .unwrap();
        assert_eq!(cookie.machine().credential_mode(), CredentialMode::Cookie);

        let token = PortcullisClient::builder(
            ClientConfig::default().with_credential_mode(CredentialMode::Token),
        )
        .build()
        .unwrap();
        assert_eq!(token.machine().credential_mode(), CredentialMode::Token);
    }

    #[tokio::test]
    async fn test_init_token_mode_without_token_needs_no_server() {
        let client = PortcullisClient::builder(
            ClientConfig::default()
                .with_base_url("http://127.0.0.1:9")
                .with_credential_mode(CredentialMode::Token),
        )
        .build()
        .unwrap();

        assert_eq!(client.init().await, SessionStatus::Unauthenticated);
    }
}
