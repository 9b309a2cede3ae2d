//! Common test utilities for portcullis-session integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use portcullis_session::{
    ChannelNavigator, CookieCredentials, CredentialStore, HttpGateway,
    MemorySlot, SessionConfig, SessionMachine, TokenCredentials,
};
use portcullis_transport::{
    HttpRequest, HttpResponse, HttpTransport, TransportError,
};
use tokio::sync::mpsc;

/// How the fake server answers one path.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, &'static str),
    NetworkDown,
}

/// An in-memory `HttpTransport` that answers from a per-path script and
/// records every request it sees. Unscripted paths answer 404.
#[derive(Default)]
pub struct FakeServer {
    routes: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[allow(dead_code)]
impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(path.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// How many requests were sent to `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

impl HttpTransport for FakeServer {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        // Yield once so concurrent callers interleave the way they would
        // over a real network.
        tokio::task::yield_now().await;
        let reply = self.routes.lock().unwrap().get(&request.path).cloned();
        self.requests.lock().unwrap().push(request);
        match reply {
            Some(Reply::Json(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::NetworkDown) => Err(TransportError::RequestFailed(
                "connection refused".into(),
            )),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

pub type Machine = SessionMachine<HttpGateway<Arc<FakeServer>>>;

/// Everything a test needs to drive and observe a machine.
#[allow(dead_code)]
pub struct Harness {
    pub server: Arc<FakeServer>,
    pub store: Arc<dyn CredentialStore>,
    pub machine: Machine,
    pub navigations: mpsc::UnboundedReceiver<String>,
}

#[allow(dead_code)]
impl Harness {
    pub fn cookie() -> Self {
        Self::with_store(Arc::new(CookieCredentials))
    }

    pub fn token() -> Self {
        Self::with_store(Arc::new(TokenCredentials::new(MemorySlot::new())))
    }

    fn with_store(store: Arc<dyn CredentialStore>) -> Self {
        let server = FakeServer::new();
        let (navigator, navigations) = ChannelNavigator::new();
        let gateway = HttpGateway::new(server.clone(), store.clone());
        let machine = SessionMachine::new(
            gateway,
            store.clone(),
            Arc::new(navigator),
            SessionConfig::default(),
        );
        Self {
            server,
            store,
            machine,
            navigations,
        }
    }

    /// The last navigation requested so far, if any.
    pub fn last_navigation(&mut self) -> Option<String> {
        let mut last = None;
        while let Ok(location) = self.navigations.try_recv() {
            last = Some(location);
        }
        last
    }
}
