//! In-process auth server for end-to-end client tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use portcullis::{ClientConfig, PortcullisClient};
use portcullis::session::CredentialMode;
use serde_json::{Value, json};
use tokio::sync::watch;

// =========================================================================
// Server state
// =========================================================================

#[derive(Default)]
struct Accounts {
    /// email → password
    users: HashMap<String, String>,
    /// session id → email
    sessions: HashMap<String, String>,
    next_session: u64,
}

#[derive(Clone)]
struct AppState {
    mode: CredentialMode,
    accounts: Arc<Mutex<Accounts>>,
}

impl AppState {
    /// The session a request carries, by cookie or bearer token.
    fn session_of(&self, headers: &HeaderMap) -> Option<(String, String)> {
        let header_value = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let sid = match self.mode {
            CredentialMode::Cookie => header_value(header::COOKIE)
                .split(';')
                .find_map(|pair| pair.trim().strip_prefix("auth_token=").map(str::to_string)),
            CredentialMode::Token => header_value(header::AUTHORIZATION)
                .strip_prefix("Bearer ")
                .map(str::to_string),
        }?;
        let accounts = self.accounts.lock().unwrap();
        accounts.sessions.get(&sid).map(|email| (sid.clone(), email.clone()))
    }
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
}

// =========================================================================
// Handlers
// =========================================================================

async fn register(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or("").to_string();
    let password = body["password"].as_str().unwrap_or("").to_string();
    let mut accounts = state.accounts.lock().unwrap();
    if accounts.users.contains_key(&email) {
        return reply(StatusCode::CONFLICT, json!({ "error": "User already exists" }));
    }
    accounts.users.insert(email, password);
    reply(StatusCode::CREATED, json!({ "message": "User registered successfully" }))
}

async fn login(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");
    let mut accounts = state.accounts.lock().unwrap();
    if accounts.users.get(email).map(String::as_str) != Some(password) {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({ "error": "Invalid email or password" }),
        );
    }

    accounts.next_session += 1;
    let sid = format!("s{}", accounts.next_session);
    accounts.sessions.insert(sid.clone(), email.to_string());

    match state.mode {
        CredentialMode::Cookie => (
            StatusCode::OK,
            [(header::SET_COOKIE, format!("auth_token={sid}; Path=/; HttpOnly"))],
            Json(json!({ "message": "Login successful" })),
        )
            .into_response(),
        CredentialMode::Token => reply(
            StatusCode::OK,
            json!({ "message": "Login successful", "token": sid }),
        ),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some((sid, _)) = state.session_of(&headers) else {
        return unauthorized();
    };
    state.accounts.lock().unwrap().sessions.remove(&sid);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "auth_token=; Path=/; Max-Age=0".to_string())],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}

async fn user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.session_of(&headers) {
        Some((_, email)) => reply(StatusCode::OK, json!({ "email": email })),
        None => unauthorized(),
    }
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.session_of(&headers) {
        Some((sid, _)) => reply(
            StatusCode::OK,
            json!({ "message": "Session refreshed", "token": sid }),
        ),
        None => unauthorized(),
    }
}

async fn active_sessions(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some((_, email)) = state.session_of(&headers) else {
        return unauthorized();
    };
    let accounts = state.accounts.lock().unwrap();
    let sessions: Vec<Value> = accounts
        .sessions
        .iter()
        .filter(|(_, owner)| **owner == email)
        .map(|(id, _)| json!({ "id": id, "userAgent": "test", "ipAddress": "127.0.0.1" }))
        .collect();
    reply(StatusCode::OK, json!({ "sessions": sessions }))
}

// =========================================================================
// Harness
// =========================================================================

/// A running stub auth server.
pub struct AuthServer {
    pub base_url: String,
    accounts: Arc<Mutex<Accounts>>,
}

impl AuthServer {
    /// Starts the stub on a random port.
    pub async fn start(mode: CredentialMode) -> Self {
        let accounts = Arc::new(Mutex::new(Accounts::default()));
        let state = AppState {
            mode,
            accounts: Arc::clone(&accounts),
        };
        let app = axum::Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/user", get(user))
            .route("/refresh", post(refresh))
            .route("/active-sessions", get(active_sessions))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            accounts,
        }
    }

    pub fn add_user(&self, email: &str, password: &str) {
        self.accounts
            .lock()
            .unwrap()
            .users
            .insert(email.to_string(), password.to_string());
    }

    /// Ends every session server-side, as an admin or another device would.
    pub fn revoke_all(&self) {
        self.accounts.lock().unwrap().sessions.clear();
    }

    pub fn session_count(&self) -> usize {
        self.accounts.lock().unwrap().sessions.len()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(5))
    }

    pub fn client(&self, config: ClientConfig) -> PortcullisClient {
        PortcullisClient::builder(config).build().expect("client should build")
    }
}

/// Waits until the router publishes `expected`.
pub async fn wait_for_location(
    locations: &mut watch::Receiver<Option<String>>,
    expected: &str,
) {
    tokio::time::timeout(
        Duration::from_secs(5),
        locations.wait_for(|location| location.as_deref() == Some(expected)),
    )
    .await
    .unwrap_or_else(|_| panic!("router never reached {expected}"))
    .expect("router dropped");
}
