//! The session state machine.
//!
//! [`SessionMachine`] owns the client's view of the session and is the only
//! thing allowed to change it. Everything else reads snapshots or calls one
//! of its operations.
//!
//! # Concurrency
//!
//! Three kinds of caller interleave here: the bootstrap hook, the
//! navigation guard, and explicit user actions. Two mechanisms keep them
//! from stepping on each other:
//!
//! 1. **Operation lock** (`tokio::sync::Mutex<()>`): `login`, `logout`,
//!    `register`, `refresh`, and the account operations run one at a time.
//!    A login can never resolve concurrently with a logout's reset.
//!
//! 2. **Single-flight resolution**: `resolve` is NOT behind the operation
//!    lock (login calls it while holding the lock). Instead at most one
//!    identity request is in flight; concurrent callers all await a clone of
//!    the same [`Shared`] future and observe the same outcome.
//!
//! Every flight is stamped with the **credential epoch** it started in.
//! `login`, `logout`, and identity-changing account operations advance the
//! epoch and drop the current flight, so:
//!
//! - a resolution requested after a credential change never joins a flight
//!   that was started with the old credential
//! - a flight that finishes after a credential change does not publish its
//!   (stale) result; its callers go on to await the current flight instead
//!
//! A new credential is written under the same lock that advances the epoch,
//! so a flight from before the change can never clear it.
//!
//! ```text
//!   resolve() ──→ flight in slot? ──yes──→ await shared outcome
//!                      │ no
//!                      ▼
//!          token mode and no token? ──yes──→ Unauthenticated (no request)
//!                      │ no
//!                      ▼
//!          start flight(epoch, id) ──→ GET /user ──→ epoch still current?
//!                                                      │ yes     │ no
//!                                                      ▼         ▼
//!                                                   publish   discard, retry
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use portcullis_protocol::{ActiveSession, Identity};
use tokio::sync::watch;

use crate::{
    AccountGateway, Credential, CredentialMode, CredentialStore, LogoutAck,
    Navigator, Resolution, SessionConfig, SessionError, SessionGateway,
    SessionSnapshot, SessionStatus,
};

/// Soft error shown after a logout the server did not acknowledge.
pub const UNCONFIRMED_LOGOUT: &str =
    "Signed out locally, but the server did not confirm the logout";

/// `None` when the flight was overtaken by a credential change.
type Outcome = Shared<BoxFuture<'static, Option<SessionStatus>>>;

/// The in-flight resolution, if any.
struct Flight {
    id: u64,
    outcome: Outcome,
}

struct Flights {
    /// Advanced on every local credential change.
    epoch: u64,
    next_id: u64,
    current: Option<Flight>,
}

struct Inner<G> {
    gateway: G,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    state: watch::Sender<SessionSnapshot>,
    flights: Mutex<Flights>,
    op_lock: tokio::sync::Mutex<()>,
    initialized: AtomicBool,
}

/// The session state machine.
///
/// A cheap handle: clones share the same state. Construct one per process
/// and pass clones to the navigation guard and anything else that needs
/// the session.
///
/// ## Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use portcullis_session::{
///     CookieCredentials, HttpGateway, NoopNavigator, SessionConfig,
///     SessionMachine,
/// };
/// use portcullis_transport::ReqwestTransport;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(CookieCredentials);
/// let transport = ReqwestTransport::builder("http://localhost:8080")
///     .cookie_store(true)
///     .build()?;
/// let gateway = HttpGateway::new(transport, store.clone());
/// let machine = SessionMachine::new(
///     gateway,
///     store,
///     Arc::new(NoopNavigator),
///     SessionConfig::default(),
/// );
///
/// machine.login("ann@example.com", "hunter2").await?;
/// assert!(machine.is_authenticated());
/// # Ok(())
/// # }
/// ```
pub struct SessionMachine<G: SessionGateway> {
    inner: Arc<Inner<G>>,
}

impl<G: SessionGateway> Clone for SessionMachine<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: SessionGateway> SessionMachine<G> {
    /// Creates a machine in the `Unknown` state.
    ///
    /// `store` must be the same store the gateway consults when attaching
    /// credentials.
    pub fn new(
        gateway: G,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                navigator,
                config,
                state: watch::Sender::new(SessionSnapshot::default()),
                flights: Mutex::new(Flights {
                    epoch: 0,
                    next_id: 0,
                    current: None,
                }),
                op_lock: tokio::sync::Mutex::new(()),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn credential_mode(&self) -> CredentialMode {
        self.inner.store.mode()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state.borrow().busy
    }

    pub fn has_error(&self) -> bool {
        self.inner.state.borrow().has_error()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.state.borrow().error_message.clone()
    }

    /// A change feed of snapshots. The receiver starts out having seen the
    /// current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Dismisses the current error message.
    pub fn clear_error(&self) {
        self.inner
            .state
            .send_if_modified(|snapshot| snapshot.error_message.take().is_some());
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// The bootstrap hook: resolves the session once at process start.
    ///
    /// Only the first call resolves; later calls return the current status.
    /// In token mode without a stored token this settles on
    /// `Unauthenticated` without a request.
    pub async fn init(&self) -> SessionStatus {
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            return self.status();
        }
        tracing::debug!(mode = %self.inner.store.mode(), "initial session resolution");
        self.resolve().await
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Asks the server who is signed in and publishes the answer.
    ///
    /// Single-flight: while a resolution is in flight, every caller awaits
    /// that one. Never fails: anything other than a confirmed identity
    /// yields `Unauthenticated`.
    ///
    /// In token mode with no stored token this returns `Unauthenticated`
    /// immediately, without a request and without suspending.
    ///
    /// Never returns `Unknown`: when a credential change overtakes the
    /// flight being awaited, the caller moves on to the current one.
    pub async fn resolve(&self) -> SessionStatus {
        loop {
            match self.inner.begin_resolution() {
                Ok(outcome) => {
                    if let Some(status) = outcome.await {
                        return status;
                    }
                }
                Err(settled) => return settled,
            }
        }
    }

    // -----------------------------------------------------------------------
    // Session operations
    // -----------------------------------------------------------------------

    /// Signs in, then resolves the identity and navigates to the
    /// authenticated landing location.
    ///
    /// Returns the status published by the post-login resolution. The
    /// navigation happens even if that resolution could not confirm the
    /// session; the guard on the landing route then decides.
    ///
    /// # Errors
    /// - [`SessionError::AuthRejected`] with the server's message
    /// - [`SessionError::MissingToken`] in token mode when no token was
    ///   issued
    /// - [`SessionError::Transport`] or [`SessionError::Storage`]
    ///
    /// On error the status is unchanged and `error_message` holds
    /// [`SessionError::user_message`].
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<SessionStatus, SessionError> {
        let _op = self.inner.op_lock.lock().await;
        let _busy = self.inner.begin_operation();

        if let Err(e) = self.sign_in(identifier, secret).await {
            tracing::info!(email = identifier, error = %e, "login failed");
            self.inner.set_error(e.user_message());
            return Err(e);
        }

        let status = self.resolve().await;
        match status.identity() {
            Some(identity) => {
                tracing::info!(email = %identity.email, "logged in");
            }
            None => {
                tracing::warn!(
                    email = identifier,
                    "login accepted but the session could not be confirmed"
                );
            }
        }

        self.inner
            .navigator
            .navigate(&self.inner.config.authenticated_landing);
        Ok(status)
    }

    /// Authenticates and persists the credential.
    async fn sign_in(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<(), SessionError> {
        let grant = self.inner.gateway.authenticate(identifier, secret).await?;

        let credential = match self.inner.store.mode() {
            CredentialMode::Token => Some(Credential::Bearer(
                grant.token.ok_or(SessionError::MissingToken)?,
            )),
            CredentialMode::Cookie => None,
        };
        self.inner.replace_credential(credential)
    }

    /// Creates an account. Does not sign in.
    ///
    /// # Errors
    /// [`SessionError::AuthRejected`] with the server's message (e.g. a
    /// duplicate email), or a transport failure. Either way the message is
    /// also put in `error_message`.
    pub async fn register(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<String, SessionError> {
        let _op = self.inner.op_lock.lock().await;
        let _busy = self.inner.begin_operation();

        match self.inner.gateway.register(identifier, secret).await {
            Ok(message) => {
                tracing::info!(email = identifier, "account registered");
                Ok(message)
            }
            Err(e) => {
                tracing::info!(email = identifier, error = %e, "registration failed");
                self.inner.set_error(e.user_message());
                Err(e)
            }
        }
    }

    /// Signs out. Never fails.
    ///
    /// The server is asked to end the session, but local teardown happens
    /// regardless of its answer: the credential is cleared, the status
    /// becomes `Unauthenticated`, and the navigator is sent to the login
    /// location. An unacknowledged logout leaves
    /// [`UNCONFIRMED_LOGOUT`] in `error_message`.
    pub async fn logout(&self) {
        let _op = self.inner.op_lock.lock().await;
        let _busy = self.inner.begin_operation();

        match self.inner.gateway.deauthenticate().await {
            LogoutAck::Confirmed(_) => tracing::info!("logged out"),
            LogoutAck::Unconfirmed(reason) => {
                tracing::warn!(%reason, "logout not confirmed, signing out locally");
                self.inner.set_error(UNCONFIRMED_LOGOUT.to_string());
            }
        }

        self.inner.sign_out_locally();
        self.inner.navigator.navigate(&self.inner.config.login_location);
    }

    /// Renews the credential. Used by the keep-alive task.
    ///
    /// Does not touch the busy flag or the error slot, and never navigates.
    ///
    /// # Errors
    /// - [`SessionError::NotAuthenticated`] when there is no session to renew
    /// - [`SessionError::Expired`] when the server refused; the session is
    ///   then signed out locally
    /// - [`SessionError::Transport`]; the state is left as it was
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let _op = self.inner.op_lock.lock().await;
        self.require_session()?;

        match self.inner.gateway.refresh().await {
            Ok(grant) => {
                if let (CredentialMode::Token, Some(token)) =
                    (self.inner.store.mode(), grant.token)
                {
                    self.inner
                        .replace_credential(Some(Credential::Bearer(token)))?;
                }
                tracing::debug!("session refreshed");
                Ok(())
            }
            Err(e) => Err(self.settle_failure(e, "refresh")),
        }
    }

    fn require_session(&self) -> Result<(), SessionError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(SessionError::NotAuthenticated)
        }
    }

    /// Logs a failed session-bound operation. An expired session is signed
    /// out locally.
    fn settle_failure(&self, error: SessionError, operation: &str) -> SessionError {
        match &error {
            SessionError::Expired(reason) => {
                tracing::info!(operation, %reason, "session expired");
                self.inner.sign_out_locally();
            }
            other => tracing::warn!(operation, error = %other, "session operation failed"),
        }
        error
    }
}

// ---------------------------------------------------------------------------
// Account operations
// ---------------------------------------------------------------------------

/// Operations that need both a live session and an [`AccountGateway`].
///
/// All of them are serialized with login and logout, fail with
/// [`SessionError::NotAuthenticated`] when nobody is signed in, and sign the
/// session out locally when the server answers 401. They leave the busy flag
/// and error slot alone; callers show their own feedback.
impl<G: SessionGateway + AccountGateway> SessionMachine<G> {
    /// Changes the username and re-resolves the identity.
    pub async fn update_username(
        &self,
        new_username: &str,
    ) -> Result<String, SessionError> {
        self.identity_changing("update_username", |gateway| {
            gateway.update_username(new_username)
        })
        .await
    }

    /// Requests an email change and re-resolves the identity.
    pub async fn update_email(
        &self,
        new_email: &str,
    ) -> Result<String, SessionError> {
        self.identity_changing("update_email", |gateway| {
            gateway.update_email(new_email)
        })
        .await
    }

    pub async fn update_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<String, SessionError> {
        let _op = self.inner.op_lock.lock().await;
        self.require_session()?;
        self.inner
            .gateway
            .update_password(old_password, new_password)
            .await
            .map_err(|e| self.settle_failure(e, "update_password"))
    }

    /// Lists the user's sessions across devices.
    pub async fn active_sessions(&self) -> Result<Vec<ActiveSession>, SessionError> {
        let _op = self.inner.op_lock.lock().await;
        self.require_session()?;
        self.inner
            .gateway
            .active_sessions()
            .await
            .map_err(|e| self.settle_failure(e, "active_sessions"))
    }

    /// Ends one of the user's other sessions.
    pub async fn revoke_session(
        &self,
        session_id: &str,
    ) -> Result<String, SessionError> {
        let _op = self.inner.op_lock.lock().await;
        self.require_session()?;
        let message = self
            .inner
            .gateway
            .revoke_session(session_id)
            .await
            .map_err(|e| self.settle_failure(e, "revoke_session"))?;
        tracing::info!(session_id, "session revoked");
        Ok(message)
    }

    async fn identity_changing<'a, F, Fut>(
        &'a self,
        operation: &str,
        call: F,
    ) -> Result<String, SessionError>
    where
        F: FnOnce(&'a G) -> Fut,
        Fut: Future<Output = Result<String, SessionError>>,
    {
        let _op = self.inner.op_lock.lock().await;
        self.require_session()?;

        let message = call(&self.inner.gateway)
            .await
            .map_err(|e| self.settle_failure(e, operation))?;

        self.inner.advance_epoch();
        self.resolve().await;
        Ok(message)
    }
}

// ---------------------------------------------------------------------------
// Inner
// ---------------------------------------------------------------------------

/// Clears the busy flag when an operation ends, however it ends.
struct BusyGuard<'a> {
    state: &'a watch::Sender<SessionSnapshot>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|snapshot| snapshot.busy = false);
    }
}

impl<G: SessionGateway> Inner<G> {
    fn lock_flights(&self) -> MutexGuard<'_, Flights> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_operation(&self) -> BusyGuard<'_> {
        self.state.send_modify(|snapshot| {
            snapshot.busy = true;
            snapshot.error_message = None;
        });
        BusyGuard { state: &self.state }
    }

    fn set_error(&self, message: String) {
        self.state
            .send_modify(|snapshot| snapshot.error_message = Some(message));
    }

    /// Publishes a status. Observers are only woken when it changed.
    fn publish(&self, status: SessionStatus) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.status == status {
                return false;
            }
            tracing::debug!(from = %snapshot.status, to = %status, "session status changed");
            snapshot.status = status;
            true
        });
    }

    /// Invalidates every resolution started before now.
    fn advance_epoch(&self) {
        let mut flights = self.lock_flights();
        Self::invalidate(&mut flights);
    }

    fn invalidate(flights: &mut Flights) {
        flights.epoch += 1;
        flights.current = None;
    }

    /// Advances the epoch and stores `credential` in one critical section.
    ///
    /// A flight finishing concurrently either clears the old credential
    /// before this runs or sees the new epoch and leaves the store alone.
    fn replace_credential(&self, credential: Option<Credential>) -> Result<(), SessionError> {
        let mut flights = self.lock_flights();
        Self::invalidate(&mut flights);
        match credential {
            Some(credential) => self.store.write(credential),
            None => Ok(()),
        }
    }

    /// Clears the local credential and forces `Unauthenticated`.
    fn sign_out_locally(&self) {
        let mut flights = self.lock_flights();
        Self::invalidate(&mut flights);
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear stored credential");
        }
        self.publish(SessionStatus::Unauthenticated);
    }

    /// Joins the current flight or starts one. `Err` carries a status that
    /// was settled without a request.
    fn begin_resolution(self: &Arc<Self>) -> Result<Outcome, SessionStatus> {
        let mut flights = self.lock_flights();

        if let Some(flight) = &flights.current {
            return Ok(flight.outcome.clone());
        }

        if self.store.mode() == CredentialMode::Token && self.store.read().is_none() {
            tracing::debug!("no stored token, skipping identity request");
            self.publish(SessionStatus::Unauthenticated);
            return Err(SessionStatus::Unauthenticated);
        }

        let epoch = flights.epoch;
        let id = flights.next_id;
        flights.next_id += 1;

        let outcome = Arc::clone(self).run_resolution(epoch, id).boxed().shared();
        flights.current = Some(Flight {
            id,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    async fn run_resolution(self: Arc<Self>, epoch: u64, id: u64) -> Option<SessionStatus> {
        let resolution = self.gateway.resolve_identity().await;

        let mut flights = self.lock_flights();
        if flights.current.as_ref().is_some_and(|flight| flight.id == id) {
            flights.current = None;
        }

        if flights.epoch != epoch {
            tracing::debug!(epoch, current = flights.epoch, "discarding stale resolution");
            return None;
        }

        if resolution == Resolution::Rejected
            && self.store.mode() == CredentialMode::Token
        {
            tracing::info!("stored token rejected, clearing it");
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "failed to clear stored credential");
            }
        }

        let status = SessionStatus::from_identity(resolution.into_identity());
        self.publish(status.clone());
        Some(status)
    }
}
