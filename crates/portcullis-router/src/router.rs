//! The router: follows redirects until a route is admitted.

use std::sync::Arc;

use portcullis_session::{SessionGateway, SessionMachine};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{Decision, NavigationGuard, RouteTable, RouterConfig, RouterError};

/// Owns the current location and moves it, one guarded transition at a
/// time.
///
/// A guard redirect is itself a transition, so it is guarded too:
///
/// ```text
///   navigate("/") ──static──→ "/dashboard" ──guard: signed out──→ "/login"
///                                                                   │
///                                                  guard: admit ←───┘
/// ```
///
/// Cheap to clone; clones share the current location.
pub struct Router<G: SessionGateway> {
    guard: NavigationGuard<G>,
    location: Arc<watch::Sender<Option<String>>>,
}

impl<G: SessionGateway> Clone for Router<G> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            location: Arc::clone(&self.location),
        }
    }
}

impl<G: SessionGateway> Router<G> {
    pub fn new(
        machine: SessionMachine<G>,
        routes: RouteTable,
        config: RouterConfig,
    ) -> Self {
        Self {
            guard: NavigationGuard::new(machine, Arc::new(routes), config),
            location: Arc::new(watch::Sender::new(None)),
        }
    }

    pub fn guard(&self) -> &NavigationGuard<G> {
        &self.guard
    }

    /// The admitted location, or `None` before the first navigation.
    pub fn current(&self) -> Option<String> {
        self.location.borrow().clone()
    }

    /// A feed of admitted locations.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.location.subscribe()
    }

    /// Navigates to `to`, returning the location finally admitted.
    ///
    /// # Errors
    /// - [`RouterError::InvalidLocation`] when `to` is not an absolute path
    /// - [`RouterError::RedirectLoop`] when more than `max_redirects`
    ///   redirects were needed; the current location is left unchanged
    pub async fn navigate(&self, to: &str) -> Result<String, RouterError> {
        if !to.starts_with('/') {
            return Err(RouterError::InvalidLocation(to.to_string()));
        }

        let max = self.guard.config().max_redirects;
        let mut target = to.to_string();

        for _ in 0..=max {
            if let Some(next) = self.guard.routes().redirect_of(&target) {
                tracing::trace!(from = %target, to = next, "static redirect");
                target = next.to_string();
                continue;
            }

            match self.guard.before_each(&target).await {
                Decision::Admit => {
                    tracing::info!(requested = to, location = %target, "navigated");
                    self.location.send_replace(Some(target.clone()));
                    return Ok(target);
                }
                Decision::Redirect(next) => {
                    tracing::debug!(from = %target, to = %next, "guard redirect");
                    target = next;
                }
            }
        }

        tracing::warn!(requested = to, hops = max, "redirect loop");
        Err(RouterError::RedirectLoop {
            from: to.to_string(),
            hops: max,
        })
    }

    /// Spawns a task that navigates to every location received on
    /// `requests`, in order. Pair with a `ChannelNavigator` to apply the
    /// session machine's login/logout navigation.
    ///
    /// The task ends when every sender is dropped.
    pub fn drive(&self, mut requests: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            while let Some(location) = requests.recv().await {
                if let Err(e) = router.navigate(&location).await {
                    tracing::warn!(location = %location, error = %e, "navigation failed");
                }
            }
            tracing::debug!("navigation requests closed");
        })
    }
}
