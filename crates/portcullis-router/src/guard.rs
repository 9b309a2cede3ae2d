//! The navigation guard: authorizes or redirects a transition.
//!
//! The guard is the single enforcement point for route access. It runs on
//! every transition, including the very first one after a restart, and
//! never decides against the `Unknown` status: it waits for a completed
//! resolution first.
//!
//! Decision table, first match wins:
//!
//! | # | Condition | Decision |
//! |---|---|---|
//! | 1 | route requires auth, not authenticated | redirect to login |
//! | 2 | route is guest only, authenticated | redirect to landing |
//! | 3 | otherwise | admit |

use std::sync::Arc;

use portcullis_session::{SessionGateway, SessionMachine, SessionStatus};

use crate::{GuardPolicy, RouteAccess, RouteTable, RouterConfig};

/// The guard's verdict on one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Redirect(String),
}

/// Applies the decision table. Pure: no I/O, no state.
pub fn decide(
    access: RouteAccess,
    authenticated: bool,
    config: &RouterConfig,
) -> Decision {
    if access.requires_auth && !authenticated {
        Decision::Redirect(config.login_route.clone())
    } else if access.guest_only && authenticated {
        Decision::Redirect(config.landing_route.clone())
    } else {
        Decision::Admit
    }
}

/// Guards transitions against a [`SessionMachine`].
pub struct NavigationGuard<G: SessionGateway> {
    machine: SessionMachine<G>,
    routes: Arc<RouteTable>,
    config: RouterConfig,
}

impl<G: SessionGateway> Clone for NavigationGuard<G> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            routes: Arc::clone(&self.routes),
            config: self.config.clone(),
        }
    }
}

impl<G: SessionGateway> NavigationGuard<G> {
    pub fn new(
        machine: SessionMachine<G>,
        routes: Arc<RouteTable>,
        config: RouterConfig,
    ) -> Self {
        Self {
            machine,
            routes,
            config,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn machine(&self) -> &SessionMachine<G> {
        &self.machine
    }

    /// Decides whether the transition to `to` may proceed.
    ///
    /// Awaits a completed resolution before deciding (joining one already
    /// in flight, if any).
    pub async fn before_each(&self, to: &str) -> Decision {
        let status = self.settled_status().await;
        let decision = decide(
            self.routes.access(to),
            status.is_authenticated(),
            &self.config,
        );
        tracing::debug!(to, %status, ?decision, "navigation guarded");
        decision
    }

    async fn settled_status(&self) -> SessionStatus {
        match self.config.policy {
            GuardPolicy::AlwaysResolve => self.machine.resolve().await,
            GuardPolicy::ResolveWhenUnknown => {
                let status = self.machine.status();
                if status.is_unknown() {
                    self.machine.resolve().await
                } else {
                    status
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RouterConfig {
        RouterConfig::default()
    }

    #[test]
    fn test_decide_protected_while_signed_out_redirects_to_login() {
        assert_eq!(
            decide(RouteAccess::PROTECTED, false, &config()),
            Decision::Redirect("/login".into())
        );
    }

    #[test]
    fn test_decide_protected_while_signed_in_admits() {
        assert_eq!(
            decide(RouteAccess::PROTECTED, true, &config()),
            Decision::Admit
        );
    }

    #[test]
    fn test_decide_guest_only_while_signed_in_redirects_to_landing() {
        assert_eq!(
            decide(RouteAccess::GUEST_ONLY, true, &config()),
            Decision::Redirect("/dashboard".into())
        );
    }

    #[test]
    fn test_decide_guest_only_while_signed_out_admits() {
        assert_eq!(
            decide(RouteAccess::GUEST_ONLY, false, &config()),
            Decision::Admit
        );
    }

    #[test]
    fn test_decide_public_always_admits() {
        assert_eq!(decide(RouteAccess::PUBLIC, false, &config()), Decision::Admit);
        assert_eq!(decide(RouteAccess::PUBLIC, true, &config()), Decision::Admit);
    }

    #[test]
    fn test_decide_requires_auth_rule_takes_precedence() {
        let both = RouteAccess {
            requires_auth: true,
            guest_only: true,
        };
        assert_eq!(
            decide(both, false, &config()),
            Decision::Redirect("/login".into())
        );
    }
}
