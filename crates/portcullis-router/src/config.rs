//! Route access metadata and router configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RouteAccess
// ---------------------------------------------------------------------------

/// Who may enter a route.
///
/// Static: attached when the route table is built and never changed.
///
/// | `requires_auth` | `guest_only` | Meaning |
/// |---|---|---|
/// | false | false | public, anyone |
/// | true | false | signed-in users only |
/// | false | true | signed-out users only (login, register) |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAccess {
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub guest_only: bool,
}

impl RouteAccess {
    pub const PUBLIC: Self = Self {
        requires_auth: false,
        guest_only: false,
    };

    pub const PROTECTED: Self = Self {
        requires_auth: true,
        guest_only: false,
    };

    pub const GUEST_ONLY: Self = Self {
        requires_auth: false,
        guest_only: true,
    };
}

// ---------------------------------------------------------------------------
// GuardPolicy
// ---------------------------------------------------------------------------

/// When the guard asks the server before deciding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Resolve on every transition. A session that ended elsewhere (another
    /// tab, an admin revocation) is noticed on the next navigation.
    #[default]
    AlwaysResolve,

    /// Resolve only while the status is still `Unknown`; afterwards trust
    /// the machine's state. Saves a request per navigation.
    ResolveWhenUnknown,
}

// ---------------------------------------------------------------------------
// RouterConfig
// ---------------------------------------------------------------------------

/// Where the guard sends people and how hard the router tries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Target of the "requires auth" redirect. Default: `/login`.
    pub login_route: String,

    /// Target of the "guest only" redirect. Default: `/dashboard`.
    pub landing_route: String,

    /// Redirects followed for one navigation before giving up.
    ///
    /// Default: 8.
    pub max_redirects: usize,

    pub policy: GuardPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            login_route: "/login".to_string(),
            landing_route: "/dashboard".to_string(),
            max_redirects: 8,
            policy: GuardPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_access_default_is_public() {
        assert_eq!(RouteAccess::default(), RouteAccess::PUBLIC);
    }

    #[test]
    fn test_router_config_default() {
        let config = RouterConfig::default();
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.landing_route, "/dashboard");
        assert_eq!(config.max_redirects, 8);
        assert_eq!(config.policy, GuardPolicy::AlwaysResolve);
    }
}
