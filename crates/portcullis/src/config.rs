//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use portcullis_refresh::RefreshConfig;
use portcullis_router::{GuardPolicy, RouterConfig};
use portcullis_session::{CredentialMode, SessionConfig};

/// Everything needed to build a [`PortcullisClient`](crate::PortcullisClient).
///
/// Start from [`Default`] or [`from_env`](Self::from_env) and override with
/// the `with_*` setters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Auth server base URL. Default: `http://localhost:8080`.
    pub base_url: String,

    /// Cookie or token deployment. Default: cookie.
    pub credential_mode: CredentialMode,

    /// Directory for the durable token slot (token mode only). `None` keeps
    /// the token in memory for the life of the process.
    pub token_dir: Option<PathBuf>,

    /// Per-request timeout. Default: 10 seconds.
    pub timeout: Duration,

    /// Where login lands and signed-in users are sent away from guest-only
    /// routes. Default: `/dashboard`.
    pub landing_route: String,

    /// Where logout lands and signed-out users are sent from protected
    /// routes. Default: `/login`.
    pub login_route: String,

    pub refresh: RefreshConfig,

    pub guard_policy: GuardPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            credential_mode: CredentialMode::Cookie,
            token_dir: None,
            timeout: Duration::from_secs(10),
            landing_route: "/dashboard".to_string(),
            login_route: "/login".to_string(),
            refresh: RefreshConfig::default(),
            guard_policy: GuardPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `PORTCULLIS_*` environment variables.
    ///
    /// | Variable | Meaning | Default |
    /// |---|---|---|
    /// | `PORTCULLIS_BASE_URL` | server base URL | `http://localhost:8080` |
    /// | `PORTCULLIS_CREDENTIAL_MODE` | `cookie` or `token` | `cookie` |
    /// | `PORTCULLIS_TOKEN_DIR` | token directory, required in token mode | none |
    /// | `PORTCULLIS_TIMEOUT_SECS` | request timeout | `10` |
    /// | `PORTCULLIS_REFRESH_SECS` | refresh interval, `0` disables | `3000` |
    ///
    /// # Errors
    /// - [`ConfigError::Invalid`] when a value doesn't parse
    /// - [`ConfigError::Missing`] for `PORTCULLIS_TOKEN_DIR` in token mode
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("PORTCULLIS_BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(mode) = lookup("PORTCULLIS_CREDENTIAL_MODE") {
            config.credential_mode = mode
                .parse()
                .map_err(|_| ConfigError::Invalid("PORTCULLIS_CREDENTIAL_MODE"))?;
        }

        config.token_dir = lookup("PORTCULLIS_TOKEN_DIR").map(PathBuf::from);
        if config.credential_mode == CredentialMode::Token && config.token_dir.is_none() {
            return Err(ConfigError::Missing("PORTCULLIS_TOKEN_DIR"));
        }

        if let Some(secs) = lookup("PORTCULLIS_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ConfigError::Invalid("PORTCULLIS_TIMEOUT_SECS"))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = lookup("PORTCULLIS_REFRESH_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ConfigError::Invalid("PORTCULLIS_REFRESH_SECS"))?;
            config.refresh.interval =
                (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credential_mode(mut self, mode: CredentialMode) -> Self {
        self.credential_mode = mode;
        self
    }

    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_guard_policy(mut self, policy: GuardPolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    /// The state machine's share of the config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            authenticated_landing: self.landing_route.clone(),
            login_location: self.login_route.clone(),
        }
    }

    /// The router's share of the config.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            login_route: self.login_route.clone(),
            landing_route: self.landing_route.clone(),
            policy: self.guard_policy,
            ..RouterConfig::default()
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.credential_mode, CredentialMode::Cookie);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.refresh.interval, Some(Duration::from_secs(3000)));
    }

    #[test]
    fn test_from_lookup_token_mode_with_dir() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PORTCULLIS_CREDENTIAL_MODE", "token"),
            ("PORTCULLIS_TOKEN_DIR", "/tmp/portcullis"),
            ("PORTCULLIS_BASE_URL", "https://auth.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.credential_mode, CredentialMode::Token);
        assert_eq!(config.token_dir, Some(PathBuf::from("/tmp/portcullis")));
        assert_eq!(config.base_url, "https://auth.example.com");
    }

    #[test]
    fn test_from_lookup_token_mode_without_dir_is_missing() {
        let err = ClientConfig::from_lookup(lookup(&[(
            "PORTCULLIS_CREDENTIAL_MODE",
            "token",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PORTCULLIS_TOKEN_DIR")));
    }

    #[test]
    fn test_from_lookup_bad_mode_is_invalid() {
        let err = ClientConfig::from_lookup(lookup(&[(
            "PORTCULLIS_CREDENTIAL_MODE",
            "session",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORTCULLIS_CREDENTIAL_MODE")));
    }

    #[test]
    fn test_from_lookup_bad_timeout_is_invalid() {
        let err = ClientConfig::from_lookup(lookup(&[(
            "PORTCULLIS_TIMEOUT_SECS",
            "ten",
        )]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for environment variable: PORTCULLIS_TIMEOUT_SECS"
        );
    }

    #[test]
    fn test_from_lookup_zero_refresh_disables() {
        let config =
            ClientConfig::from_lookup(lookup(&[("PORTCULLIS_REFRESH_SECS", "0")]))
                .unwrap();
        assert_eq!(config.refresh.interval, None);
    }

    #[test]
    fn test_routes_feed_both_session_and_router() {
        let mut config = ClientConfig::default();
        config.landing_route = "/home".into();
        assert_eq!(config.session_config().authenticated_landing, "/home");
        assert_eq!(config.router_config().landing_route, "/home");
        assert_eq!(config.router_config().login_route, "/login");
    }
}
