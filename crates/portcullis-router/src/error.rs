//! Error types for the routing layer.

/// Errors that can occur while navigating.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The target is not an absolute path.
    #[error("invalid location {0:?}: locations start with '/'")]
    InvalidLocation(String),

    /// Redirects kept bouncing without ever admitting a route.
    /// Usually a route table where a login route itself requires auth.
    #[error("redirect loop navigating to {from} (gave up after {hops} hops)")]
    RedirectLoop { from: String, hops: usize },
}
