//! The navigation side effect.
//!
//! Login and logout end by moving the user somewhere. The state machine
//! doesn't know what "moving" means in the host application; it calls a
//! [`Navigator`] and carries on. A navigator must not block or call back
//! into the machine synchronously.

use tokio::sync::mpsc;

/// Requests a move to another location.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, location: &str);
}

/// Ignores every request. For headless use and tests that don't care.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, location: &str) {
        tracing::trace!(location, "navigation ignored");
    }
}

/// Forwards requests into a channel, to be consumed by a router task.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    /// Creates the navigator and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, location: &str) {
        if self.tx.send(location.to_string()).is_err() {
            tracing::debug!(location, "navigation receiver dropped");
        }
    }
}
