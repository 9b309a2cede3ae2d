//! Session keep-alive scheduling for Portcullis.
//!
//! Access credentials expire on the server after a fixed lifetime. The
//! [`RefreshScheduler`] says WHEN to renew one; it doesn't renew anything
//! itself. The caller awaits [`RefreshScheduler::wait_until_due`], performs
//! the refresh, and reports the outcome back.
//!
//! # Disabled mode
//!
//! When `interval` is `None`, the scheduler is disabled and
//! [`RefreshScheduler::wait_until_due`] pends forever. This is the right
//! behavior for deployments whose server has no refresh endpoint.
//!
//! # Integration
//!
//! The scheduler sits inside a keep-alive task's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         _ = session_feed.changed() => { /* pause or resume */ }
//!         _ = scheduler.wait_until_due() => {
//!             match machine.refresh().await {
//!                 Ok(()) => scheduler.record_success(),
//!                 Err(_) => scheduler.record_failure(),
//!             }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Full configuration for the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Time between refreshes. `None` disables refreshing.
    ///
    /// Default: 50 minutes, comfortably inside a one-hour access token.
    pub interval: Option<Duration>,

    /// Random delay (0..max) added to the *first* refresh so clients
    /// started together don't refresh together.
    ///
    /// Default: 30 seconds.
    pub initial_jitter: Duration,

    /// How soon to try again after a failed refresh. Capped at `interval`.
    ///
    /// Default: 30 seconds.
    pub retry_after: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Some(Duration::from_secs(50 * 60)),
            initial_jitter: Duration::from_secs(30),
            retry_after: Duration::from_secs(30),
        }
    }
}

impl RefreshConfig {
    /// Shortest interval accepted. Anything smaller is clamped.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// A config refreshing every `interval`, other settings default.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Default::default()
        }
    }

    /// A config that never refreshes.
    pub fn disabled() -> Self {
        Self {
            interval: None,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`RefreshScheduler::new`]. Rules:
    /// - `interval` raised to at least [`Self::MIN_INTERVAL`]
    /// - `retry_after` capped to `interval`
    pub fn validated(mut self) -> Self {
        if let Some(interval) = self.interval {
            if interval < Self::MIN_INTERVAL {
                warn!(
                    interval_ms = interval.as_millis() as u64,
                    "refresh interval below minimum, clamping"
                );
                self.interval = Some(Self::MIN_INTERVAL);
            }
        }
        if let Some(interval) = self.interval {
            self.retry_after = self.retry_after.min(interval);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RefreshDue (returned to caller each time a refresh is due)
// ---------------------------------------------------------------------------

/// A due refresh, returned by [`RefreshScheduler::wait_until_due`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshDue {
    /// Monotonically increasing attempt number (starts at 1).
    pub attempt: u64,
    /// How late the wake-up was. Large values mean the process was
    /// suspended (a laptop lid, a stopped container).
    pub late_by: Duration,
    /// Whole intervals that passed unserved while late. They are not
    /// replayed: one refresh renews the credential just as well.
    pub skipped: u64,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Refreshes that came due.
    pub due: u64,
    /// Intervals skipped because the wake-up was late.
    pub skipped: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Failures since the last success.
    pub consecutive_failures: u32,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Decides when the session should be refreshed.
///
/// One per keep-alive task.
pub struct RefreshScheduler {
    config: RefreshConfig,
    /// When the next refresh is due (Tokio instant for `sleep_until`).
    next_due: Option<Instant>,
    paused: bool,
    stats: RefreshStats,
}

impl RefreshScheduler {
    /// Creates a scheduler from config.
    ///
    /// The first refresh is scheduled one interval from now, plus jitter.
    pub fn new(config: RefreshConfig) -> Self {
        let config = config.validated();

        let next_due = config.interval.map(|interval| {
            let jitter = if config.initial_jitter > Duration::ZERO {
                let ms = rand::rng()
                    .random_range(0..config.initial_jitter.as_millis().max(1) as u64);
                Duration::from_millis(ms)
            } else {
                Duration::ZERO
            };
            Instant::now() + interval + jitter
        });

        match config.interval {
            Some(interval) => debug!(
                interval_secs = interval.as_secs(),
                "refresh scheduler created"
            ),
            None => debug!("refresh scheduler created disabled"),
        }

        Self {
            config,
            next_due,
            paused: false,
            stats: RefreshStats::default(),
        }
    }

    /// Creates a scheduler for `interval` with default settings.
    pub fn with_interval(interval: Duration) -> Self {
        Self::new(RefreshConfig::with_interval(interval))
    }

    /// Waits until the next refresh is due.
    ///
    /// Disabled or paused: this future pends forever. It never resolves on
    /// its own, but `tokio::select!` still processes other branches.
    ///
    /// After it returns, the next refresh is provisionally scheduled one
    /// interval from now; report the outcome with
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub async fn wait_until_due(&mut self) -> RefreshDue {
        let (due, interval) = match (self.next_due, self.config.interval) {
            (Some(due), Some(interval)) if !self.paused => (due, interval),
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(due).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(due);
        let skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
        if skipped > 0 {
            warn!(
                skipped,
                late_secs = late_by.as_secs(),
                "refresh overdue, skipping missed intervals"
            );
        }

        self.stats.due += 1;
        self.stats.skipped += skipped;
        self.next_due = Some(now + interval);

        trace!(attempt = self.stats.due, "refresh due");

        RefreshDue {
            attempt: self.stats.due,
            late_by,
            skipped,
        }
    }

    /// Records a successful refresh. The next one stays one interval out.
    pub fn record_success(&mut self) {
        self.stats.succeeded += 1;
        self.stats.consecutive_failures = 0;
    }

    /// Records a failed refresh and moves the next attempt up to
    /// `retry_after` from now.
    pub fn record_failure(&mut self) {
        self.stats.failed += 1;
        self.stats.consecutive_failures += 1;
        if self.config.interval.is_some() {
            self.next_due = Some(Instant::now() + self.config.retry_after);
        }
        debug!(
            consecutive = self.stats.consecutive_failures,
            retry_secs = self.config.retry_after.as_secs(),
            "refresh failed, retrying early"
        );
    }

    /// Pauses the scheduler. `wait_until_due` pends until
    /// [`resume`](Self::resume).
    ///
    /// Safe to call multiple times (idempotent).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!("refresh scheduler paused");
        }
    }

    /// Resumes after a pause.
    ///
    /// Resets the deadline to one full interval from now: a session that
    /// just became authenticated holds a fresh credential.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(interval) = self.config.interval {
                self.next_due = Some(Instant::now() + interval);
            }
            self.stats.consecutive_failures = 0;
            debug!("refresh scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether this scheduler never fires (`interval` is `None`).
    pub fn is_disabled(&self) -> bool {
        self.config.interval.is_none()
    }

    /// When the next refresh is due, if one is scheduled.
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn stats(&self) -> &RefreshStats {
        &self.stats
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_clamps_short_interval() {
        let config = RefreshConfig::with_interval(Duration::from_millis(10)).validated();
        assert_eq!(config.interval, Some(RefreshConfig::MIN_INTERVAL));
    }

    #[test]
    fn test_validated_caps_retry_to_interval() {
        let config = RefreshConfig {
            interval: Some(Duration::from_secs(5)),
            retry_after: Duration::from_secs(60),
            ..Default::default()
        }
        .validated();
        assert_eq!(config.retry_after, Duration::from_secs(5));
    }

    #[test]
    fn test_validated_leaves_disabled_alone() {
        let config = RefreshConfig::disabled().validated();
        assert_eq!(config.interval, None);
        assert_eq!(config.retry_after, Duration::from_secs(30));
    }
}
