//! Background session keep-alive.

use portcullis_refresh::{RefreshConfig, RefreshScheduler};
use portcullis_session::{SessionError, SessionGateway, SessionMachine};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawns a task that renews the session on the refresh schedule.
///
/// The schedule only runs while the session is authenticated: signing out
/// pauses it and signing in restarts it one full interval out. A refresh
/// the server refuses signs the session out (see
/// [`SessionMachine::refresh`]), which in turn pauses the schedule.
///
/// The task ends when `shutdown` turns `true` or its sender is dropped.
pub fn spawn_keepalive<G: SessionGateway>(
    machine: SessionMachine<G>,
    config: RefreshConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sessions = machine.subscribe();
        let mut scheduler = RefreshScheduler::new(config);
        if scheduler.is_disabled() {
            tracing::debug!("keep-alive disabled");
        }
        if !sessions.borrow_and_update().is_authenticated() {
            scheduler.pause();
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                changed = sessions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if sessions.borrow_and_update().is_authenticated() {
                        scheduler.resume();
                    } else {
                        scheduler.pause();
                    }
                }
                due = scheduler.wait_until_due() => {
                    tracing::debug!(attempt = due.attempt, skipped = due.skipped, "refreshing session");
                    match machine.refresh().await {
                        Ok(()) => scheduler.record_success(),
                        Err(SessionError::NotAuthenticated) => scheduler.pause(),
                        Err(SessionError::Expired(_)) => {
                            scheduler.record_failure();
                            scheduler.pause();
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "session refresh failed");
                            scheduler.record_failure();
                        }
                    }
                }
            }
        }

        tracing::debug!(stats = ?scheduler.stats(), "keep-alive stopped");
    })
}
