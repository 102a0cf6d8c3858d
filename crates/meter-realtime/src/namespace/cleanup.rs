//! Deferred, cancellable namespace deletion.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;

/// An armed one-shot deletion timer for a single namespace.
///
/// The ticket identifies this arming. When the timer fires, the registry
/// deletes the namespace only if the namespace still carries the same ticket
/// and is still vacant, both checked under the registry lock. Cancelling a
/// timer that has already started firing is therefore harmless.
#[derive(Debug)]
pub struct PendingCleanup {
    /// Arming identifier, unique per registry.
    pub ticket: u64,
    /// Wall-clock time the deletion is due.
    pub due_at: DateTime<Utc>,
    task: JoinHandle<()>,
}

impl PendingCleanup {
    /// Spawns a timer that runs `on_fire` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(ticket: u64, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let due_at = TimeDelta::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });

        Self {
            ticket,
            due_at,
            task,
        }
    }

    /// Aborts the timer.
    pub fn cancel(self) {
        self.task.abort();
    }
}
