//! Engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Sessions ever opened
    pub sessions_total: AtomicU64,
    /// Sessions currently connected
    pub sessions_active: AtomicU64,
    /// Inbound commands received
    pub commands_received: AtomicU64,
    /// Inbound commands rejected
    pub commands_rejected: AtomicU64,
    /// Payloads queued to sessions
    pub messages_sent: AtomicU64,
    /// Payloads that could not be queued
    pub send_failures: AtomicU64,
    /// Namespaces created
    pub namespaces_created: AtomicU64,
    /// Namespaces deleted by the cleanup timer
    pub namespaces_collected: AtomicU64,
    /// Notifier ticks completed
    pub notifier_ticks: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session
    pub fn session_opened(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnected session
    pub fn session_closed(&self) {
        // Saturating: a double close must not wrap the gauge.
        let _ = self
            .sessions_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record an inbound command
    pub fn command_received(&self) {
        self.commands_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected command
    pub fn command_rejected(&self) {
        self.commands_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a send
    pub fn record_send(&self, delivered: bool) {
        if delivered {
            self.messages_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.send_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a namespace creation
    pub fn namespace_created(&self) {
        self.namespaces_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a namespace deletion
    pub fn namespace_collected(&self) {
        self.namespaces_collected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed notifier tick
    pub fn notifier_tick(&self) {
        self.notifier_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            commands_received: self.commands_received.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            namespaces_created: self.namespaces_created.load(Ordering::Relaxed),
            namespaces_collected: self.namespaces_collected.load(Ordering::Relaxed),
            notifier_ticks: self.notifier_ticks.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sessions ever opened
    pub sessions_total: u64,
    /// Sessions currently connected
    pub sessions_active: u64,
    /// Inbound commands received
    pub commands_received: u64,
    /// Inbound commands rejected
    pub commands_rejected: u64,
    /// Payloads queued to sessions
    pub messages_sent: u64,
    /// Payloads that could not be queued
    pub send_failures: u64,
    /// Namespaces created
    pub namespaces_created: u64,
    /// Namespaces deleted by the cleanup timer
    pub namespaces_collected: u64,
    /// Notifier ticks completed
    pub notifier_ticks: u64,
}
