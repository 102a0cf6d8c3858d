//! Notifier loop. Pushes batched occupancy changes on a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use meter_core::config::MeterConfig;

use crate::message::types::OutboundMessage;
use crate::metrics::EngineMetrics;
use crate::namespace::registry::{Delivery, NamespaceRegistry};

use super::policy::NotifyPolicy;

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Payloads queued.
    pub delivered: usize,
    /// Payloads the transport could not take.
    pub failed: usize,
}

/// Periodically collects changes from the registry and sends them.
#[derive(Debug)]
pub struct NotificationScheduler {
    registry: Arc<NamespaceRegistry>,
    policy: NotifyPolicy,
    interval: Duration,
    metrics: Arc<EngineMetrics>,
}

impl NotificationScheduler {
    /// Create a scheduler from the meter configuration.
    pub fn new(
        registry: Arc<NamespaceRegistry>,
        config: &MeterConfig,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self::with_policy(
            registry,
            config.notify_policy().into(),
            config.notify_interval(),
            metrics,
        )
    }

    /// Create a scheduler with an explicit policy and interval.
    pub fn with_policy(
        registry: Arc<NamespaceRegistry>,
        policy: NotifyPolicy,
        interval: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            policy,
            interval,
            metrics,
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &NotifyPolicy {
        &self.policy
    }

    /// Run until the cancel signal flips to `true` or its sender is dropped.
    ///
    /// Ticks run inline in this loop, so they never overlap; ticks missed
    /// while one is running are skipped.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            policy = ?self.policy,
            "Notifier started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        info!("Notifier stopped");
    }

    /// Collect and send one round of notifications.
    ///
    /// Only payloads that reach the outbound queue are recorded as
    /// delivered; anything dropped is due again on the next tick.
    pub fn tick(&self) -> TickReport {
        let now = Instant::now();
        let deliveries = self.registry.collect_notifications(&self.policy, now);

        let mut report = TickReport::default();
        for Delivery { session, counts } in deliveries {
            let sent = session.send(OutboundMessage::Counts(counts.clone()));
            self.metrics.record_send(sent);

            if sent {
                self.registry.record_delivered(session.id, &counts, now);
                report.delivered += 1;
            } else {
                report.failed += 1;
                warn!(
                    session_id = %session.id,
                    namespaces = counts.len(),
                    "Failed to queue notification"
                );
            }
        }

        self.metrics.notifier_tick();
        if report.delivered + report.failed > 0 {
            debug!(
                delivered = report.delivered,
                failed = report.failed,
                "Notifier tick"
            );
        }
        report
    }
}
