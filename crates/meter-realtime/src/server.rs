//! Top-level occupancy engine that ties the subsystems together.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use meter_core::config::MeterConfig;

use crate::connection::manager::SessionManager;
use crate::metrics::EngineMetrics;
use crate::namespace::registry::NamespaceRegistry;
use crate::notification::scheduler::NotificationScheduler;

/// Central engine shared by every transport.
#[derive(Clone)]
pub struct MeterEngine {
    /// Namespace registry.
    pub registry: Arc<NamespaceRegistry>,
    /// Session manager.
    pub sessions: Arc<SessionManager>,
    /// Notifier.
    pub scheduler: Arc<NotificationScheduler>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
}

impl std::fmt::Debug for MeterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterEngine").finish()
    }
}

impl MeterEngine {
    /// Creates a new engine with all subsystems.
    pub fn new(config: &MeterConfig) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let registry = Arc::new(NamespaceRegistry::new(config, metrics.clone()));
        let sessions = Arc::new(SessionManager::new(
            config,
            registry.clone(),
            metrics.clone(),
        ));
        let scheduler = Arc::new(NotificationScheduler::new(
            registry.clone(),
            config,
            metrics.clone(),
        ));

        info!(
            cleanup_delay_ms = config.cleanup_delay_ms,
            max_listen = config.max_listen,
            "Meter engine initialized"
        );

        Self {
            registry,
            sessions,
            scheduler,
            metrics,
        }
    }

    /// Spawns the notifier loop. It stops when `cancel` flips to `true`.
    pub fn start_notifier(&self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        let scheduler = self.scheduler.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    }

    /// Closes every client session.
    pub fn shutdown(&self) {
        info!("Shutting down meter engine");
        self.sessions.close_all();
        info!("Meter engine shut down");
    }
}
