//! Session manager: registration, command routing, and teardown.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use meter_core::config::MeterConfig;
use meter_core::error::AppError;

use crate::message::types::{Command, OutboundMessage};
use crate::message::validator::{CommandLimits, parse_command};
use crate::metrics::EngineMetrics;
use crate::namespace::registry::NamespaceRegistry;

use super::handle::{ClientSession, SessionId};
use super::pool::SessionPool;

/// Manages every connected client session.
#[derive(Debug)]
pub struct SessionManager {
    /// Connected sessions.
    pool: SessionPool,
    /// Namespace registry.
    registry: Arc<NamespaceRegistry>,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Command limits.
    limits: CommandLimits,
    /// Outbound queue capacity per session.
    buffer_size: usize,
    /// Flips to `true` when all sessions are being closed.
    shutdown_tx: watch::Sender<bool>,
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        config: &MeterConfig,
        registry: Arc<NamespaceRegistry>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            pool: SessionPool::new(),
            registry,
            metrics,
            limits: CommandLimits::from(config),
            buffer_size: config.outbound_buffer_size.max(1),
            shutdown_tx,
        }
    }

    /// Registers a new client session.
    ///
    /// Returns the handle and the receiver the transport drains.
    pub fn register(&self) -> (Arc<ClientSession>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let session = Arc::new(ClientSession::new(tx));

        self.pool.add(session.clone());
        self.metrics.session_opened();

        info!(session_id = %session.id, "Client session registered");
        (session, rx)
    }

    /// Tears a session down: leave, unlisten, and forget it.
    ///
    /// Safe to call more than once for the same session.
    pub fn unregister(&self, id: &SessionId) {
        let Some(session) = self.pool.remove(id) else {
            return;
        };
        session.mark_closed();
        self.registry.remove(*id);
        self.metrics.session_closed();

        info!(session_id = %id, "Client session unregistered");
    }

    /// Processes one inbound text message from a client.
    ///
    /// A valid command is applied `join` first, then `listen`; a `listen`
    /// replies with the current counts. An invalid one is answered with an
    /// `{"err": ...}` payload and has no effect.
    pub fn handle_inbound(&self, id: &SessionId, raw: &str) {
        let Some(session) = self.pool.get(id) else {
            warn!(session_id = %id, "Message from unknown session");
            return;
        };

        self.metrics.command_received();

        match self.apply(&session, raw) {
            Ok(Some(counts)) => {
                let sent = session.send(OutboundMessage::Counts(counts));
                self.metrics.record_send(sent);
                if !sent {
                    self.registry.reset_delivered(*id);
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.metrics.command_rejected();
                if e.is_client_error() {
                    debug!(session_id = %id, error = %e, "Command rejected");
                } else {
                    warn!(session_id = %id, error = %e, "Command failed");
                }
                let sent = session.send(OutboundMessage::error(e.message));
                self.metrics.record_send(sent);
            }
        }
    }

    fn apply(
        &self,
        session: &Arc<ClientSession>,
        raw: &str,
    ) -> Result<Option<BTreeMap<String, u64>>, AppError> {
        let Command { join, listen } = parse_command(raw, &self.limits)?;

        if let Some(name) = join {
            self.registry.join(session, &name)?;
        }

        match listen {
            Some(names) => self.registry.listen(session, &names).map(Some),
            None => Ok(None),
        }
    }

    /// A receiver that flips to `true` when [`close_all`](Self::close_all) runs.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Closes and unregisters every session.
    pub fn close_all(&self) {
        let _ = self.shutdown_tx.send(true);

        let sessions = self.pool.all_sessions();
        let count = sessions.len();
        for session in sessions {
            self.unregister(&session.id);
        }

        info!(count, "All client sessions closed");
    }

    /// Gets a session by ID.
    pub fn get(&self, id: &SessionId) -> Option<Arc<ClientSession>> {
        self.pool.get(id)
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.pool.session_count()
    }
}
