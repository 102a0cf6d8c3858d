//! Individual client session handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::message::types::OutboundMessage;

/// Unique session identifier
pub type SessionId = Uuid;

/// A handle to one connected client.
///
/// Holds the sender for pushing messages to the transport. Membership and
/// subscriptions live in the registry, keyed by [`SessionId`].
#[derive(Debug)]
pub struct ClientSession {
    /// Unique session ID
    pub id: SessionId,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// When the client connected
    pub connected_at: DateTime<Utc>,
    /// Whether the transport is still attached
    alive: AtomicBool,
}

impl ClientSession {
    /// Create a new session handle
    pub fn new(sender: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Queue an outbound message without waiting.
    ///
    /// Returns `false` if the session is closed or its buffer is full.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Check if the session is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the session as closed
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
