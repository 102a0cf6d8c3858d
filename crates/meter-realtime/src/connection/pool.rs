//! Session pool tracking all connected sessions.

use std::sync::Arc;

use dashmap::DashMap;

use super::handle::{ClientSession, SessionId};

/// Thread-safe pool of all connected sessions.
#[derive(Debug, Default)]
pub struct SessionPool {
    /// Session ID → session handle.
    by_id: DashMap<SessionId, Arc<ClientSession>>,
}

impl SessionPool {
    /// Creates a new empty pool.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Adds a session to the pool.
    pub fn add(&self, session: Arc<ClientSession>) {
        self.by_id.insert(session.id, session);
    }

    /// Removes a session from the pool.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<ClientSession>> {
        self.by_id.remove(id).map(|(_, session)| session)
    }

    /// Gets a session by ID.
    pub fn get(&self, id: &SessionId) -> Option<Arc<ClientSession>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    /// Returns the number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns all session handles.
    pub fn all_sessions(&self) -> Vec<Arc<ClientSession>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
