//! Single namespace with member counters and listener tracking.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::connection::handle::SessionId;

use super::cleanup::PendingCleanup;

/// A live namespace.
///
/// Only the registry touches these; everything outside sees
/// [`NamespaceSnapshot`], [`NamespaceInfo`], or [`NamespaceStats`].
#[derive(Debug)]
pub struct Namespace {
    /// Namespace name.
    pub name: String,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Sessions currently joined.
    pub members: u64,
    /// Total joins since creation. Never decremented.
    pub connections: u64,
    /// Sessions subscribed to occupancy changes.
    pub listeners: HashSet<SessionId>,
    /// Member count last pushed to any listener, if any.
    pub last_notified_members: Option<u64>,
    /// When that push was queued.
    pub last_notified_at: Option<Instant>,
    /// Armed deletion timer.
    pub pending_cleanup: Option<PendingCleanup>,
}

impl Namespace {
    /// Creates a new empty namespace stamped with the current time.
    pub fn new(name: String) -> Self {
        Self {
            name,
            created_at: Utc::now(),
            members: 0,
            connections: 0,
            listeners: HashSet::new(),
            last_notified_members: None,
            last_notified_at: None,
            pending_cleanup: None,
        }
    }

    /// No members and no listeners.
    pub fn is_vacant(&self) -> bool {
        self.members == 0 && self.listeners.is_empty()
    }

    /// Records a new member.
    pub fn add_member(&mut self) {
        self.members += 1;
        self.connections += 1;
    }

    /// Drops a member. Never goes below zero.
    pub fn remove_member(&mut self) {
        self.members = self.members.saturating_sub(1);
    }

    /// Disarms the deletion timer, if one is armed.
    pub fn cancel_cleanup(&mut self) -> bool {
        match self.pending_cleanup.take() {
            Some(pending) => {
                pending.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns a detached copy of the namespace state.
    pub fn snapshot(&self) -> NamespaceSnapshot {
        NamespaceSnapshot {
            name: self.name.clone(),
            created_at: self.created_at,
            members: self.members,
            connections: self.connections,
            listeners: self.listeners.len(),
            last_notified_members: self.last_notified_members,
            cleanup_at: self.pending_cleanup.as_ref().map(|p| p.due_at),
        }
    }

    /// Returns the counters reported by the stats surfaces.
    pub fn stats(&self) -> NamespaceStats {
        NamespaceStats {
            created: self.created_at,
            members: self.members,
            connections: self.connections,
        }
    }
}

/// Detached, read-only view of a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    /// Namespace name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Sessions currently joined.
    pub members: u64,
    /// Total joins since creation.
    pub connections: u64,
    /// Number of listening sessions.
    pub listeners: usize,
    /// Member count last pushed to any listener.
    pub last_notified_members: Option<u64>,
    /// When the namespace will be deleted, if a cleanup is armed.
    pub cleanup_at: Option<DateTime<Utc>>,
}

/// Point-in-time counters for one namespace in a full dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceStats {
    /// Creation time, as unix seconds on the wire.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    /// Sessions currently joined.
    pub members: u64,
    /// Total joins since creation.
    pub connections: u64,
}

/// `(members, connections)` pair for a point query.
///
/// Displays as `members:connections`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// Sessions currently joined.
    pub members: u64,
    /// Total joins since creation.
    pub connections: u64,
}

impl fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.members, self.connections)
    }
}
