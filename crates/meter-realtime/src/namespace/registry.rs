//! Namespace registry. Owns every namespace along with each session's
//! membership and subscriptions.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use meter_core::config::MeterConfig;
use meter_core::error::AppError;

use crate::connection::handle::{ClientSession, SessionId};
use crate::message::validator::{CommandLimits, validate_listen_names, validate_namespace_name};
use crate::metrics::EngineMetrics;
use crate::notification::policy::NotifyPolicy;

use super::cleanup::PendingCleanup;
use super::namespace::{Namespace, NamespaceInfo, NamespaceSnapshot, NamespaceStats};

/// One batched payload for one listener, produced by a notifier tick.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Recipient.
    pub session: Arc<ClientSession>,
    /// Changed namespaces and their member counts.
    pub counts: BTreeMap<String, u64>,
}

/// Registry of all live namespaces.
///
/// All state sits behind one mutex. Membership changes, subscription
/// changes, cleanup timers, and the notifier's collect step are serialized
/// against each other; no I/O happens while the lock is held.
#[derive(Debug)]
pub struct NamespaceRegistry {
    inner: Arc<Mutex<RegistryState>>,
    limits: CommandLimits,
    cleanup_delay: Duration,
    metrics: Arc<EngineMetrics>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Namespace name → namespace.
    namespaces: HashMap<String, Namespace>,
    /// Session ID → membership and subscription state.
    sessions: HashMap<SessionId, SessionState>,
    /// Next cleanup ticket.
    next_ticket: u64,
}

#[derive(Debug)]
struct SessionState {
    handle: Arc<ClientSession>,
    joined: Option<String>,
    subscriptions: BTreeSet<String>,
    /// Last value this session received per subscribed namespace.
    delivered: HashMap<String, Delivered>,
}

/// A value a session is known to hold.
#[derive(Debug, Clone, Copy)]
struct Delivered {
    members: u64,
    /// When the notifier pushed it; `None` for a `listen` reply.
    at: Option<Instant>,
}

impl RegistryState {
    fn session_entry(&mut self, session: &Arc<ClientSession>) -> &mut SessionState {
        self.sessions
            .entry(session.id)
            .or_insert_with(|| SessionState {
                handle: session.clone(),
                joined: None,
                subscriptions: BTreeSet::new(),
                delivered: HashMap::new(),
            })
    }

    /// Deletes `name` if `ticket` is still its armed cleanup and it is
    /// still vacant.
    fn collect_if_current(&mut self, name: &str, ticket: u64) -> bool {
        let current = self.namespaces.get(name).is_some_and(|ns| {
            ns.is_vacant()
                && ns
                    .pending_cleanup
                    .as_ref()
                    .is_some_and(|pending| pending.ticket == ticket)
        });
        if current {
            self.namespaces.remove(name);
        }
        current
    }
}

impl NamespaceRegistry {
    /// Creates a registry from the meter configuration.
    pub fn new(config: &MeterConfig, metrics: Arc<EngineMetrics>) -> Self {
        Self::with_limits(CommandLimits::from(config), config.cleanup_delay(), metrics)
    }

    /// Creates a registry with explicit limits and cleanup delay.
    pub fn with_limits(
        limits: CommandLimits,
        cleanup_delay: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryState::default())),
            limits,
            cleanup_delay,
            metrics,
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the namespace, creating it if needed.
    ///
    /// A namespace created here has nobody in it, so its cleanup timer is
    /// armed straight away. An already armed timer is left running.
    pub fn get_or_create(&self, name: &str) -> Result<NamespaceSnapshot, AppError> {
        validate_namespace_name(name, self.limits.max_namespace_len)?;

        let mut state = self.state();
        let unarmed = self
            .get_or_create_locked(&mut state, name)
            .pending_cleanup
            .is_none();
        if unarmed {
            self.evaluate_cleanup(&mut state, name);
        }

        Ok(state
            .namespaces
            .get(name)
            .map(Namespace::snapshot)
            .unwrap_or_else(|| Namespace::new(name.to_string()).snapshot()))
    }

    /// Returns the namespace if it exists. Never creates.
    pub fn lookup(&self, name: &str) -> Option<NamespaceSnapshot> {
        self.state().namespaces.get(name).map(Namespace::snapshot)
    }

    /// Makes `session` a member of `name`, leaving its previous namespace.
    pub fn join(&self, session: &Arc<ClientSession>, name: &str) -> Result<(), AppError> {
        validate_namespace_name(name, self.limits.max_namespace_len)?;

        let mut state = self.state();
        let current = state.session_entry(session).joined.clone();
        match current.as_deref() {
            Some(joined) if joined == name => return Ok(()),
            Some(_) => self.leave_locked(&mut state, session.id),
            None => {}
        }

        let ns = self.get_or_create_locked(&mut state, name);
        ns.cancel_cleanup();
        ns.add_member();
        let (members, connections) = (ns.members, ns.connections);

        state.session_entry(session).joined = Some(name.to_string());

        debug!(
            session_id = %session.id,
            namespace = %name,
            members,
            connections,
            "Session joined namespace"
        );
        Ok(())
    }

    /// Drops the session's membership, if any.
    pub fn leave(&self, id: SessionId) {
        let mut state = self.state();
        self.leave_locked(&mut state, id);
    }

    /// Replaces the session's subscriptions with `names`.
    ///
    /// Returns the current member count of every subscribed namespace, for
    /// immediate delivery. Nothing changes if validation fails.
    pub fn listen(
        &self,
        session: &Arc<ClientSession>,
        names: &[String],
    ) -> Result<BTreeMap<String, u64>, AppError> {
        validate_listen_names(names, &self.limits)?;
        let wanted: BTreeSet<String> = names.iter().cloned().collect();

        let mut state = self.state();
        let previous = std::mem::take(&mut state.session_entry(session).subscriptions);

        for name in previous.difference(&wanted) {
            if let Some(ns) = state.namespaces.get_mut(name) {
                ns.listeners.remove(&session.id);
            }
            self.evaluate_cleanup(&mut state, name);
        }

        let mut snapshot = BTreeMap::new();
        for name in &wanted {
            let ns = self.get_or_create_locked(&mut state, name);
            ns.listeners.insert(session.id);
            ns.cancel_cleanup();
            snapshot.insert(name.clone(), ns.members);
        }

        let entry = state.session_entry(session);
        entry.delivered = snapshot
            .iter()
            .map(|(name, members)| {
                let delivered = Delivered {
                    members: *members,
                    at: None,
                };
                (name.clone(), delivered)
            })
            .collect();
        entry.subscriptions = wanted;

        debug!(
            session_id = %session.id,
            count = snapshot.len(),
            "Session subscriptions replaced"
        );
        Ok(snapshot)
    }

    /// Forgets every value the session is known to hold, so the next tick
    /// pushes all of its subscriptions again.
    pub fn reset_delivered(&self, id: SessionId) {
        if let Some(session) = self.state().sessions.get_mut(&id) {
            session.delivered.clear();
        }
    }

    /// Removes the session from every listener set.
    pub fn unlisten(&self, id: SessionId) {
        let mut state = self.state();
        self.unlisten_locked(&mut state, id);
    }

    /// Full cleanup for a disconnected session. Safe to call repeatedly.
    pub fn remove(&self, id: SessionId) {
        let mut state = self.state();
        self.leave_locked(&mut state, id);
        self.unlisten_locked(&mut state, id);
        state.sessions.remove(&id);
    }

    /// `(members, connections)` for `name`, or `(0, 0)` if absent.
    pub fn info(&self, name: &str) -> NamespaceInfo {
        self.state()
            .namespaces
            .get(name)
            .map(|ns| NamespaceInfo {
                members: ns.members,
                connections: ns.connections,
            })
            .unwrap_or_default()
    }

    /// Point-in-time counters of every live namespace.
    pub fn snapshot_all(&self) -> BTreeMap<String, NamespaceStats> {
        self.state()
            .namespaces
            .iter()
            .map(|(name, ns)| (name.clone(), ns.stats()))
            .collect()
    }

    /// The namespace the session is joined to.
    pub fn joined_namespace(&self, id: SessionId) -> Option<String> {
        self.state()
            .sessions
            .get(&id)
            .and_then(|s| s.joined.clone())
    }

    /// The namespaces the session listens to, in name order.
    pub fn subscriptions(&self, id: SessionId) -> Vec<String> {
        self.state()
            .sessions
            .get(&id)
            .map(|s| s.subscriptions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live namespaces.
    pub fn namespace_count(&self) -> usize {
        self.state().namespaces.len()
    }

    /// Collects one batched payload per listener for this tick.
    ///
    /// Each listener is judged against the last value it holds, so
    /// `policy` timing runs per listener. Nothing is recorded here; call
    /// [`record_delivered`](Self::record_delivered) once a payload is
    /// actually queued. Closed sessions are skipped.
    pub fn collect_notifications(&self, policy: &NotifyPolicy, now: Instant) -> Vec<Delivery> {
        let state = self.state();

        let mut pending: BTreeMap<SessionId, BTreeMap<String, u64>> = BTreeMap::new();
        for ns in state.namespaces.values() {
            for id in &ns.listeners {
                let Some(session) = state.sessions.get(id) else {
                    continue;
                };
                if !session.handle.is_alive() {
                    continue;
                }
                let last = session.delivered.get(&ns.name);
                if policy.should_notify(
                    ns.members,
                    last.map(|d| d.members),
                    last.and_then(|d| d.at),
                    now,
                ) {
                    pending
                        .entry(*id)
                        .or_default()
                        .insert(ns.name.clone(), ns.members);
                }
            }
        }

        pending
            .into_iter()
            .filter_map(|(id, counts)| {
                let session = state.sessions.get(&id)?;
                Some(Delivery {
                    session: session.handle.clone(),
                    counts,
                })
            })
            .collect()
    }

    /// Records that `counts` reached the session's outbound queue at `at`.
    ///
    /// Namespaces the session no longer listens to are ignored.
    pub fn record_delivered(&self, id: SessionId, counts: &BTreeMap<String, u64>, at: Instant) {
        let mut state = self.state();
        let RegistryState {
            namespaces,
            sessions,
            ..
        } = &mut *state;
        let Some(session) = sessions.get_mut(&id) else {
            return;
        };

        for (name, members) in counts {
            if !session.subscriptions.contains(name) {
                continue;
            }
            let delivered = Delivered {
                members: *members,
                at: Some(at),
            };
            session.delivered.insert(name.clone(), delivered);
            if let Some(ns) = namespaces.get_mut(name) {
                ns.last_notified_members = Some(*members);
                ns.last_notified_at = Some(at);
            }
        }
    }

    fn get_or_create_locked<'a>(
        &self,
        state: &'a mut RegistryState,
        name: &str,
    ) -> &'a mut Namespace {
        state
            .namespaces
            .entry(name.to_string())
            .or_insert_with(|| {
                self.metrics.namespace_created();
                debug!(namespace = %name, "Namespace created");
                Namespace::new(name.to_string())
            })
    }

    fn leave_locked(&self, state: &mut RegistryState, id: SessionId) {
        let Some(name) = state.sessions.get_mut(&id).and_then(|s| s.joined.take()) else {
            return;
        };
        if let Some(ns) = state.namespaces.get_mut(&name) {
            ns.remove_member();
        }
        self.evaluate_cleanup(state, &name);
        debug!(session_id = %id, namespace = %name, "Session left namespace");
    }

    fn unlisten_locked(&self, state: &mut RegistryState, id: SessionId) {
        let Some(session) = state.sessions.get_mut(&id) else {
            return;
        };
        let subscriptions = std::mem::take(&mut session.subscriptions);
        session.delivered.clear();

        for name in &subscriptions {
            if let Some(ns) = state.namespaces.get_mut(name) {
                ns.listeners.remove(&id);
            }
            self.evaluate_cleanup(state, name);
        }
    }

    /// Arms the cleanup timer if `name` is vacant, replacing any armed one.
    fn evaluate_cleanup(&self, state: &mut RegistryState, name: &str) {
        let ticket = state.next_ticket;
        let Some(ns) = state.namespaces.get_mut(name) else {
            return;
        };
        if !ns.is_vacant() {
            return;
        }
        state.next_ticket += 1;
        ns.cancel_cleanup();

        let weak = Arc::downgrade(&self.inner);
        let metrics = self.metrics.clone();
        let key = name.to_string();
        ns.pending_cleanup = Some(PendingCleanup::arm(
            ticket,
            self.cleanup_delay,
            move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let mut state = inner.lock().unwrap_or_else(|e| e.into_inner());
                if state.collect_if_current(&key, ticket) {
                    metrics.namespace_collected();
                    info!(namespace = %key, "Namespace collected");
                }
            },
        ));

        debug!(
            namespace = %name,
            delay_ms = self.cleanup_delay.as_millis() as u64,
            "Namespace cleanup scheduled"
        );
    }
}
