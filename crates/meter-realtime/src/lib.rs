//! # meter-realtime
//!
//! Real-time occupancy engine for the audience meter. Provides:
//!
//! - A namespace registry with lazy creation and deferred cleanup
//! - Client session handles with non-blocking outbound queues
//! - Validation of inbound `join` / `listen` commands
//! - A periodic notifier that batches occupancy changes per listener
//!
//! The registry is the single owner of mutable state. Every mutation and the
//! notifier's collect step run under one lock; sends happen after it is
//! released.

pub mod connection;
pub mod message;
pub mod metrics;
pub mod namespace;
pub mod notification;
pub mod server;

pub use connection::manager::SessionManager;
pub use namespace::registry::NamespaceRegistry;
pub use notification::scheduler::NotificationScheduler;
pub use server::MeterEngine;
