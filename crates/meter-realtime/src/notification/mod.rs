//! Periodic occupancy notifications.

pub mod policy;
pub mod scheduler;

pub use policy::NotifyPolicy;
pub use scheduler::{NotificationScheduler, TickReport};
