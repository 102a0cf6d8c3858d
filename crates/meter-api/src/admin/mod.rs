//! Operator-facing surfaces outside the public HTTP router.

pub mod stats_listener;

pub use stats_listener::StatsListener;
