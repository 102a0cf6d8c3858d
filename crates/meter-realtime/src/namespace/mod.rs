//! Namespace entity, registry, and deferred cleanup.

pub mod cleanup;
pub mod namespace;
pub mod registry;

pub use namespace::{Namespace, NamespaceInfo, NamespaceSnapshot, NamespaceStats};
pub use registry::NamespaceRegistry;
