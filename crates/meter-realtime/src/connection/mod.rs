//! Client session handles and lifecycle.

pub mod handle;
pub mod manager;
pub mod pool;

pub use handle::{ClientSession, SessionId};
pub use manager::SessionManager;
pub use pool::SessionPool;
