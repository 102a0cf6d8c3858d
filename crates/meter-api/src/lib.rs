//! # meter-api
//!
//! HTTP layer for the audience meter built on Axum.
//!
//! Provides the WebSocket upgrade, the JSON/JSONP stats endpoints, health
//! checks, the demo page, and the loopback plaintext stats listener.

pub mod admin;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
