//! Inbound commands, outbound payloads, and command validation.

pub mod types;
pub mod validator;

pub use types::{Command, OutboundMessage};
pub use validator::{CommandLimits, parse_command};
