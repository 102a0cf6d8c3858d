//! Inbound and outbound message type definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A validated client command.
///
/// Both fields are independent: a command may join, listen, or both. A field
/// left out of the command leaves that part of the session untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Namespace to join.
    pub join: Option<String>,
    /// Full replacement subscription list.
    pub listen: Option<Vec<String>>,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Rejected command: `{"err": "..."}`.
    Error {
        /// Error description.
        err: String,
    },
    /// Occupancy counts: `{"<namespace>": <members>, ...}`.
    Counts(BTreeMap<String, u64>),
}

impl OutboundMessage {
    /// Build an error payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            err: message.into(),
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_serialize_as_flat_object() {
        let msg = OutboundMessage::Counts(BTreeMap::from([
            ("lobby".to_string(), 3),
            ("stage".to_string(), 0),
        ]));
        assert_eq!(msg.to_json().unwrap(), r#"{"lobby":3,"stage":0}"#);
    }

    #[test]
    fn test_error_serializes_with_err_key() {
        let msg = OutboundMessage::error("Invalid JSON command");
        assert_eq!(msg.to_json().unwrap(), r#"{"err":"Invalid JSON command"}"#);
    }

    #[test]
    fn test_namespace_called_err_is_still_counts() {
        let msg: OutboundMessage = serde_json::from_str(r#"{"err": 4}"#).unwrap();
        assert_eq!(
            msg,
            OutboundMessage::Counts(BTreeMap::from([("err".to_string(), 4)]))
        );
    }
}
