//! Command parsing and validation rules.
//!
//! A command is fully validated before the registry sees it, so a rejected
//! command never leaves a partial effect behind.

use serde::Deserialize;
use serde_json::Value;

use meter_core::config::MeterConfig;
use meter_core::error::AppError;

use super::types::Command;

/// Maximum allowed message size in bytes.
const MAX_MESSAGE_SIZE: usize = 65_536;

/// Limits applied to inbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLimits {
    /// Maximum namespace name length, in characters.
    pub max_namespace_len: usize,
    /// Maximum number of namespaces in one `listen`.
    pub max_listen: usize,
}

impl From<&MeterConfig> for CommandLimits {
    fn from(config: &MeterConfig) -> Self {
        Self {
            max_namespace_len: config.max_namespace_len,
            max_listen: config.max_listen,
        }
    }
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self::from(&MeterConfig::default())
    }
}

/// Loosely-typed wire shape. Field types are checked by hand so each kind
/// of mistake gets its own error message.
#[derive(Debug, Deserialize)]
struct RawCommand {
    #[serde(default)]
    join: Value,
    #[serde(default)]
    listen: Value,
}

/// Parses and validates one inbound text message.
pub fn parse_command(raw: &str, limits: &CommandLimits) -> Result<Command, AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::malformed(format!(
            "Message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"
        )));
    }

    let command: RawCommand =
        serde_json::from_str(raw).map_err(|_| AppError::malformed("Invalid JSON command"))?;

    let join = match command.join {
        ref v if is_unset(v) => None,
        Value::String(name) => {
            validate_namespace_name(&name, limits.max_namespace_len)?;
            Some(name)
        }
        _ => return Err(AppError::malformed("Invalid join value: must be a string")),
    };

    let listen = match command.listen {
        ref v if is_unset(v) => None,
        Value::Array(entries) => Some(validate_listen(entries, limits)?),
        _ => return Err(AppError::malformed("Invalid listen value: must be an array")),
    };

    Ok(Command { join, listen })
}

/// Validates a namespace name: non-empty and at most `max_len` characters.
pub fn validate_namespace_name(name: &str, max_len: usize) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::invalid_name("Namespace name cannot be empty"));
    }
    if name.chars().count() > max_len {
        return Err(AppError::invalid_name(format!(
            "Maximum length for namespace is {max_len}"
        )));
    }
    Ok(())
}

/// Validates a full subscription list.
pub fn validate_listen_names(names: &[String], limits: &CommandLimits) -> Result<(), AppError> {
    if names.len() > limits.max_listen {
        return Err(AppError::too_many_namespaces(format!(
            "Maximum listenable namespaces is {}",
            limits.max_listen
        )));
    }
    names
        .iter()
        .try_for_each(|name| validate_namespace_name(name, limits.max_namespace_len))
}

fn validate_listen(entries: Vec<Value>, limits: &CommandLimits) -> Result<Vec<String>, AppError> {
    if entries.len() > limits.max_listen {
        return Err(AppError::too_many_namespaces(format!(
            "Maximum listenable namespaces is {}",
            limits.max_listen
        )));
    }

    let names = entries
        .into_iter()
        .map(|entry| match entry {
            Value::String(name) => Ok(name),
            _ => Err(AppError::malformed(
                "Invalid listen value: namespaces must be strings",
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    validate_listen_names(&names, limits)?;
    Ok(names)
}

/// Absent, `null`, `false`, `0`, and `""` all mean "not provided".
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use meter_core::error::ErrorKind;

    use super::*;

    fn parse(raw: &str) -> Result<Command, AppError> {
        parse_command(raw, &CommandLimits::default())
    }

    #[test]
    fn test_join_only() {
        let cmd = parse(r#"{"join": "lobby"}"#).unwrap();
        assert_eq!(cmd.join.as_deref(), Some("lobby"));
        assert_eq!(cmd.listen, None);
    }

    #[test]
    fn test_join_and_listen() {
        let cmd = parse(r#"{"join": "lobby", "listen": ["lobby", "stage"]}"#).unwrap();
        assert_eq!(cmd.join.as_deref(), Some("lobby"));
        assert_eq!(
            cmd.listen,
            Some(vec!["lobby".to_string(), "stage".to_string()])
        );
    }

    #[test]
    fn test_empty_listen_is_kept() {
        let cmd = parse(r#"{"listen": []}"#).unwrap();
        assert_eq!(cmd.listen, Some(Vec::new()));
    }

    #[test]
    fn test_falsy_fields_are_ignored() {
        let cmd = parse(r#"{"join": "", "listen": null}"#).unwrap();
        assert_eq!(cmd, Command::default());
        assert_eq!(parse("{}").unwrap(), Command::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = parse("{join: lobby").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedCommand);
        assert_eq!(err.message, "Invalid JSON command");

        assert_eq!(
            parse("null").unwrap_err().kind,
            ErrorKind::MalformedCommand
        );
    }

    #[test]
    fn test_join_must_be_string() {
        let err = parse(r#"{"join": 42}"#).unwrap_err();
        assert_eq!(err.message, "Invalid join value: must be a string");
    }

    #[test]
    fn test_join_too_long() {
        let raw = format!(r#"{{"join": "{}"}}"#, "x".repeat(51));
        let err = parse(&raw).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
        assert_eq!(err.message, "Maximum length for namespace is 50");

        let raw = format!(r#"{{"join": "{}"}}"#, "x".repeat(50));
        assert!(parse(&raw).is_ok());
    }

    #[test]
    fn test_name_length_counts_characters() {
        let name = "é".repeat(50);
        assert!(validate_namespace_name(&name, 50).is_ok());
    }

    #[test]
    fn test_listen_must_be_array() {
        let err = parse(r#"{"listen": "lobby"}"#).unwrap_err();
        assert_eq!(err.message, "Invalid listen value: must be an array");
    }

    #[test]
    fn test_listen_too_many() {
        let names: Vec<String> = (0..21).map(|i| format!("ns{i}")).collect();
        let raw = serde_json::json!({ "listen": names }).to_string();
        let err = parse(&raw).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyNamespaces);
        assert_eq!(err.message, "Maximum listenable namespaces is 20");
    }

    #[test]
    fn test_listen_entry_validation() {
        let err = parse(r#"{"listen": ["ok", 5]}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedCommand);

        let err = parse(r#"{"listen": ["ok", ""]}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
    }

    #[test]
    fn test_bad_listen_rejects_valid_join_too() {
        let raw = r#"{"join": "lobby", "listen": {"a": 1}}"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn test_oversized_message() {
        let raw = format!(r#"{{"join": "{}"}}"#, "x".repeat(MAX_MESSAGE_SIZE));
        assert_eq!(
            parse(&raw).unwrap_err().kind,
            ErrorKind::MalformedCommand
        );
    }
}
