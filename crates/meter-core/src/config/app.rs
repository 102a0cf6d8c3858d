//! Server, stats listener, and demo page configuration.

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

/// Plaintext stats dump listener.
///
/// Each accepted connection receives one
/// `<namespace>:<created>:<members>:<connections>` line per live namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Whether the listener is started.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bind address. Keep this on loopback.
    #[serde(default = "default_stats_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_stats_port")]
    pub port: u16,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_stats_host(),
            port: default_stats_port(),
        }
    }
}

/// Demo page served on every non-JSON path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Path to an HTML template overriding the built-in page.
    ///
    /// `{hostname}` and `{pathname}` are substituted per request.
    #[serde(default)]
    pub template_path: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_stats_host() -> String {
    "127.0.0.1".to_string()
}

fn default_stats_port() -> u16 {
    1442
}
