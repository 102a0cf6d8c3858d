//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files and `AUDIENCE__*` environment variables. Every field
//! carries a serde default, so an empty configuration is valid.

pub mod app;
pub mod logging;
pub mod meter;

use serde::{Deserialize, Serialize};

pub use self::app::{DemoConfig, ServerConfig, StatsConfig};
pub use self::logging::LoggingConfig;
pub use self::meter::{MeterConfig, NotifyPolicyConfig};

use crate::error::AppError;
use crate::result::AppResult;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Namespace registry and notifier settings.
    #[serde(default)]
    pub meter: MeterConfig,
    /// Loopback plaintext stats listener.
    #[serde(default)]
    pub stats: StatsConfig,
    /// Demo page settings.
    #[serde(default)]
    pub demo: DemoConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `config/default.toml` (if present), then the explicit file
    /// given by `path` (required when supplied), then environment variables
    /// prefixed with `AUDIENCE__`.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("AUDIENCE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.meter.validate()?;
        Ok(config)
    }
}
