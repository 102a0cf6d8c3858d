//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use meter_core::config::AppConfig;
use meter_core::AppResult;
use meter_core::error::{AppError, ErrorKind};
use meter_realtime::MeterEngine;

/// Built-in demo page, used when no template path is configured.
pub const DEFAULT_DEMO_TEMPLATE: &str = include_str!("../assets/demo.html");

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Occupancy engine
    pub engine: MeterEngine,
    /// Demo page template with `{hostname}` and `{pathname}` placeholders
    pub demo_template: Arc<str>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds the state, reading the demo template from disk if configured.
    pub fn new(config: Arc<AppConfig>, engine: MeterEngine) -> AppResult<Self> {
        let demo_template: Arc<str> = match &config.demo.template_path {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Io,
                        format!("Failed to read demo template '{path}'"),
                        e,
                    )
                })?
                .into(),
            None => DEFAULT_DEMO_TEMPLATE.into(),
        };

        Ok(Self {
            config,
            engine,
            demo_template,
            started_at: Instant::now(),
        })
    }
}
