//! Namespace registry and notification scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Registry limits, cleanup grace period, and notifier cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Maximum namespace name length, in characters.
    #[serde(default = "default_max_namespace_len")]
    pub max_namespace_len: usize,
    /// Maximum number of namespaces a single `listen` may name.
    #[serde(default = "default_max_listen")]
    pub max_listen: usize,
    /// Delay before an empty namespace is deleted, in milliseconds.
    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_ms: u64,
    /// Notifier tick interval in milliseconds.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_ms: u64,
    /// Relative change that triggers a debounced notification.
    #[serde(default)]
    pub notify_delta_ratio: Option<f64>,
    /// Minimum time between two debounced notifications of one namespace.
    #[serde(default)]
    pub notify_min_delay_ms: Option<u64>,
    /// Maximum staleness before a changed namespace is force-notified.
    #[serde(default)]
    pub notify_max_delay_ms: Option<u64>,
    /// Per-session outbound message buffer.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
}

/// Resolved notification policy.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyPolicyConfig {
    /// Push every change on every tick.
    Interval,
    /// Push when the relative change is large enough, rate-limited by
    /// `min_delay` and bounded in staleness by `max_delay`.
    Debounced {
        /// Minimum `|members - last| / max(1, last)` to notify.
        delta_ratio: f64,
        /// Minimum time since the previous notification.
        min_delay: Duration,
        /// Changed values older than this are pushed regardless of delta.
        max_delay: Option<Duration>,
    },
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            max_namespace_len: default_max_namespace_len(),
            max_listen: default_max_listen(),
            cleanup_delay_ms: default_cleanup_delay(),
            notify_interval_ms: default_notify_interval(),
            notify_delta_ratio: None,
            notify_min_delay_ms: None,
            notify_max_delay_ms: None,
            outbound_buffer_size: default_outbound_buffer(),
        }
    }
}

impl MeterConfig {
    /// Cleanup grace period as a [`Duration`].
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }

    /// Notifier tick interval as a [`Duration`].
    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    /// The debounced policy is selected as soon as any of its knobs is set.
    pub fn notify_policy(&self) -> NotifyPolicyConfig {
        if self.notify_delta_ratio.is_none()
            && self.notify_min_delay_ms.is_none()
            && self.notify_max_delay_ms.is_none()
        {
            return NotifyPolicyConfig::Interval;
        }

        NotifyPolicyConfig::Debounced {
            delta_ratio: self.notify_delta_ratio.unwrap_or(0.0),
            min_delay: Duration::from_millis(self.notify_min_delay_ms.unwrap_or(0)),
            max_delay: self.notify_max_delay_ms.map(Duration::from_millis),
        }
    }

    /// Rejects values the registry or notifier cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_namespace_len == 0 {
            return Err(AppError::configuration(
                "meter.max_namespace_len must be greater than zero",
            ));
        }
        if self.notify_interval_ms == 0 {
            return Err(AppError::configuration(
                "meter.notify_interval_ms must be greater than zero",
            ));
        }
        if self.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "meter.outbound_buffer_size must be greater than zero",
            ));
        }
        if let Some(ratio) = self.notify_delta_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(AppError::configuration(
                    "meter.notify_delta_ratio must be a non-negative number",
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.notify_min_delay_ms, self.notify_max_delay_ms) {
            if min > max {
                return Err(AppError::configuration(
                    "meter.notify_min_delay_ms cannot exceed meter.notify_max_delay_ms",
                ));
            }
        }
        Ok(())
    }
}

fn default_max_namespace_len() -> usize {
    50
}

fn default_max_listen() -> usize {
    20
}

fn default_cleanup_delay() -> u64 {
    60_000
}

fn default_notify_interval() -> u64 {
    500
}

fn default_outbound_buffer() -> usize {
    64
}
