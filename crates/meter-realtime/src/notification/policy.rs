//! Decides whether a namespace's change is worth pushing.

use std::time::Duration;

use tokio::time::Instant;

use meter_core::config::NotifyPolicyConfig;

/// Notification rule, evaluated per listener and namespace once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyPolicy {
    /// Notify on any change.
    Interval,
    /// Notify on large-enough changes, at most once per `min_delay`, and
    /// never let a changed value go unpushed for longer than `max_delay`.
    Debounced {
        /// Minimum relative change.
        delta_ratio: f64,
        /// Minimum time between notifications.
        min_delay: Duration,
        /// Staleness bound for changed values.
        max_delay: Option<Duration>,
    },
}

impl From<NotifyPolicyConfig> for NotifyPolicy {
    fn from(config: NotifyPolicyConfig) -> Self {
        match config {
            NotifyPolicyConfig::Interval => Self::Interval,
            NotifyPolicyConfig::Debounced {
                delta_ratio,
                min_delay,
                max_delay,
            } => Self::Debounced {
                delta_ratio,
                min_delay,
                max_delay,
            },
        }
    }
}

impl NotifyPolicy {
    /// Whether `members` should be pushed to a listener now.
    ///
    /// `last_members` is the value the listener holds and `last_at` when
    /// the notifier pushed it. An unchanged value is never pushed. A
    /// listener holding nothing is always pushed, and one that has not had
    /// a push yet is not held back by `min_delay`.
    pub fn should_notify(
        &self,
        members: u64,
        last_members: Option<u64>,
        last_at: Option<Instant>,
        now: Instant,
    ) -> bool {
        let Some(last) = last_members else {
            return true;
        };
        if last == members {
            return false;
        }

        match self {
            Self::Interval => true,
            Self::Debounced {
                delta_ratio,
                min_delay,
                max_delay,
            } => {
                let since = last_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or(Duration::MAX);
                let delta = members.abs_diff(last) as f64 / last.max(1) as f64;

                (delta >= *delta_ratio && since >= *min_delay)
                    || max_delay.is_some_and(|max| since >= max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debounced(ratio: f64, min_secs: u64, max_secs: Option<u64>) -> NotifyPolicy {
        NotifyPolicy::Debounced {
            delta_ratio: ratio,
            min_delay: Duration::from_secs(min_secs),
            max_delay: max_secs.map(Duration::from_secs),
        }
    }

    #[test]
    fn test_interval_notifies_any_change() {
        let now = Instant::now();
        let policy = NotifyPolicy::Interval;
        assert!(policy.should_notify(5, None, None, now));
        assert!(policy.should_notify(5, Some(4), Some(now), now));
        assert!(!policy.should_notify(5, Some(5), Some(now), now));
    }

    #[test]
    fn test_debounced_requires_ratio() {
        let last_at = Instant::now();
        let now = last_at + Duration::from_secs(10);
        let policy = debounced(0.1, 0, None);

        // 100 -> 105 is 5%
        assert!(!policy.should_notify(105, Some(100), Some(last_at), now));
        // 100 -> 110 is 10%
        assert!(policy.should_notify(110, Some(100), Some(last_at), now));
        // zero baseline divides by one
        assert!(policy.should_notify(1, Some(0), Some(last_at), now));
    }

    #[test]
    fn test_debounced_respects_min_delay() {
        let last_at = Instant::now();
        let policy = debounced(0.0, 2, None);

        let one_sec = last_at + Duration::from_secs(1);
        assert!(!policy.should_notify(10, Some(5), Some(last_at), one_sec));

        let two_secs = last_at + Duration::from_secs(2);
        assert!(policy.should_notify(10, Some(5), Some(last_at), two_secs));
    }

    #[test]
    fn test_debounced_max_delay_forces_small_changes() {
        let last_at = Instant::now();
        let policy = debounced(0.5, 2, Some(60));

        let early = last_at + Duration::from_secs(30);
        assert!(!policy.should_notify(101, Some(100), Some(last_at), early));

        let late = last_at + Duration::from_secs(60);
        assert!(policy.should_notify(101, Some(100), Some(last_at), late));
        assert!(!policy.should_notify(100, Some(100), Some(last_at), late));
    }

    #[test]
    fn test_debounced_without_prior_push_skips_delays() {
        let now = Instant::now();
        let policy = debounced(0.5, 2, Some(60));

        assert!(policy.should_notify(0, Some(1), None, now));
        assert!(policy.should_notify(3, None, None, now));
        assert!(!policy.should_notify(1, Some(1), None, now));
    }

    #[test]
    fn test_from_config() {
        assert_eq!(
            NotifyPolicy::from(NotifyPolicyConfig::Interval),
            NotifyPolicy::Interval
        );
    }
}
