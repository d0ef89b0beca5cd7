// announcer-core/src/manager/backoff.rs

//! Reconnect backoff for the manager keepalive stream.

use std::time::Duration;

use crate::config::ManagerConfig;

/// Exponential backoff with a ceiling and deterministic jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the first reconnect.
    pub initial_delay: Duration,
    /// Maximum delay between reconnects.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff).
    pub multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl From<&ManagerConfig> for Backoff {
    fn from(config: &ManagerConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.reconnect_delay_ms),
            max_delay: Duration::from_millis(config.max_reconnect_delay_ms),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Calculates the delay for a given attempt number (0-indexed).
    ///
    /// Delays grow geometrically and never exceed `max_delay`, jitter included.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max_delay.as_secs_f64();

        let delay = if self.jitter {
            // Up to 25% extra
            base * (1.0 + rand_simple(attempt) * 0.25)
        } else {
            base
        };

        Duration::from_secs_f64(delay.min(max))
    }
}

/// Simple deterministic pseudo-random number generator for jitter.
/// Uses the attempt number as seed to produce a value in [0, 1].
fn rand_simple(seed: u32) -> f64 {
    let x = seed.wrapping_mul(1103515245).wrapping_add(12345);
    (x as f64) / (u32::MAX as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_manager_config() {
        let config = ManagerConfig {
            reconnect_delay_ms: 200,
            max_reconnect_delay_ms: 5_000,
            ..Default::default()
        };
        let backoff = Backoff::from(&config);
        assert_eq!(backoff.initial_delay, Duration::from_millis(200));
        assert_eq!(backoff.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_delay_grows_without_jitter() {
        let backoff = Backoff {
            jitter: false,
            ..Default::default()
        };

        assert_eq!(backoff.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let backoff = Backoff::default();

        for attempt in [5, 10, 100, u32::MAX] {
            assert!(backoff.delay_for_attempt(attempt) <= backoff.max_delay);
        }
        assert_eq!(backoff.delay_for_attempt(100), backoff.max_delay);
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = Backoff::default();
        let delay = backoff.delay_for_attempt(1);
        assert!(delay >= Duration::from_secs(2));
        assert!(delay <= Duration::from_millis(2_500));
    }
}
