//! # Delivery queue configuration.
//!
//! Provides [`QueueConfig`], the settings of one [`DeliveryQueue`](crate::DeliveryQueue).
//!
//! ## Sentinel values
//! - `attempt_timeout = 0s` → no per-attempt timeout
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::RetryPolicy;

/// Configuration for a delivery queue.
///
/// ## Field semantics
/// - `max_retries`: total attempts allowed before permanent failure (`1` = no retry)
/// - `retry_delay`: minimum wait after a failed attempt before the next one
/// - `max_concurrent`: maximum attempts in flight at the same instant
/// - `retry`: growth of the cooldown after repeated failures
/// - `attempt_timeout`: per-attempt timeout (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size
/// - `grace`: how long `shutdown` waits for in-flight attempts
///
/// `max_retries`, `retry_delay` and `max_concurrent` must be positive; see
/// [`QueueConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct QueueConfig {
    /// Total attempts per entry (bounds *attempts*, not retries after the first).
    pub max_retries: u32,

    /// Minimum interval between a failed attempt and the next attempt of the same entry.
    pub retry_delay: Duration,

    /// Maximum number of simultaneous in-flight attempts.
    pub max_concurrent: usize,

    /// Cooldown growth policy. The default keeps the cooldown at `retry_delay`.
    pub retry: RetryPolicy,

    /// Per-attempt timeout. `Duration::ZERO` = attempts run until they settle.
    ///
    /// When set, an attempt that overruns is dropped at its next `.await` and counts
    /// as failed. Attempts are then no longer guaranteed to run to completion: a
    /// handler may be cancelled after a partial side effect (e.g. a message posted
    /// but not acknowledged), and the retry may repeat it.
    pub attempt_timeout: Duration,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,

    /// Maximum time `shutdown` waits for in-flight attempts.
    pub grace: Duration,
}

impl QueueConfig {
    /// Checks the positivity constraints and the retry factor.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use courier::{ConfigError, QueueConfig};
    ///
    /// let mut cfg = QueueConfig::default();
    /// assert!(cfg.validate().is_ok());
    ///
    /// cfg.retry_delay = Duration::ZERO;
    /// assert_eq!(cfg.validate(), Err(ConfigError::ZeroRetryDelay));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroMaxRetries);
        }
        if self.retry_delay.is_zero() {
            return Err(ConfigError::ZeroRetryDelay);
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroMaxConcurrent);
        }
        let factor = self.retry.factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(ConfigError::InvalidRetryFactor { factor });
        }
        Ok(())
    }

    /// Returns the per-attempt timeout as an `Option`.
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.attempt_timeout.is_zero() {
            None
        } else {
            Some(self.attempt_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Cooldown to apply after `failures` failed attempts.
    #[inline]
    pub(crate) fn cooldown(&self, failures: u32) -> Duration {
        self.retry.delay(self.retry_delay, failures)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `max_retries = 3`
    /// - `retry_delay = 5s`
    /// - `max_concurrent = 5`
    /// - `retry = RetryPolicy::default()` (constant cooldown)
    /// - `attempt_timeout = 0s` (no timeout)
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            max_concurrent: 5,
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::ZERO,
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_explicit_and_valid() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_delay, Duration::from_secs(5));
        assert_eq!(cfg.max_concurrent, 5);
        assert_eq!(cfg.attempt_timeout(), None);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn zero_values_are_rejected() {
        let cfg = QueueConfig {
            max_retries: 0,
            ..QueueConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMaxRetries));

        let cfg = QueueConfig {
            max_concurrent: 0,
            ..QueueConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMaxConcurrent));
    }

    #[test]
    fn shrinking_or_nan_factor_is_rejected() {
        let mut cfg = QueueConfig::default();
        cfg.retry.factor = 0.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRetryFactor { .. })
        ));
        cfg.retry.factor = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn sentinels() {
        let cfg = QueueConfig {
            attempt_timeout: Duration::from_millis(250),
            bus_capacity: 0,
            ..QueueConfig::default()
        };
        assert_eq!(cfg.attempt_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
