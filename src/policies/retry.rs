//! # Retry cooldown policy.
//!
//! [`RetryPolicy`] controls how the cooldown between attempts of one entry evolves
//! after repeated failures. It is parameterized by:
//! - [`RetryPolicy::factor`] the multiplicative growth factor;
//! - [`RetryPolicy::max`] the cap on the grown cooldown;
//! - [`RetryPolicy::jitter`] randomisation added on top.
//!
//! The cooldown after the n-th failure is `retry_delay × factor^(n-1)`, clamped to
//! `max`, then jittered. The queue's `retry_delay` is a **floor**: a `max` below it is
//! ignored and jitter only lengthens the result.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use courier::{JitterPolicy, RetryPolicy};
//!
//! let policy = RetryPolicy {
//!     factor: 2.0,
//!     max: Duration::from_secs(1),
//!     jitter: JitterPolicy::None,
//! };
//! let base = Duration::from_millis(100);
//!
//! assert_eq!(policy.delay(base, 1), Duration::from_millis(100));
//! assert_eq!(policy.delay(base, 2), Duration::from_millis(200));
//! assert_eq!(policy.delay(base, 10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry cooldown growth policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Multiplicative growth factor (`>= 1.0`; `1.0` keeps the cooldown constant).
    pub factor: f64,
    /// Cap for the grown cooldown (never below the queue's `retry_delay`).
    pub max: Duration,
    /// Jitter added on top of the cooldown.
    pub jitter: JitterPolicy,
}

impl Default for RetryPolicy {
    /// Returns a constant cooldown:
    /// - `factor = 1.0`;
    /// - `max = 5min`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            factor: 1.0,
            max: Duration::from_secs(300),
            jitter: JitterPolicy::None,
        }
    }
}

impl RetryPolicy {
    /// Constant cooldown (the default).
    pub fn constant() -> Self {
        Self::default()
    }

    /// Exponential growth by `factor`, capped at `max`, no jitter.
    pub fn exponential(factor: f64, max: Duration) -> Self {
        Self {
            factor,
            max,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the cooldown after `failures` failed attempts (1-based).
    ///
    /// `failures = 0` is treated as 1. The result is never below `base`.
    pub fn delay(&self, base: Duration, failures: u32) -> Duration {
        let cap = self.max.max(base);
        let exp = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let grown_secs = base.as_secs_f64() * self.factor.powi(exp);

        let grown = if !grown_secs.is_finite() || grown_secs > cap.as_secs_f64() {
            cap
        } else {
            Duration::try_from_secs_f64(grown_secs)
                .map_or(cap, |d| d.clamp(base, cap))
        };
        self.jitter.apply(grown)
    }
}
