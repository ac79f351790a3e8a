//! # Jitter policy for retry cooldowns.
//!
//! [`JitterPolicy`] spreads retries of many entries that failed together so they do
//! not hit a recovering transport at the same instant.
//!
//! Jitter here only ever **lengthens** a cooldown: the configured `retry_delay` is a
//! minimum, so randomisation is added on top of it.
//!
//! - [`JitterPolicy::None`] - exact cooldown, predictable timing
//! - [`JitterPolicy::Proportional`] - adds random `[0, fraction × delay]`

use std::time::Duration;

use rand::Rng;

/// Policy controlling randomization of retry cooldowns.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum JitterPolicy {
    /// No jitter: use the exact cooldown.
    #[default]
    None,

    /// Adds a random extra in `[0, fraction × delay]`.
    ///
    /// `fraction` is clamped to `[0.0, 1.0]`; non-finite values disable jitter.
    Proportional(f64),
}

impl JitterPolicy {
    /// Applies jitter to the given delay. The result is never shorter than `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        match *self {
            JitterPolicy::None => delay,
            JitterPolicy::Proportional(fraction) => Self::proportional(delay, fraction),
        }
    }

    fn proportional(delay: Duration, fraction: f64) -> Duration {
        if !fraction.is_finite() {
            return delay;
        }
        let spread_ms = (delay.as_millis() as f64 * fraction.clamp(0.0, 1.0)) as u64;
        if spread_ms == 0 {
            return delay;
        }
        let extra = rand::rng().random_range(0..=spread_ms);
        delay.saturating_add(Duration::from_millis(extra))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(750);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn proportional_stays_within_bounds() {
        let jitter = JitterPolicy::Proportional(0.25);
        let base = Duration::from_millis(1000);
        for _ in 0..200 {
            let d = jitter.apply(base);
            assert!(d >= base, "{d:?} shorter than base");
            assert!(d <= Duration::from_millis(1250), "{d:?} above 125%");
        }
    }

    #[test]
    fn degenerate_fractions_never_shorten() {
        let base = Duration::from_millis(400);
        assert_eq!(JitterPolicy::Proportional(f64::NAN).apply(base), base);
        assert_eq!(JitterPolicy::Proportional(-3.0).apply(base), base);
        assert!(JitterPolicy::Proportional(9.0).apply(base) <= Duration::from_millis(800));
    }
}
