//! Outbound request pacing.
//!
//! A single global [`RateGate`] spaces every upstream request, regardless of
//! which SKU or caller issued it. Retry backoff helpers live here too.

mod gate;

pub use gate::RateGate;

use std::time::Duration;

use rand::Rng;

/// Retry backoff: `base` plus a uniformly random share of `jitter`.
pub fn jittered_backoff(base: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return base;
    }
    let extra = rand::thread_rng().gen_range(0.0..1.0) * jitter.as_secs_f64();
    base + Duration::from_secs_f64(extra)
}

/// Scale `interval` by a random factor in `[0.9, 1.1]`.
///
/// Keeps consecutive batches from landing on a fixed, detectable cadence.
pub fn jittered_interval(interval: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.9..=1.1);
    interval.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jittered_backoff_bounds() {
        let base = Duration::from_millis(1000);
        let jitter = Duration::from_millis(1000);
        for _ in 0..100 {
            let d = jittered_backoff(base, jitter);
            assert!(d >= base);
            assert!(d < base + jitter);
        }
        assert_eq!(jittered_backoff(base, Duration::ZERO), base);
    }

    #[test]
    fn test_jittered_interval_bounds() {
        let interval = Duration::from_secs(60);
        for _ in 0..100 {
            let d = jittered_interval(interval);
            assert!(d >= Duration::from_secs(54));
            assert!(d <= Duration::from_secs(66));
        }
    }
}
