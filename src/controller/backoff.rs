//! # Fibonacci Backoff
//!
//! Maps a failure counter to a requeue delay.
//!
//! `Backoff(n) = base × F(n + 2)` where `F` is the Fibonacci sequence
//! (`F(2) = 1, F(3) = 2, F(4) = 3, …`). The first failure therefore waits
//! twice the base delay, the second three times, and so on. The sequence grows
//! more slowly than exponential backoff, which suits provisioning steps that
//! usually recover after a few retries.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use codebase_operator::controller::backoff::BackoffPolicy;
//!
//! let policy = BackoffPolicy::new(Duration::from_secs(10));
//! assert_eq!(policy.delay(0), Duration::from_secs(10));
//! assert_eq!(policy.delay(1), Duration::from_secs(20));
//! assert_eq!(policy.delay(2), Duration::from_secs(30));
//! assert_eq!(policy.delay(3), Duration::from_secs(50));
//! ```

use std::time::Duration;

/// Fibonacci indexes past this point saturate `u128` anyway
const MAX_FIB_INDEX: u64 = 200;

/// Failure backoff policy
///
/// The delay is strictly increasing in the failure count until it reaches
/// the cap, if one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Option<Duration>,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(base: Duration) -> Self {
        Self { base, max: None }
    }

    /// Cap every delay at `max`
    #[must_use]
    pub fn with_max(self, max: Duration) -> Self {
        Self {
            max: Some(max),
            ..self
        }
    }

    #[must_use]
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Requeue delay for the given failure count
    ///
    /// Negative counts are treated as zero.
    #[must_use]
    pub fn delay(&self, failure_count: i64) -> Duration {
        let delay = calculate_progressive_backoff(failure_count, self.base);
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Calculate progressive backoff duration based on failure count
///
/// Each resource carries its own failure count in its status, so the delay
/// is independent per resource.
#[must_use]
pub fn calculate_progressive_backoff(failure_count: i64, base: Duration) -> Duration {
    let n = u64::try_from(failure_count).unwrap_or(0);
    let factor = fibonacci(n.saturating_add(2));
    let millis = base.as_millis().saturating_mul(factor);
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// `F(n)` with `F(0) = 0`, `F(1) = 1`, saturating
fn fibonacci(n: u64) -> u128 {
    let n = n.min(MAX_FIB_INDEX);
    let (mut prev, mut current) = (0u128, 1u128);
    if n == 0 {
        return 0;
    }
    for _ in 1..n {
        let next = prev.saturating_add(current);
        prev = current;
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_sequence() {
        let values: Vec<u128> = (0..10).map(fibonacci).collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = BackoffPolicy::new(Duration::from_secs(10));

        // 10s, 20s, 30s, 50s, 80s, 130s
        assert_eq!(policy.delay(0), Duration::from_secs(10));
        assert_eq!(policy.delay(1), Duration::from_secs(20));
        assert_eq!(policy.delay(2), Duration::from_secs(30));
        assert_eq!(policy.delay(3), Duration::from_secs(50));
        assert_eq!(policy.delay(4), Duration::from_secs(80));
        assert_eq!(policy.delay(5), Duration::from_secs(130));
    }

    #[test]
    fn test_backoff_is_strictly_increasing() {
        let policy = BackoffPolicy::new(Duration::from_millis(500));
        for n in 0..60 {
            assert!(
                policy.delay(n) < policy.delay(n + 1),
                "delay({n}) should be below delay({})",
                n + 1
            );
        }
    }

    #[test]
    fn test_negative_count_is_base() {
        let policy = BackoffPolicy::new(Duration::from_secs(5));
        assert_eq!(policy.delay(-3), Duration::from_secs(5));
    }

    #[test]
    fn test_huge_count_saturates() {
        let policy = BackoffPolicy::new(Duration::from_secs(10));
        assert_eq!(policy.delay(i64::MAX), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_cap() {
        let policy = BackoffPolicy::new(Duration::from_secs(10)).with_max(Duration::from_secs(60));
        assert_eq!(policy.delay(2), Duration::from_secs(30));
        assert_eq!(policy.delay(3), Duration::from_secs(50));
        assert_eq!(policy.delay(4), Duration::from_secs(60));
        assert_eq!(policy.delay(100), Duration::from_secs(60));
    }
}
