//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the un-jittered exponential delay for an attempt, capped at `max_ms`.
///
/// Non-decreasing in `attempt`.
pub fn base_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Calculate exponential backoff delay with jitter.
///
/// Jitter subtracts up to 20% of the capped delay, so the result never exceeds
/// `max_ms` and clients that hit the cap still spread out.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let capped_delay = base_backoff(attempt, base_ms, max_ms).as_millis() as u64;

    let jitter_range = capped_delay / 5;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay - jitter)
}

/// Backoff parameters for one retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    /// Jittered delay before the given (1-based) retry.
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_ms, self.max_ms)
    }

    pub fn cap(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(base_backoff(1, 100, 2000).as_millis(), 100);
        assert_eq!(base_backoff(2, 100, 2000).as_millis(), 200);
        assert_eq!(base_backoff(10, 100, 1000).as_millis(), 1000);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 80 && b1.as_millis() <= 100);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 800 && max.as_millis() <= 1000);
    }

    #[test]
    fn test_huge_attempt_saturates() {
        assert_eq!(base_backoff(u32::MAX, 1_000, 60_000), Duration::from_millis(60_000));
        assert!(Backoff::new(1_000, 60_000).delay(500) <= Duration::from_millis(60_000));
    }

    proptest! {
        #[test]
        fn delays_grow_and_stay_capped(
            base in 1u64..5_000,
            extra in 0u64..120_000,
            failures in 1u32..64,
        ) {
            let max = base + extra;
            let backoff = Backoff::new(base, max);
            let mut previous = Duration::ZERO;
            for attempt in 1..=failures {
                let unjittered = base_backoff(attempt, base, max);
                prop_assert!(unjittered >= previous);
                prop_assert!(unjittered <= backoff.cap());
                prop_assert!(backoff.delay(attempt) <= backoff.cap());
                previous = unjittered;
            }
        }
    }
}
