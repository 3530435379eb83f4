use std::time::Duration;

/// Pacing between consecutive model calls in a batch loop.
///
/// A batch sleeps `delay` after every successful call and
/// `rate_limit_delay` after a call that failed on a rate limit or quota.
/// Nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub delay: Duration,
    pub rate_limit_delay: Duration,
}

impl Throttle {
    pub fn new(delay_ms: u64, rate_limit_delay_ms: u64) -> Self {
        Throttle {
            delay: Duration::from_millis(delay_ms),
            rate_limit_delay: Duration::from_millis(rate_limit_delay_ms),
        }
    }

    /// No pauses at all.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// How long to wait after a call with the given outcome.
    pub fn pause_for(&self, succeeded: bool, rate_limited: bool) -> Duration {
        if succeeded {
            self.delay
        } else if rate_limited {
            self.rate_limit_delay
        } else {
            Duration::ZERO
        }
    }

    pub fn pause(&self, succeeded: bool, rate_limited: bool) {
        let wait = self.pause_for(succeeded, rate_limited);
        if !wait.is_zero() {
            if rate_limited {
                log::info!("[throttle] Rate limit hit, waiting {:?}", wait);
            }
            std::thread::sleep(wait);
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(500, 5000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_after_success() {
        let t = Throttle::default();
        assert_eq!(t.pause_for(true, false), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limit_waits_longer() {
        let t = Throttle::default();
        assert_eq!(t.pause_for(false, true), Duration::from_secs(5));
        assert_eq!(t.pause_for(false, false), Duration::ZERO);
    }

    #[test]
    fn test_none_never_sleeps() {
        let t = Throttle::none();
        assert!(t.pause_for(true, false).is_zero());
        assert!(t.pause_for(false, true).is_zero());
    }
}
