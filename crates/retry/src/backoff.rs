use std::time::Duration;

/// Capped exponential delay sequence: `base * factor^n`, never above `cap`.
#[derive(Clone, Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    factor: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            factor: 2,
            attempt: 0,
        }
    }

    pub fn with_factor(mut self, factor: u32) -> Self {
        self.factor = factor.max(1);
        self
    }

    /// Delay before the next attempt, advancing the sequence
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.factor.checked_pow(self.attempt).unwrap_or(u32::MAX);
        let delay = self
            .base
            .checked_mul(exp)
            .map(|d| d.min(self.cap))
            .unwrap_or(self.cap);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubling_sequence() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn test_cap_applies() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        for _ in 0..30 {
            assert!(backoff.next_delay() <= Duration::from_millis(350));
        }
    }

    #[test]
    fn test_custom_factor_and_reset() {
        let mut backoff =
            Backoff::new(Duration::from_millis(10), Duration::from_secs(5)).with_factor(3);
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(30));
        assert_eq!(backoff.next_delay(), Duration::from_millis(90));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }
}
