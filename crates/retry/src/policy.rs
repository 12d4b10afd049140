use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::Backoff;

/// What a bounded retry loop produced
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded (possibly after retries)
    Ok(T),

    /// A non-retryable error surfaced; retrying would not help
    Fatal(E),

    /// Retryable errors persisted through every allowed attempt
    Exhausted { last_error: E, attempts: u32 },
}

/// Bounded retry for operations with a transient/deterministic error split.
///
/// Only errors the classifier marks retryable are retried; everything else
/// surfaces on the first occurrence.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_cap: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_cap,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails deterministically, or the
    /// attempt bound is reached.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        label: &str,
        mut operation: F,
        is_retryable: C,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        C: Fn(&E) -> bool,
    {
        let mut backoff = Backoff::new(self.backoff_base, self.backoff_cap);

        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(value) => return RetryOutcome::Ok(value),
                Err(e) if !is_retryable(&e) => return RetryOutcome::Fatal(e),
                Err(e) => {
                    if attempt == self.max_attempts {
                        return RetryOutcome::Exhausted {
                            last_error: e,
                            attempts: attempt,
                        };
                    }
                    let delay = backoff.next_delay();
                    debug!(
                        %label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop always returns within the attempt bound")
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200), Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn retryable(e: &TestError) -> bool {
        matches!(e, TestError::Transient)
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));

        let outcome = policy
            .run(
                "test",
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(TestError::Transient)
                        } else {
                            Ok(42u32)
                        }
                    }
                },
                retryable,
            )
            .await;

        assert!(matches!(outcome, RetryOutcome::Ok(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_never_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));

        let outcome: RetryOutcome<u32, TestError> = policy
            .run(
                "test",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(TestError::Fatal) }
                },
                retryable,
            )
            .await;

        assert!(matches!(outcome, RetryOutcome::Fatal(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));

        let outcome: RetryOutcome<u32, TestError> = policy
            .run("test", || async { Err(TestError::Transient) }, retryable)
            .await;

        match outcome {
            RetryOutcome::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }
}
