//! Retry policy state machine.
//!
//! `NotStarted -> Attempting(n) -> {Succeeded | Exhausted}`. The loop
//! inspects a typed [`AttemptOutcome`] instead of catching errors: a
//! completed call with a retryable status code comes back as
//! `Retryable`, so transport failures and application-level retry signals
//! flow through the same branch. Delays are non-blocking
//! (`tokio::time::sleep`), so many in-flight deliveries can await their own
//! backoff independently.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use framebridge_core::{RetryMode, RetryPolicyConfig};

use crate::error::DeliveryError;

/// Typed result of one delivery attempt.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// Worth another attempt, if the policy has any left.
    Retryable(DeliveryError),
    /// Terminal regardless of remaining attempts.
    Fatal(DeliveryError),
}

/// Observable progress of a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    NotStarted,
    Attempting(u32),
    Succeeded,
    Exhausted,
}

/// Governs attempt count and inter-attempt delay for delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryPolicyConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryPolicyConfig {
        &self.config
    }

    /// Total attempts the policy will make.
    pub fn max_attempts(&self) -> u32 {
        match self.config.mode {
            RetryMode::None => 1,
            _ => self.config.max_attempts.max(1),
        }
    }

    /// Delay before attempt `n` (1-based). The first attempt is immediate;
    /// exponential delays grow as `base * multiplier^(n-2)`, capped at
    /// `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.config.mode {
            RetryMode::None => Duration::ZERO,
            RetryMode::Fixed => self.config.base_delay(),
            RetryMode::Exponential => {
                let exponent = attempt.saturating_sub(2).min(1_000) as i32;
                let factor = self.config.multiplier.max(1.0).powi(exponent);
                // Clamp in f64 space: the uncapped product can exceed what a
                // Duration can hold long before the cap applies.
                let delay_ms =
                    (self.config.base_delay_ms as f64 * factor).min(self.config.max_delay_ms as f64);
                Duration::from_millis(delay_ms as u64)
            }
        }
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. The last error is
    /// propagated on exhaustion, wrapped in [`DeliveryError::Exhausted`].
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, DeliveryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let max_attempts = self.max_attempts();
        debug!(state = ?RetryState::NotStarted, max_attempts, "starting delivery");
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(state = ?RetryState::Attempting(attempt), "delivery attempt");
            match op(attempt).await {
                AttemptOutcome::Success(value) => {
                    debug!(state = ?RetryState::Succeeded, attempt, "delivery succeeded");
                    return Ok(value);
                }
                AttemptOutcome::Fatal(e) => {
                    warn!(attempt, error = %e, "non-retryable delivery failure");
                    return Err(e);
                }
                AttemptOutcome::Retryable(e) => {
                    if attempt >= max_attempts {
                        warn!(state = ?RetryState::Exhausted, attempts = attempt, error = %e, "retry attempts exhausted");
                        return Err(DeliveryError::Exhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    let delay = self.delay_before(attempt + 1);
                    warn!(
                        attempt,
                        next_delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy(mode: RetryMode, max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryPolicyConfig {
            max_attempts,
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
            mode,
            ..Default::default()
        })
    }

    #[test]
    fn test_exponential_delay_schedule() {
        let policy = policy(RetryMode::Exponential, 10);
        let expected_ms = [0u64, 1000, 2000, 4000, 8000, 16_000, 30_000, 30_000];
        for (i, expected) in expected_ms.iter().enumerate() {
            let attempt = (i + 1) as u32;
            assert_eq!(
                policy.delay_before(attempt),
                Duration::from_millis(*expected),
                "attempt {}",
                attempt
            );
        }
    }

    #[test]
    fn test_late_attempts_stay_capped() {
        // The uncapped product for attempt 80 is far beyond Duration's range;
        // the cap has to apply before any Duration arithmetic happens.
        let policy = policy(RetryMode::Exponential, 100);
        assert_eq!(policy.delay_before(80), Duration::from_millis(30_000));
        assert_eq!(policy.delay_before(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn test_fixed_and_none_delays() {
        let fixed = policy(RetryMode::Fixed, 5);
        assert_eq!(fixed.delay_before(2), Duration::from_millis(1000));
        assert_eq!(fixed.delay_before(5), Duration::from_millis(1000));

        let none = policy(RetryMode::None, 5);
        assert_eq!(none.max_attempts(), 1);
        assert_eq!(none.delay_before(2), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_no_retry_makes_exactly_one_attempt() {
        let policy = policy(RetryMode::None, 5);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .execute(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::Retryable(DeliveryError::Timeout("t".into())) }
            })
            .await;
        assert!(matches!(
            result,
            Err(DeliveryError::Exhausted { attempts: 1, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let policy = policy(RetryMode::Exponential, 5);
        let start = Instant::now();
        let result = policy
            .execute(|attempt| async move {
                if attempt < 3 {
                    AttemptOutcome::Retryable(DeliveryError::Network("reset".into()))
                } else {
                    AttemptOutcome::Success(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        // 1000ms before attempt 2 + 2000ms before attempt 3, on virtual time.
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_fatal_short_circuits() {
        let policy = policy(RetryMode::Exponential, 5);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .execute(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::Fatal(DeliveryError::Fatal("bad request".into())) }
            })
            .await;
        assert!(matches!(result, Err(DeliveryError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_carries_last_error() {
        let policy = policy(RetryMode::Fixed, 3);
        let result: Result<(), _> = policy
            .execute(|attempt| async move {
                AttemptOutcome::Retryable(DeliveryError::Status {
                    code: 500 + attempt as u16,
                })
            })
            .await;
        match result {
            Err(DeliveryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, DeliveryError::Status { code: 503 }));
            }
            other => panic!("expected exhaustion, got {:?}", other.err()),
        }
    }

}
