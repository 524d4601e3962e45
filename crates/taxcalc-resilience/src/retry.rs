//! Retry with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;
use taxcalc_core::{TaxError, TaxResult};

use crate::cancel::CancelToken;

/// Callback invoked before each retry sleep: (attempt, error, delay).
pub type OnRetry<'a> = dyn Fn(u32, &TaxError, Duration) + 'a;

/// Configuration for retry behavior.
pub struct RetryConfig<'a> {
    /// Maximum attempts including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Jitter fraction in [0, 1]: the delay is scaled by a uniform factor
    /// in [1 - jitter, 1 + jitter].
    pub jitter: f64,
    /// Whether an error may be retried. Defaults to
    /// [`TaxError::is_retryable`].
    pub should_retry: Box<dyn Fn(&TaxError) -> bool + 'a>,
    pub on_retry: Option<Box<OnRetry<'a>>>,
}

impl Default for RetryConfig<'_> {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: 0.1,
            should_retry: Box::new(TaxError::is_retryable),
            on_retry: None,
        }
    }
}

impl<'a> RetryConfig<'a> {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Fast config for tests and in-process callers.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
            ..Default::default()
        }
    }

    pub fn with_should_retry(mut self, f: impl Fn(&TaxError) -> bool + 'a) -> Self {
        self.should_retry = Box::new(f);
        self
    }

    pub fn with_on_retry(mut self, f: impl Fn(u32, &TaxError, Duration) + 'a) -> Self {
        self.on_retry = Some(Box::new(f));
        self
    }

    /// Delay before the retry following `attempt` (1-indexed):
    /// min(max_delay, base x multiplier^(attempt-1)) scaled by jitter,
    /// floored at zero.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let raw = self.base_delay.as_secs_f64() * exp;
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter > 0.0 {
            let factor = rand::thread_rng().gen_range(1.0 - self.jitter..=1.0 + self.jitter);
            (capped * factor).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}

/// Run `operation` under the retry policy.
///
/// Non-retryable errors are returned immediately; after the final attempt
/// fails, the last error is wrapped in [`TaxError::RetryExhausted`].
/// Sleeps honor the cancellation token and surface
/// [`TaxError::Cancelled`].
pub fn retry<T>(
    config: &RetryConfig<'_>,
    cancel: &CancelToken,
    mut operation: impl FnMut() -> TaxResult<T>,
) -> TaxResult<T> {
    let max_attempts = config.max_attempts.max(1);
    let mut last_error: Option<TaxError> = None;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(TaxError::Cancelled);
        }
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !(config.should_retry)(&err) {
                    tracing::debug!(error = %err, "non-retryable error");
                    return Err(err);
                }
                if attempt >= max_attempts {
                    tracing::warn!(attempts = attempt, error = %err, "retry exhausted");
                    return Err(TaxError::RetryExhausted {
                        attempts: attempt,
                        last_error: Box::new(err),
                    });
                }
                let delay = config.delay_for_attempt(attempt);
                tracing::info!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after failure"
                );
                if let Some(on_retry) = &config.on_retry {
                    on_retry(attempt, &err, delay);
                }
                last_error = Some(err);
                if !cancel.sleep(delay) {
                    return Err(TaxError::Cancelled);
                }
            }
        }
    }

    // Unreachable with max_attempts >= 1; kept for totality.
    Err(TaxError::RetryExhausted {
        attempts: max_attempts,
        last_error: Box::new(last_error.unwrap_or(TaxError::Cancelled)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn succeeds_first_try() {
        let config = RetryConfig::immediate(3);
        let result = retry(&config, &CancelToken::new(), || Ok::<_, TaxError>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn retries_until_success() {
        let attempts = Cell::new(0);
        let config = RetryConfig::immediate(5);
        let result = retry(&config, &CancelToken::new(), || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 3 {
                Err(TaxError::external("flaky"))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn exhaustion_wraps_last_error() {
        let config = RetryConfig::immediate(3);
        let result: TaxResult<()> = retry(&config, &CancelToken::new(), || {
            Err(TaxError::external("down"))
        });
        match result.unwrap_err() {
            TaxError::RetryExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last_error, TaxError::ExternalUnavailable(_)));
            }
            other => panic!("expected RetryExhausted, got {other}"),
        }
    }

    #[test]
    fn non_retryable_raises_immediately() {
        let attempts = Cell::new(0);
        let config = RetryConfig::immediate(5);
        let result: TaxResult<()> = retry(&config, &CancelToken::new(), || {
            attempts.set(attempts.get() + 1);
            Err(TaxError::not_found("gone"))
        });
        assert!(matches!(result.unwrap_err(), TaxError::NotFound(_)));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn custom_should_retry_blacklist() {
        let attempts = Cell::new(0);
        let config = RetryConfig::immediate(5)
            .with_should_retry(|e| e.is_retryable() && !e.to_string().contains("fatal"));
        let result: TaxResult<()> = retry(&config, &CancelToken::new(), || {
            attempts.set(attempts.get() + 1);
            Err(TaxError::external("fatal timeout"))
        });
        assert!(matches!(
            result.unwrap_err(),
            TaxError::ExternalUnavailable(_)
        ));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn on_retry_callback_observes_each_retry() {
        let seen = std::sync::Mutex::new(Vec::new());
        let config = RetryConfig::immediate(3).with_on_retry(|attempt, _, _| {
            seen.lock().unwrap().push(attempt);
        });
        let _: TaxResult<()> = retry(&config, &CancelToken::new(), || {
            Err(TaxError::external("down"))
        });
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(8));
        // Capped from here on.
        assert_eq!(config.delay_for_attempt(7), Duration::from_secs(8));
    }

    #[test]
    fn jitter_stays_within_band() {
        let config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.0,
            jitter: 0.5,
            ..Default::default()
        };
        for _ in 0..100 {
            let d = config.delay_for_attempt(1).as_secs_f64();
            assert!((5.0..=15.0).contains(&d), "delay {d} outside jitter band");
        }
    }

    #[test]
    fn cancellation_interrupts_retry_sleep() {
        let token = CancelToken::new();
        token.cancel();
        let config = RetryConfig::immediate(3);
        let result: TaxResult<()> = retry(&config, &token, || Err(TaxError::external("down")));
        assert!(matches!(result.unwrap_err(), TaxError::Cancelled));
    }
}
