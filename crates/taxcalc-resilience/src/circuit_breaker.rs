//! Circuit breaker for external service calls.
//!
//! State machine:
//! - CLOSED -> OPEN after `failure_threshold` consecutive failures
//! - OPEN -> HALF_OPEN once `timeout` has elapsed
//! - HALF_OPEN -> CLOSED after `success_threshold` successes
//! - HALF_OPEN -> OPEN on any failure

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use taxcalc_core::{TaxError, TaxResult};

/// Circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Configuration for a circuit breaker.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in CLOSED before opening.
    pub failure_threshold: u32,
    /// Successes in HALF_OPEN before closing.
    pub success_threshold: u32,
    /// Time in OPEN before probing with HALF_OPEN.
    pub timeout: Duration,
    /// Whether an error counts as a circuit failure. Defaults to
    /// [`TaxError::is_retryable`].
    pub counts_as_failure: Arc<dyn Fn(&TaxError) -> bool + Send + Sync>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            counts_as_failure: Arc::new(TaxError::is_retryable),
        }
    }
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("failure_threshold", &self.failure_threshold)
            .field("success_threshold", &self.success_threshold)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
}

/// Point-in-time statistics for one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
}

/// A named circuit breaker. Shareable across threads.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, applying the OPEN -> HALF_OPEN timeout transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        self.refresh_state(&mut inner);
        inner.state
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        self.refresh_state(&mut inner);
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
        }
    }

    fn refresh_state(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open {
            if let Some(last) = inner.last_failure_time {
                if last.elapsed() >= self.config.timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    tracing::info!(circuit = %self.name, "circuit breaker half-open");
                }
            }
        }
    }

    /// Check whether a request may proceed. In OPEN, returns
    /// [`TaxError::CircuitOpen`] with the time remaining until the
    /// half-open probe.
    pub fn allow_request(&self) -> TaxResult<()> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        self.refresh_state(&mut inner);
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let time_remaining = inner
                    .last_failure_time
                    .map(|last| self.config.timeout.saturating_sub(last.elapsed()))
                    .unwrap_or_default();
                Err(TaxError::CircuitOpen {
                    circuit: self.name.clone(),
                    time_remaining_secs: time_remaining.as_secs_f64(),
                })
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        self.refresh_state(&mut inner);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.last_failure_time = None;
                    tracing::info!(circuit = %self.name, "circuit breaker closed");
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, error: &TaxError) {
        if !(self.config.counts_as_failure)(error) {
            return;
        }
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        self.refresh_state(&mut inner);
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_failure_time = Some(Instant::now());
                tracing::warn!(circuit = %self.name, "circuit breaker re-opened");
            }
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.last_failure_time = Some(Instant::now());
                    tracing::warn!(
                        circuit = %self.name,
                        failures = inner.failure_count,
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::Open => {
                inner.last_failure_time = Some(Instant::now());
            }
        }
    }

    /// Run an operation through the breaker: check, execute, record.
    pub fn call<T>(&self, operation: impl FnOnce() -> TaxResult<T>) -> TaxResult<T> {
        self.allow_request()?;
        match operation() {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Force back to CLOSED.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure_time = None;
    }
}

/// Process-wide registry: callers share one breaker per logical endpoint
/// name. Reads and writes are linearizable through the internal lock.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            default_config,
        }
    }

    /// Get or create the breaker for a name.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_with_config(name, None)
    }

    /// Get or create with an explicit config for first creation.
    pub fn get_with_config(
        &self,
        name: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().expect("registry lock poisoned");
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    name,
                    config.unwrap_or_else(|| self.default_config.clone()),
                ))
            })
            .clone()
    }

    pub fn remove(&self, name: &str) {
        self.breakers
            .lock()
            .expect("registry lock poisoned")
            .remove(name);
    }

    pub fn reset_all(&self) {
        for breaker in self
            .breakers
            .lock()
            .expect("registry lock poisoned")
            .values()
        {
            breaker.reset();
        }
    }

    pub fn all_stats(&self) -> HashMap<String, CircuitBreakerStats> {
        self.breakers
            .lock()
            .expect("registry lock poisoned")
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.stats()))
            .collect()
    }
}
