//! Circuit breaker state machine.
//!
//! Tracks consecutive failures of a single downstream dependency. Once the
//! failure threshold is reached the breaker opens and rejects calls without
//! executing them. After a cooldown, exactly one probe call is let through;
//! its outcome decides whether the breaker closes again or re-opens.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Circuit breaker states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Failing fast, calls are rejected.
    Open,
    /// Cooldown elapsed, a single probe call is allowed.
    HalfOpen,
}

/// Breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures required to open the circuit.
    pub failure_threshold: u32,
    /// Cooldown before a recovery probe is attempted.
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

/// How a failed call counts against the breaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Counts toward the failure threshold.
    Counted,
    /// Propagated to the caller but not held against the dependency
    /// (e.g. a caller-side timeout when timeouts are not penalized).
    Neutral,
}

/// Error returned by the guarded call.
#[derive(Debug, Error, PartialEq)]
pub enum BreakerError<E> {
    /// The breaker is open; the underlying operation was not executed.
    #[error("circuit open: request rejected without calling the service")]
    CircuitOpen,
    /// The underlying operation failed; the failure was recorded first.
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

/// Per-integration circuit breaker.
///
/// One instance is owned per integration client. All state lives in process
/// memory behind a mutex; nothing is persisted across restarts.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a breaker with the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                probe_in_flight: false,
            }),
            config,
        }
    }

    /// Execute `work` through the breaker.
    ///
    /// Every failure counts toward the threshold. Use
    /// [`call_with_classifier`](Self::call_with_classifier) to exempt
    /// specific error kinds.
    pub async fn call<F, Fut, T, E>(&self, work: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_with_classifier(work, |_| FailureKind::Counted)
            .await
    }

    /// Execute `work` through the breaker with a failure classifier.
    ///
    /// Rejects immediately with [`BreakerError::CircuitOpen`] while the
    /// circuit is open and the cooldown has not elapsed; `work` is not
    /// constructed in that case. Otherwise the outcome is recorded before
    /// the result is returned, and `Neutral` failures propagate without
    /// moving the state machine.
    pub async fn call_with_classifier<F, Fut, T, E, C>(
        &self,
        work: F,
        classify: C,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> FailureKind,
    {
        let is_probe = self.admit()?;
        let permit = ProbePermit {
            breaker: self,
            active: is_probe,
        };

        match work().await {
            Ok(value) => {
                self.record_success();
                permit.settle();
                Ok(value)
            }
            Err(err) => {
                match classify(&err) {
                    FailureKind::Counted => self.record_failure(),
                    FailureKind::Neutral => self.release_probe(),
                }
                permit.settle();
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Current state, for observability and tests.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().unwrap().consecutive_failures
    }

    /// Decide whether a call may proceed. Returns whether it is a probe.
    fn admit<E>(&self) -> Result<bool, BreakerError<E>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => Ok(false),
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure
                    .map(|at| at.elapsed() >= self.config.timeout)
                    .unwrap_or(true);
                if cooled_down {
                    debug!("circuit cooldown elapsed, transitioning to half-open");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    Ok(true)
                } else {
                    Err(BreakerError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                // Exactly one trial call tests recovery.
                if inner.probe_in_flight {
                    Err(BreakerError::CircuitOpen)
                } else {
                    inner.probe_in_flight = true;
                    Ok(true)
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != CircuitState::Closed {
            debug!("circuit closed after successful probe");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.last_failure = None;
        inner.probe_in_flight = false;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        inner.last_failure = Some(Instant::now());
        inner.probe_in_flight = false;

        let should_open = match inner.state {
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if should_open && inner.state != CircuitState::Open {
            warn!(
                consecutive_failures = inner.consecutive_failures,
                "circuit opened, failing fast for {:?}", self.config.timeout
            );
            inner.state = CircuitState::Open;
        }
    }

    /// Release a probe slot without recording an outcome.
    fn release_probe(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.probe_in_flight = false;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

/// Releases the half-open probe slot if the guarded future is dropped
/// before its outcome is recorded (caller-side cancellation).
struct ProbePermit<'a> {
    breaker: &'a CircuitBreaker,
    active: bool,
}

impl ProbePermit<'_> {
    fn settle(mut self) {
        self.active = false;
    }
}

impl Drop for ProbePermit<'_> {
    fn drop(&mut self) {
        if self.active {
            self.breaker.release_probe();
        }
    }
}
