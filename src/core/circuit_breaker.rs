//! Circuit breaker state machine.
//!
//! A hook's circuit opens after `failure_threshold` consecutive failures and
//! stays open for `cooldown_seconds`. Once the cooldown has passed the next
//! run is a recovery trial (half-open): `success_threshold` trial successes
//! close the circuit, a single trial failure re-opens it with a fresh
//! cooldown.
//!
//! The transition functions here are pure; storage backends call them inside
//! their locked read-modify-write section.

use crate::config::CircuitBreakerConfig;
use crate::core::state::{CircuitState, GlobalStats, HookExecutionState};
use crate::storage::StateStore;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// Lower bound on the time between opening and the first trial.
///
/// Keeps `cooldown_seconds = 0` from turning every failure into an immediate
/// retry.
pub const MIN_TRIAL_INTERVAL_SECONDS: i64 = 1;

/// What the wrapper should do with a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// Run the hook.
    Execute,
    /// Do not run the hook; report success to the host.
    SkipGracefully,
}

/// Why a decision was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// The breaker is turned off in configuration.
    BreakerDisabled,
    /// The hook is on the exclude list.
    Excluded,
    /// The circuit is closed.
    Closed,
    /// Cooldown has passed; this run is a recovery trial.
    RecoveryTrial,
    /// The circuit is open and cooling down.
    CoolingDown,
    /// The hook was disabled by hand.
    ManuallyDisabled,
    /// Stored state could not be read; failing open.
    StoreUnavailable,
}

/// A decision with the context that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// Run or skip.
    pub decision: ExecutionDecision,
    /// Effective circuit state at decision time.
    pub state: CircuitState,
    /// Why.
    pub reason: DecisionReason,
    /// When the next trial is allowed, for open circuits.
    pub retry_after: Option<DateTime<Utc>>,
}

impl Evaluation {
    fn execute(state: CircuitState, reason: DecisionReason) -> Self {
        Self {
            decision: ExecutionDecision::Execute,
            state,
            reason,
            retry_after: None,
        }
    }
}

/// Decide whether a hook may run, given its stored entry.
#[must_use]
pub fn evaluate(
    hook_id: &str,
    hook: Option<&HookExecutionState>,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> Evaluation {
    if config.is_excluded(hook_id) {
        return Evaluation::execute(CircuitState::Closed, DecisionReason::Excluded);
    }

    let state = hook.map_or(CircuitState::Closed, |h| h.effective_state(now));

    if !config.enabled {
        return Evaluation::execute(state, DecisionReason::BreakerDisabled);
    }

    match state {
        CircuitState::Closed => Evaluation::execute(state, DecisionReason::Closed),
        CircuitState::HalfOpen => Evaluation::execute(state, DecisionReason::RecoveryTrial),
        CircuitState::Open => {
            let retry_after = hook.and_then(|h| h.retry_after);
            Evaluation {
                decision: ExecutionDecision::SkipGracefully,
                state,
                reason: if retry_after.is_some() {
                    DecisionReason::CoolingDown
                } else {
                    DecisionReason::ManuallyDisabled
                },
                retry_after,
            }
        }
    }
}

/// When a circuit opened at `now` may first be retried.
#[must_use]
pub fn next_retry(config: &CircuitBreakerConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    now + config
        .cooldown()
        .max(Duration::seconds(MIN_TRIAL_INTERVAL_SECONDS))
}

/// Apply a successful execution. Returns whether the circuit closed.
pub fn apply_success(
    hook: &mut HookExecutionState,
    stats: &mut GlobalStats,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> bool {
    hook.total_executions += 1;
    hook.last_success_at = Some(now);
    stats.total_executions += 1;
    stats.last_updated = Some(now);

    match hook.effective_state(now) {
        CircuitState::Closed => {
            hook.consecutive_failures = 0;
            false
        }
        CircuitState::HalfOpen => {
            hook.consecutive_successes += 1;
            if hook.consecutive_successes >= config.success_threshold {
                close(hook);
                true
            } else {
                false
            }
        }
        // A run that started before the circuit opened; not a trial.
        CircuitState::Open => false,
    }
}

/// Apply a failed execution. Returns whether the circuit opened or re-opened.
pub fn apply_failure(
    hook: &mut HookExecutionState,
    stats: &mut GlobalStats,
    error: &str,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> bool {
    hook.total_executions += 1;
    hook.total_failures += 1;
    hook.consecutive_failures = hook.consecutive_failures.saturating_add(1);
    hook.last_error = Some(error.to_string());
    hook.last_failure_at = Some(now);
    stats.total_executions += 1;
    stats.total_failures += 1;
    stats.last_updated = Some(now);

    match hook.effective_state(now) {
        CircuitState::Closed => {
            hook.consecutive_successes = 0;
            if hook.consecutive_failures >= config.failure_threshold {
                hook.state = CircuitState::Open;
                hook.disabled_at = Some(now);
                hook.retry_after = Some(next_retry(config, now));
                stats.hooks_disabled += 1;
                true
            } else {
                false
            }
        }
        CircuitState::HalfOpen => {
            // One failed trial is enough; the cooldown restarts from now.
            hook.state = CircuitState::Open;
            hook.consecutive_successes = 0;
            hook.retry_after = Some(next_retry(config, now));
            true
        }
        CircuitState::Open => false,
    }
}

/// Re-enable a hook by hand.
///
/// With `force` the circuit closes immediately. Otherwise the cooldown is cut
/// short and the next run is a recovery trial.
pub fn apply_enable(hook: &mut HookExecutionState, force: bool, now: DateTime<Utc>) {
    if force {
        close(hook);
    } else if hook.is_open() {
        hook.retry_after = Some(now);
    }
}

/// Disable a hook by hand. It stays open until enabled.
pub fn apply_disable(hook: &mut HookExecutionState, stats: &mut GlobalStats, now: DateTime<Utc>) {
    if !hook.is_open() {
        hook.state = CircuitState::Open;
        hook.disabled_at = Some(now);
        stats.hooks_disabled += 1;
        stats.last_updated = Some(now);
    }
    hook.consecutive_successes = 0;
    hook.retry_after = None;
}

fn close(hook: &mut HookExecutionState) {
    hook.state = CircuitState::Closed;
    hook.consecutive_failures = 0;
    hook.consecutive_successes = 0;
    hook.disabled_at = None;
    hook.retry_after = None;
}

/// Circuit breaker bound to a store and configuration.
pub struct CircuitBreaker<'a> {
    store: &'a dyn StateStore,
    config: &'a CircuitBreakerConfig,
}

impl<'a> CircuitBreaker<'a> {
    /// Create a breaker over `store`.
    #[must_use]
    pub fn new(store: &'a dyn StateStore, config: &'a CircuitBreakerConfig) -> Self {
        Self { store, config }
    }

    /// Decide whether `hook_id` may run at `now`.
    ///
    /// Store errors fail open.
    #[must_use]
    pub fn evaluate(&self, hook_id: &str, now: DateTime<Utc>) -> Evaluation {
        if self.config.is_excluded(hook_id) {
            return Evaluation::execute(CircuitState::Closed, DecisionReason::Excluded);
        }
        match self.store.get(hook_id) {
            Ok(hook) => evaluate(hook_id, hook.as_ref(), self.config, now),
            Err(e) => {
                warn!(hook = hook_id, error = %e, "state unavailable, allowing execution");
                Evaluation::execute(CircuitState::Closed, DecisionReason::StoreUnavailable)
            }
        }
    }

    /// Shorthand for `evaluate(..).decision`.
    #[must_use]
    pub fn should_execute(&self, hook_id: &str, now: DateTime<Utc>) -> ExecutionDecision {
        self.evaluate(hook_id, now).decision
    }

    /// Record an outcome, logging transitions. Store errors are logged and
    /// swallowed.
    pub fn record(&self, hook_id: &str, outcome: Result<(), &str>, now: DateTime<Utc>) {
        let recorded = match outcome {
            Ok(()) => self.store.record_success(hook_id, now),
            Err(error) => self.store.record_failure(hook_id, error, now),
        };
        match recorded {
            Ok(r) if r.transitioned => match r.state.state {
                CircuitState::Closed => info!(hook = hook_id, "hook recovered, circuit closed"),
                _ => warn!(
                    hook = hook_id,
                    failures = r.state.consecutive_failures,
                    retry_after = ?r.state.retry_after,
                    "hook disabled, circuit open"
                ),
            },
            Ok(_) => {}
            Err(e) => warn!(hook = hook_id, error = %e, "failed to record hook outcome"),
        }
    }
}
