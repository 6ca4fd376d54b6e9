//! Hook state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current on-disk schema version.
pub const STATE_VERSION: u32 = 1;

/// Circuit breaker state of a single hook.
///
/// Only `Closed` and `Open` are ever persisted. `HalfOpen` is computed from
/// `retry_after` at decision time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Hook runs normally.
    #[default]
    Closed,
    /// Hook is blocked until its cooldown passes.
    Open,
    /// Cooldown passed; the next run is a recovery trial.
    HalfOpen,
}

impl CircuitState {
    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

/// Execution history of a single hook, keyed by its command line.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HookExecutionState {
    /// Persisted circuit state (`Closed` or `Open`).
    pub state: CircuitState,

    /// Failures since the last success.
    pub consecutive_failures: u32,

    /// Successful recovery trials since the circuit opened.
    pub consecutive_successes: u32,

    /// Lifetime failure count.
    pub total_failures: u64,

    /// Lifetime execution count.
    pub total_executions: u64,

    /// Error text of the most recent failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// When the hook last succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,

    /// When the hook last failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,

    /// When the circuit opened. Set only while open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<DateTime<Utc>>,

    /// Earliest time for a recovery trial. `None` while open means the hook
    /// was disabled by hand and waits for `enable`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}

impl HookExecutionState {
    /// The state used for decisions at `now`.
    #[must_use]
    pub fn effective_state(&self, now: DateTime<Utc>) -> CircuitState {
        match self.state {
            CircuitState::Closed => CircuitState::Closed,
            CircuitState::Open | CircuitState::HalfOpen => match self.retry_after {
                Some(retry_after) if now >= retry_after => CircuitState::HalfOpen,
                _ => CircuitState::Open,
            },
        }
    }

    /// Whether the persisted state is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, CircuitState::Open | CircuitState::HalfOpen)
    }

    /// Whether this entry is indistinguishable from a brand new hook.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        *self == Self::default()
    }

    /// Failure rate over the hook's lifetime, as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_executions as f64 * 100.0
        }
    }
}

/// Aggregate counters across all hooks.
///
/// Kept separately from the per-hook entries; resetting hooks leaves these
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalStats {
    /// Total recorded executions.
    pub total_executions: u64,

    /// Total recorded failures.
    pub total_failures: u64,

    /// Number of times any hook was disabled.
    pub hooks_disabled: u64,

    /// When any counter last changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Full contents of the state file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Per-hook entries keyed by command line.
    #[serde(default)]
    pub hooks: BTreeMap<String, HookExecutionState>,

    /// Aggregate counters.
    #[serde(default)]
    pub global_stats: GlobalStats,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            hooks: BTreeMap::new(),
            global_stats: GlobalStats::default(),
        }
    }
}

impl StateSnapshot {
    /// Hooks whose persisted state is open.
    pub fn open_hooks(&self) -> impl Iterator<Item = (&String, &HookExecutionState)> {
        self.hooks.iter().filter(|(_, h)| h.is_open())
    }
}

/// Result of recording an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// The hook's entry after the update.
    pub state: HookExecutionState,

    /// Whether the circuit changed state (opened, closed, or re-opened after
    /// a failed trial).
    pub transitioned: bool,
}
