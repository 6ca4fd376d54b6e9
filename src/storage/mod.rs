//! Storage backends for hook state.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use traits::StateStore;

use crate::config::CircuitBreakerConfig;
use crate::core::circuit_breaker::{apply_disable, apply_enable, apply_failure, apply_success};
use crate::core::{HookExecutionState, Recorded, StateSnapshot};
use chrono::{DateTime, Utc};

// Transitions shared by every backend. Callers hold the backend's lock.

fn record_success(
    snapshot: &mut StateSnapshot,
    hook_id: &str,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> Recorded {
    let hook = snapshot.hooks.entry(hook_id.to_string()).or_default();
    let transitioned = apply_success(hook, &mut snapshot.global_stats, config, now);
    Recorded {
        state: hook.clone(),
        transitioned,
    }
}

fn record_failure(
    snapshot: &mut StateSnapshot,
    hook_id: &str,
    error: &str,
    config: &CircuitBreakerConfig,
    now: DateTime<Utc>,
) -> Recorded {
    let hook = snapshot.hooks.entry(hook_id.to_string()).or_default();
    let transitioned = apply_failure(hook, &mut snapshot.global_stats, error, config, now);
    Recorded {
        state: hook.clone(),
        transitioned,
    }
}

fn enable(
    snapshot: &mut StateSnapshot,
    hook_id: &str,
    force: bool,
    now: DateTime<Utc>,
) -> HookExecutionState {
    match snapshot.hooks.get_mut(hook_id) {
        Some(hook) => {
            apply_enable(hook, force, now);
            snapshot.global_stats.last_updated = Some(now);
            hook.clone()
        }
        None => HookExecutionState::default(),
    }
}

fn disable(snapshot: &mut StateSnapshot, hook_id: &str, now: DateTime<Utc>) -> HookExecutionState {
    let hook = snapshot.hooks.entry(hook_id.to_string()).or_default();
    apply_disable(hook, &mut snapshot.global_stats, now);
    hook.clone()
}
