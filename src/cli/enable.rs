//! `hookguard enable` command implementation.

use super::list::ListEntry;
use super::{output, pattern};
use crate::config::Config;
use crate::core::CircuitState;
use crate::error::Result;
use crate::storage::StateStore;
use chrono::{DateTime, Utc};

/// Run the enable command.
///
/// # Errors
///
/// Returns a pattern error when `pattern` does not name exactly one hook.
pub fn run(config: &Config, pattern: &str, force: bool, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let now = Utc::now();
    let changed = enable(&store, pattern, force, now)?;

    if json {
        return output::print_json(&changed);
    }
    match changed.effective_state {
        CircuitState::Closed => println!("Enabled {}", changed.hook),
        _ => println!(
            "Enabled {}; the next run is a recovery trial ({} success(es) needed)",
            changed.hook, config.circuit_breaker.success_threshold
        ),
    }
    Ok(())
}

/// Re-enable the hook matching `pattern`.
///
/// Without `force` an open circuit becomes eligible for a trial right away.
/// With `force` it closes and its streaks are zeroed.
///
/// # Errors
///
/// Returns [`crate::Error::NoMatch`] or [`crate::Error::AmbiguousPattern`],
/// or a storage error.
pub fn enable(
    store: &dyn StateStore,
    pattern: &str,
    force: bool,
    now: DateTime<Utc>,
) -> Result<ListEntry> {
    let snapshot = store.get_all()?;
    let hook = pattern::resolve(pattern, snapshot.hooks.keys())?;
    let history = store.enable(&hook, force, now)?;
    Ok(ListEntry {
        effective_state: history.effective_state(now),
        hook,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::config::CircuitBreakerConfig;
    use crate::storage::MemoryBackend;

    fn opened() -> (MemoryBackend, DateTime<Utc>) {
        let store = MemoryBackend::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        });
        let now = Utc::now();
        store.record_failure("npm run lint", "exit code 1", now).unwrap();
        store.record_success("make test", now).unwrap();
        (store, now)
    }

    #[test]
    fn enable_schedules_immediate_trial() {
        let (store, now) = opened();
        let changed = enable(&store, "lint", false, now).unwrap();
        assert_eq!(changed.effective_state, CircuitState::HalfOpen);
        assert_eq!(changed.history.state, CircuitState::Open);
        assert_eq!(changed.history.retry_after, Some(now));
        assert_eq!(changed.history.consecutive_failures, 1);
    }

    #[test]
    fn force_enable_closes() {
        let (store, now) = opened();
        let changed = enable(&store, "lint", true, now).unwrap();
        assert_eq!(changed.effective_state, CircuitState::Closed);
        assert_eq!(changed.history.consecutive_failures, 0);
        assert!(changed.history.disabled_at.is_none());
        assert!(changed.history.retry_after.is_none());
    }

    #[test]
    fn enable_closed_hook_is_noop() {
        let (store, now) = opened();
        let before = store.get("make test").unwrap();
        enable(&store, "make test", false, now).unwrap();
        assert_eq!(store.get("make test").unwrap(), before);
    }

    #[test]
    fn enable_unknown_hook_is_no_match() {
        let (store, now) = opened();
        assert!(matches!(
            enable(&store, "docker", false, now),
            Err(Error::NoMatch { .. })
        ));
    }
}
