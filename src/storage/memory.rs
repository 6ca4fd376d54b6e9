//! In-memory storage backend for testing.

use crate::config::CircuitBreakerConfig;
use crate::core::{HookExecutionState, Recorded, StateSnapshot};
use crate::error::Result;
use crate::storage::traits::StateStore;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory storage backend with the same transition semantics as
/// [`crate::storage::FileBackend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    config: CircuitBreakerConfig,
    snapshot: Mutex<StateSnapshot>,
}

impl MemoryBackend {
    /// Create a new in-memory backend.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            snapshot: Mutex::new(StateSnapshot::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryBackend {
    fn get(&self, hook_id: &str) -> Result<Option<HookExecutionState>> {
        Ok(self.lock().hooks.get(hook_id).cloned())
    }

    fn get_all(&self) -> Result<StateSnapshot> {
        Ok(self.lock().clone())
    }

    fn record_success(&self, hook_id: &str, now: DateTime<Utc>) -> Result<Recorded> {
        Ok(super::record_success(&mut self.lock(), hook_id, &self.config, now))
    }

    fn record_failure(&self, hook_id: &str, error: &str, now: DateTime<Utc>) -> Result<Recorded> {
        Ok(super::record_failure(
            &mut self.lock(),
            hook_id,
            error,
            &self.config,
            now,
        ))
    }

    fn reset_one(&self, hook_id: &str) -> Result<bool> {
        Ok(self.lock().hooks.remove(hook_id).is_some())
    }

    fn reset_all(&self) -> Result<usize> {
        let mut snapshot = self.lock();
        let removed = snapshot.hooks.len();
        snapshot.hooks.clear();
        Ok(removed)
    }

    fn enable(&self, hook_id: &str, force: bool, now: DateTime<Utc>) -> Result<HookExecutionState> {
        Ok(super::enable(&mut self.lock(), hook_id, force, now))
    }

    fn disable(&self, hook_id: &str, now: DateTime<Utc>) -> Result<HookExecutionState> {
        Ok(super::disable(&mut self.lock(), hook_id, now))
    }
}
