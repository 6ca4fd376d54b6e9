//! Storage trait definitions.

use crate::core::{HookExecutionState, Recorded, StateSnapshot};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Shared store of per-hook execution history.
///
/// Every mutating method is one atomic read-modify-write: implementations
/// must make concurrent calls on the same hook linearizable.
pub trait StateStore: Send + Sync {
    /// Get a hook's entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get(&self, hook_id: &str) -> Result<Option<HookExecutionState>>;

    /// Get every entry plus the global counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get_all(&self) -> Result<StateSnapshot>;

    /// Record a successful execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn record_success(&self, hook_id: &str, now: DateTime<Utc>) -> Result<Recorded>;

    /// Record a failed execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn record_failure(&self, hook_id: &str, error: &str, now: DateTime<Utc>) -> Result<Recorded>;

    /// Forget a hook. Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn reset_one(&self, hook_id: &str) -> Result<bool>;

    /// Forget every hook. Returns how many entries were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn reset_all(&self) -> Result<usize>;

    /// Re-enable a hook by hand; see [`crate::core::circuit_breaker::apply_enable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn enable(&self, hook_id: &str, force: bool, now: DateTime<Utc>) -> Result<HookExecutionState>;

    /// Disable a hook by hand, creating its entry if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn disable(&self, hook_id: &str, now: DateTime<Utc>) -> Result<HookExecutionState>;
}
