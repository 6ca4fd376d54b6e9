//! `hookguard disable` command implementation.

use super::list::ListEntry;
use super::{output, pattern};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::StateStore;
use chrono::{DateTime, Utc};
use tracing::info;

/// Run the disable command.
///
/// # Errors
///
/// Returns [`Error::AmbiguousPattern`] when `pattern` matches several hooks.
pub fn run(config: &Config, pattern: &str, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let changed = disable(&store, pattern, Utc::now())?;

    if json {
        return output::print_json(&changed);
    }
    println!("Disabled {} until `hookguard enable`", changed.hook);
    Ok(())
}

/// Open the circuit of the hook matching `pattern` with no automatic
/// recovery.
///
/// A pattern that matches no tracked hook is taken as an exact command line
/// and a new entry is created for it.
///
/// # Errors
///
/// Returns [`Error::AmbiguousPattern`] or a storage error.
pub fn disable(store: &dyn StateStore, pattern: &str, now: DateTime<Utc>) -> Result<ListEntry> {
    let snapshot = store.get_all()?;
    let hook = match pattern::resolve(pattern, snapshot.hooks.keys()) {
        Ok(hook) => hook,
        Err(Error::NoMatch { .. }) => {
            info!(hook = pattern, "disabling untracked hook");
            pattern.to_string()
        }
        Err(e) => return Err(e),
    };
    let history = store.disable(&hook, now)?;
    Ok(ListEntry {
        effective_state: history.effective_state(now),
        hook,
        history,
    })
}
