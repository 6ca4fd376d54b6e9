//! `hookguard reset` command implementation.

use super::{output, pattern};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::StateStore;
use serde::Serialize;

/// Hooks whose history was forgotten.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResetSummary {
    /// Command lines that were removed.
    pub reset: Vec<String>,
}

/// Run the reset command.
///
/// Exactly one of `pattern` and `all` must be given.
///
/// # Errors
///
/// Returns a usage error when neither or both targets are given, and a
/// pattern error when it does not name exactly one hook.
pub fn run(config: &Config, pattern: Option<&str>, all: bool, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let summary = match (pattern, all) {
        (Some(p), false) => reset_one(&store, p)?,
        (None, true) => reset_all(&store)?,
        _ => {
            return Err(Error::Usage(
                "reset needs either a pattern or --all".to_string(),
            ));
        }
    };

    if json {
        return output::print_json(&summary);
    }
    match summary.reset.as_slice() {
        [] => println!("No hooks to reset."),
        [one] => println!("Reset {one}"),
        many => println!("Reset {} hooks.", many.len()),
    }
    Ok(())
}

/// Forget the one hook matching `pattern`. Nothing changes unless the pattern
/// resolves.
///
/// # Errors
///
/// Returns [`Error::NoMatch`] or [`Error::AmbiguousPattern`], or a storage
/// error.
pub fn reset_one(store: &dyn StateStore, pattern: &str) -> Result<ResetSummary> {
    let snapshot = store.get_all()?;
    let hook = pattern::resolve(pattern, snapshot.hooks.keys())?;
    let existed = store.reset_one(&hook)?;
    Ok(ResetSummary {
        reset: if existed { vec![hook] } else { Vec::new() },
    })
}

/// Forget every hook. Global counters are kept.
///
/// # Errors
///
/// Returns an error if the storage operation fails.
pub fn reset_all(store: &dyn StateStore) -> Result<ResetSummary> {
    let hooks: Vec<String> = store.get_all()?.hooks.into_keys().collect();
    store.reset_all()?;
    Ok(ResetSummary { reset: hooks })
}
