//! `hookguard list` command implementation.

use super::output::{self, COMMAND_PREVIEW_LEN};
use crate::config::Config;
use crate::core::{CircuitState, HookExecutionState};
use crate::error::Result;
use crate::storage::StateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// One tracked hook with its effective state.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListEntry {
    /// Command line.
    pub hook: String,
    /// State used for the next decision.
    pub effective_state: CircuitState,
    /// Stored history.
    #[serde(flatten)]
    pub history: HookExecutionState,
}

/// Run the list command.
///
/// Shows every tracked hook with its full state.
///
/// # Errors
///
/// Returns an error if the state cannot be read.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let now = Utc::now();
    let entries = list(&store, now)?;

    if json {
        return output::print_json(&entries);
    }

    if entries.is_empty() {
        println!("No hooks tracked yet.");
        println!("\nState is stored in: {}", config.state_file.display());
        return Ok(());
    }

    print!("{}", render(&entries, now));
    Ok(())
}

/// Every tracked hook, ordered by command line.
///
/// # Errors
///
/// Returns an error if the state cannot be read.
pub fn list(store: &dyn StateStore, now: DateTime<Utc>) -> Result<Vec<ListEntry>> {
    Ok(store
        .get_all()?
        .hooks
        .into_iter()
        .map(|(hook, history)| ListEntry {
            effective_state: history.effective_state(now),
            hook,
            history,
        })
        .collect())
}

/// Human-readable listing.
#[must_use]
pub fn render(entries: &[ListEntry], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<9} {:>6} {:>6} {:>7}  Command", "State", "Runs", "Fails", "Rate");
    let _ = writeln!(out, "{}", "─".repeat(90));

    for entry in entries {
        let h = &entry.history;
        let _ = writeln!(
            out,
            "{} {:>6} {:>6} {:>6.1}%  {}",
            output::state_label(entry.effective_state),
            h.total_executions,
            h.total_failures,
            h.failure_rate(),
            output::truncate_command(&entry.hook, COMMAND_PREVIEW_LEN)
        );
        let _ = writeln!(out, "          {}", output::dim(&detail_line(h, now)));
        if entry.effective_state != CircuitState::Closed {
            let _ = writeln!(out, "          {}", output::dim(&open_line(h, now)));
        }
        if let Some(error) = &h.last_error {
            let _ = writeln!(
                out,
                "          {}",
                output::dim(&format!(
                    "last error: {}",
                    output::truncate_command(error, COMMAND_PREVIEW_LEN)
                ))
            );
        }
    }

    let _ = writeln!(out, "{}", "─".repeat(90));
    let _ = writeln!(out, "Showing {} hook(s)", entries.len());
    out
}

fn detail_line(h: &HookExecutionState, now: DateTime<Utc>) -> String {
    format!(
        "streak: {} failure(s), {} trial success(es); last success {}, last failure {}",
        h.consecutive_failures,
        h.consecutive_successes,
        output::relative_or(h.last_success_at, now, "never"),
        output::relative_or(h.last_failure_at, now, "never"),
    )
}

fn open_line(h: &HookExecutionState, now: DateTime<Utc>) -> String {
    let retry = h.retry_after.map_or_else(
        || "until enabled".to_string(),
        |t| {
            if t <= now {
                "trial on next run".to_string()
            } else {
                format!("retry {}", output::relative_time(t, now))
            }
        },
    );
    format!(
        "disabled {}, {retry}",
        output::relative_or(h.disabled_at, now, "by hand")
    )
}
