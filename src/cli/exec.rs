//! `hookguard exec` command implementation.
//!
//! The entry point the host calls for every hook event. Whatever goes wrong
//! inside hookguard, the wrapped command still gets to run: a broken config or
//! state file means running unprotected, not blocking the host.

use crate::config::Config;
use crate::core::CircuitBreaker;
use crate::error::{Error, Result};
use crate::hooks::{HookOutput, HookRun, RunOptions, run_command, run_hook};
use std::io::{self, IsTerminal, Read};
use std::time::Duration;
use tracing::{debug, warn};

/// Run the exec command and return the wrapper's exit code.
///
/// `config` is `None` when configuration failed to load; the command then
/// runs without the breaker.
///
/// # Errors
///
/// Returns a usage error for an empty command, or a serialization error if
/// the skip notice cannot be written.
pub fn run(config: Option<&Config>, command: &[String], timeout: Option<u64>) -> Result<u8> {
    let hook_id = hook_identity(command)?;

    let stdin = read_hook_input().unwrap_or_else(|e| {
        warn!(error = %e, "continuing without hook input");
        None
    });
    let mut options = RunOptions {
        stdin,
        ..RunOptions::default()
    };
    if let Some(secs) = timeout {
        options.timeout = Duration::from_secs(secs);
    }

    let Some(config) = config else {
        warn!(hook = %hook_id, "configuration unavailable, running unprotected");
        return Ok(run_command(&hook_id, &options).outcome.exit_code());
    };
    if timeout.is_none() {
        options.timeout = config.execution.timeout();
    }

    let store = match super::open_store(config) {
        Ok(store) => store,
        Err(e) => {
            warn!(hook = %hook_id, error = %e, "state store unavailable, running unprotected");
            return Ok(run_command(&hook_id, &options).outcome.exit_code());
        }
    };

    let breaker = CircuitBreaker::new(&store, &config.circuit_breaker);
    let run = run_hook(&hook_id, &breaker, &options);
    if let HookRun::Skipped(evaluation) = &run {
        let notice = HookOutput::skipped(&hook_id, evaluation.retry_after);
        println!("{}", serde_json::to_string(&notice)?);
    }
    Ok(run.exit_code())
}

/// The store key for a command given as separate arguments.
///
/// # Errors
///
/// Returns a usage error if the command is empty.
pub fn hook_identity(command: &[String]) -> Result<String> {
    let joined = command.join(" ");
    if joined.trim().is_empty() {
        return Err(Error::Usage("exec needs a command to run".to_string()));
    }
    Ok(joined)
}

/// Read the bytes the host piped to us, if any.
fn read_hook_input() -> Result<Option<Vec<u8>>> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = Vec::new();
    stdin
        .read_to_end(&mut buf)
        .map_err(|e| Error::Subprocess(format!("cannot read hook input: {e}")))?;
    debug!(bytes = buf.len(), "read hook input");
    Ok(Some(buf))
}
