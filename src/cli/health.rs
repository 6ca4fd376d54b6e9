//! `hookguard health` command implementation.

use super::output::{self, COMMAND_PREVIEW_LEN};
use crate::config::Config;
use crate::core::{CircuitState, StateSnapshot};
use crate::error::Result;
use crate::storage::StateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Overall verdict.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every tracked hook is closed.
    Healthy,
    /// At least one hook is open or half-open.
    Degraded,
}

/// A hook with an open circuit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisabledHook {
    /// Command line.
    pub hook: String,
    /// Effective state.
    pub state: CircuitState,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Most recent error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When the circuit opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<DateTime<Utc>>,
    /// Earliest recovery trial. Absent for hooks disabled by hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}

/// Summary of the breaker's view of all hooks.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    /// Overall verdict.
    pub status: HealthStatus,
    /// Hooks with stored state.
    pub tracked_hooks: usize,
    /// Hooks that run normally.
    pub closed: usize,
    /// Hooks skipped until their cooldown ends or they are enabled.
    pub open: usize,
    /// Open hooks whose next run is a recovery trial.
    pub half_open: usize,
    /// Executions recorded across all hooks.
    pub total_executions: u64,
    /// Failed executions recorded across all hooks.
    pub total_failures: u64,
    /// Percentage of recorded executions that failed.
    pub failure_rate: f64,
    /// CLOSED to OPEN transitions ever recorded.
    pub hooks_disabled: u64,
    /// Time of the most recent state change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Every hook that is not closed, ordered by command line.
    pub disabled: Vec<DisabledHook>,
}

/// Run the health command.
///
/// # Errors
///
/// Returns an error if the state cannot be read.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let now = Utc::now();
    let report = health(&store, now)?;

    if json {
        output::print_json(&report)
    } else {
        print!("{}", render(&report, now));
        Ok(())
    }
}

/// Build the report from a store.
///
/// # Errors
///
/// Returns an error if the state cannot be read.
pub fn health(store: &dyn StateStore, now: DateTime<Utc>) -> Result<HealthReport> {
    Ok(build_report(&store.get_all()?, now))
}

/// Build the report from a snapshot.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn build_report(snapshot: &StateSnapshot, now: DateTime<Utc>) -> HealthReport {
    let (mut closed, mut open, mut half_open) = (0, 0, 0);
    let mut disabled = Vec::new();

    for (id, hook) in &snapshot.hooks {
        let state = hook.effective_state(now);
        match state {
            CircuitState::Closed => closed += 1,
            CircuitState::Open => open += 1,
            CircuitState::HalfOpen => half_open += 1,
        }
        if state != CircuitState::Closed {
            disabled.push(DisabledHook {
                hook: id.clone(),
                state,
                consecutive_failures: hook.consecutive_failures,
                last_error: hook.last_error.clone(),
                disabled_at: hook.disabled_at,
                retry_after: hook.retry_after,
            });
        }
    }

    let stats = &snapshot.global_stats;
    let failure_rate = if stats.total_executions == 0 {
        0.0
    } else {
        stats.total_failures as f64 / stats.total_executions as f64 * 100.0
    };

    HealthReport {
        status: if disabled.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        tracked_hooks: snapshot.hooks.len(),
        closed,
        open,
        half_open,
        total_executions: stats.total_executions,
        total_failures: stats.total_failures,
        failure_rate,
        hooks_disabled: stats.hooks_disabled,
        last_updated: stats.last_updated,
        disabled,
    }
}

/// Human-readable report.
#[must_use]
pub fn render(report: &HealthReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let status = match report.status {
        HealthStatus::Healthy => output::state_label(CircuitState::Closed),
        HealthStatus::Degraded => output::state_label(CircuitState::Open),
    };
    let verdict = match report.status {
        HealthStatus::Healthy => "all hooks healthy",
        HealthStatus::Degraded => "some hooks disabled",
    };

    let _ = writeln!(out, "{} {status} {verdict}", output::bold("Status:"));
    let _ = writeln!(
        out,
        "Hooks:  {} tracked, {} closed, {} open, {} half-open",
        report.tracked_hooks, report.closed, report.open, report.half_open
    );
    let _ = writeln!(
        out,
        "Runs:   {} total, {} failed ({:.1}%)",
        report.total_executions, report.total_failures, report.failure_rate
    );
    let _ = writeln!(
        out,
        "Circuits opened: {}   Last update: {}",
        report.hooks_disabled,
        output::relative_or(report.last_updated, now, "never")
    );

    if report.disabled.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\n{}", output::bold("Disabled hooks"));
    let _ = writeln!(out, "{}", "─".repeat(90));
    for hook in &report.disabled {
        let _ = writeln!(
            out,
            "{} {}",
            output::state_label(hook.state),
            output::truncate_command(&hook.hook, COMMAND_PREVIEW_LEN)
        );
        let retry = match (hook.state, hook.retry_after) {
            (_, None) => "manual enable required".to_string(),
            (CircuitState::HalfOpen, Some(_)) => "retry on next run".to_string(),
            (_, Some(t)) => format!("retry {}", output::relative_time(t, now)),
        };
        let _ = writeln!(
            out,
            "          {}",
            output::dim(&format!(
                "disabled {}, {} consecutive failure(s), {retry}",
                output::relative_or(hook.disabled_at, now, "by hand"),
                hook.consecutive_failures
            ))
        );
        if let Some(error) = &hook.last_error {
            let _ = writeln!(
                out,
                "          {}",
                output::dim(&output::truncate_command(error, COMMAND_PREVIEW_LEN))
            );
        }
    }
    let _ = writeln!(out, "{}", "─".repeat(90));
    out
}
