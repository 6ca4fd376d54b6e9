//! Shared output formatting for CLI commands.

use crate::core::CircuitState;
use crate::error::Result;
use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

/// Longest command shown in human output.
pub const COMMAND_PREVIEW_LEN: usize = 60;

/// Print a value as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Colored state label for a terminal.
#[must_use]
pub fn state_label(state: CircuitState) -> String {
    let label = format!("{:<9}", state.as_str());
    match state {
        CircuitState::Closed => label
            .if_supports_color(Stream::Stdout, |t| t.green())
            .to_string(),
        CircuitState::Open => label
            .if_supports_color(Stream::Stdout, |t| t.red())
            .to_string(),
        CircuitState::HalfOpen => label
            .if_supports_color(Stream::Stdout, |t| t.yellow())
            .to_string(),
    }
}

/// Dim secondary text.
#[must_use]
pub fn dim(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.dimmed())
        .to_string()
}

/// Bold heading text.
#[must_use]
pub fn bold(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.bold())
        .to_string()
}

/// Shorten a command to `max` characters, first line only.
#[must_use]
pub fn truncate_command(command: &str, max: usize) -> String {
    let first_line = command.lines().next().unwrap_or(command);
    let multi_line = first_line.len() < command.trim_end().len();
    if first_line.chars().count() > max {
        let kept: String = first_line.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else if multi_line {
        format!("{first_line} ...")
    } else {
        first_line.to_string()
    }
}

/// Human-relative time: "5 minutes ago", "in 2 hours", "just now".
#[must_use]
pub fn relative_time(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(t);
    let future = delta.num_seconds() < 0;
    let secs = delta.num_seconds().unsigned_abs();

    if secs < 10 {
        return "just now".to_string();
    }
    let (n, unit) = if secs < 60 {
        (secs, "second")
    } else if secs < 3_600 {
        (secs / 60, "minute")
    } else if secs < 86_400 {
        (secs / 3_600, "hour")
    } else {
        (secs / 86_400, "day")
    };
    let plural = if n == 1 { "" } else { "s" };
    if future {
        format!("in {n} {unit}{plural}")
    } else {
        format!("{n} {unit}{plural} ago")
    }
}

/// Relative time for an optional timestamp.
#[must_use]
pub fn relative_or(t: Option<DateTime<Utc>>, now: DateTime<Utc>, none: &str) -> String {
    t.map_or_else(|| none.to_string(), |t| relative_time(t, now))
}
