//! Error types for hookguard.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for hookguard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for success or a graceful skip.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code for operational failures.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for usage and configuration errors.
pub const EXIT_USAGE: u8 = 2;

/// Exit code when interrupted (128 + SIGINT).
pub const EXIT_INTERRUPTED: u8 = 130;

/// Errors that can occur in hookguard operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid command-line usage.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Storage I/O error.
    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// State file exists but cannot be decoded.
    #[error("State file {path} is corrupt: {reason}")]
    StateCorruption {
        /// Path of the corrupt file.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// Could not acquire the state file lock in time.
    #[error("Timed out after {waited:?} waiting for lock on {path}")]
    LockContention {
        /// Path of the lock file.
        path: PathBuf,
        /// How long we waited.
        waited: Duration,
    },

    /// Hook input could not be passed to the wrapped command.
    #[error("Subprocess error: {0}")]
    Subprocess(String),

    /// No tracked hook matched the pattern.
    #[error("{}", format_no_match(.pattern, .suggestions))]
    NoMatch {
        /// Pattern given by the user.
        pattern: String,
        /// Similar tracked identities.
        suggestions: Vec<String>,
    },

    /// More than one tracked hook matched the pattern.
    #[error("{}", format_ambiguous(.pattern, .candidates))]
    AmbiguousPattern {
        /// Pattern given by the user.
        pattern: String,
        /// Every identity that matched.
        candidates: Vec<String>,
    },
}

impl Error {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }
}

fn format_no_match(pattern: &str, suggestions: &[String]) -> String {
    let mut msg = format!("No tracked hook matches '{pattern}'");
    if !suggestions.is_empty() {
        msg.push_str("\nDid you mean:");
        for s in suggestions {
            msg.push_str("\n  ");
            msg.push_str(s);
        }
    }
    msg
}

fn format_ambiguous(pattern: &str, candidates: &[String]) -> String {
    let mut msg = format!(
        "Pattern '{pattern}' matches {} hooks; be more specific:",
        candidates.len()
    );
    for c in candidates {
        msg.push_str("\n  ");
        msg.push_str(c);
    }
    msg
}

/// Configuration failure.
///
/// Validation collects every violated field before failing, so a single error
/// can describe several problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or parsed.
    #[error("Configuration error in {source_name}: {message}")]
    Parse {
        /// Which layer failed (file path or "environment").
        source_name: String,
        /// Parser message.
        message: String,
    },

    /// One or more fields are out of range.
    #[error("{}", Violations(.0))]
    Invalid(Vec<FieldViolation>),
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted field path, e.g. `circuit_breaker.failure_threshold`.
    pub field: String,
    /// The offending value as written.
    pub value: String,
    /// What the field accepts.
    pub expected: String,
}

struct Violations<'a>(&'a [FieldViolation]);

impl fmt::Display for Violations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration ({} problem(s)):", self.0.len())?;
        for v in self.0 {
            write!(f, "\n  {} = {} (expected {})", v.field, v.value, v.expected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_usage_exit_code() {
        let err = Error::Config(ConfigError::Invalid(vec![]));
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert_eq!(Error::Usage("x".into()).exit_code(), EXIT_USAGE);
    }

    #[test]
    fn operational_errors_exit_one() {
        let err = Error::NoMatch {
            pattern: "lint".into(),
            suggestions: vec![],
        };
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert_eq!(Error::Subprocess("boom".into()).exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn invalid_config_lists_every_violation() {
        let err = ConfigError::Invalid(vec![
            FieldViolation {
                field: "circuit_breaker.failure_threshold".into(),
                value: "0".into(),
                expected: "1..=100".into(),
            },
            FieldViolation {
                field: "logging.level".into(),
                value: "\"LOUD\"".into(),
                expected: "one of DEBUG, INFO, WARNING, ERROR, CRITICAL".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 problem(s)"));
        assert!(msg.contains("circuit_breaker.failure_threshold = 0 (expected 1..=100)"));
        assert!(msg.contains("logging.level"));
    }

    #[test]
    fn ambiguous_pattern_lists_candidates() {
        let err = Error::AmbiguousPattern {
            pattern: "lint".into(),
            candidates: vec!["npm run lint".into(), "cargo lint".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("matches 2 hooks"));
        assert!(msg.contains("npm run lint"));
        assert!(msg.contains("cargo lint"));
    }

    #[test]
    fn no_match_shows_suggestions() {
        let err = Error::NoMatch {
            pattern: "lnt".into(),
            suggestions: vec!["npm run lint".into()],
        };
        assert!(err.to_string().contains("Did you mean:\n  npm run lint"));
    }
}
