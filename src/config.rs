//! Configuration loading and management.
//!
//! Configuration is resolved once, from three layers merged as TOML tables:
//! 1. Environment variables (`HOOKGUARD_*`)
//! 2. Config file (`~/.hookguard/config.toml`)
//! 3. Defaults
//!
//! Nested tables merge key by key; scalars and arrays replace. The merged
//! table is then validated field by field into [`Config`], collecting every
//! violation before failing.

use crate::error::{ConfigError, Error, FieldViolation, Result};
use chrono::Duration;
use serde::Serialize;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "HOOKGUARD_";

/// Environment variables with the prefix that are not config keys.
const RESERVED_ENV: &[&str] = &["HOOKGUARD_CONFIG", "HOOKGUARD_HOME"];

/// Multi-word key segments that must not be split on `_`.
const COMPOUND_SEGMENTS: &[&str] = &[
    "circuit_breaker",
    "failure_threshold",
    "cooldown_seconds",
    "success_threshold",
    "state_file",
    "timeout_seconds",
];

/// Keys whose environment value is a list.
const LIST_KEYS: &[&str] = &["exclude"];

/// Keys whose environment value is always taken verbatim as a string.
const STRING_KEYS: &[&str] = &["state_file", "file", "level"];

const FAILURE_THRESHOLD_RANGE: RangeInclusive<i64> = 1..=100;
const SUCCESS_THRESHOLD_RANGE: RangeInclusive<i64> = 1..=100;
const MAX_COOLDOWN_SECONDS: u64 = 86_400;
const COOLDOWN_RANGE: RangeInclusive<i64> = 0..=86_400;
const TIMEOUT_RANGE: RangeInclusive<i64> = 1..=3_600;

/// The documented default config file, written by `hookguard config --init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# hookguard configuration
#
# Every key can be overridden from the environment, e.g.
#   HOOKGUARD_CIRCUIT_BREAKER_FAILURE_THRESHOLD=5
#   HOOKGUARD_LOGGING_LEVEL=DEBUG

# Where hook history is kept. Supports ~ and $VAR.
# state_file = "~/.hookguard/state.json"

[circuit_breaker]
# Set to false to always run hooks (history is still recorded).
enabled = true
# Consecutive failures before a hook is disabled (1-100).
failure_threshold = 3
# Seconds a disabled hook waits before a recovery trial (0-86400).
cooldown_seconds = 300
# Successful trials needed to re-enable a hook (1-100).
success_threshold = 1
# Commands that are never disabled. Entries containing * or ? are globs.
exclude = []

[logging]
# Log file; logs go to stderr when unset.
# file = "~/.hookguard/hookguard.log"
# DEBUG, INFO, WARNING, ERROR or CRITICAL.
level = "WARNING"

[execution]
# Seconds before a hung hook is killed (1-3600).
timeout_seconds = 60
"#;

/// Main configuration struct. Built only by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Path of the shared state file.
    pub state_file: PathBuf,

    /// Circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Subprocess execution configuration.
    pub execution: ExecutionConfig,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerConfig {
    /// When false every hook runs; outcomes are still recorded.
    pub enabled: bool,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before a recovery trial.
    pub cooldown_seconds: u64,

    /// Consecutive trial successes that close the circuit.
    pub success_threshold: u32,

    /// Hook identities that always run.
    pub exclude: BTreeSet<String>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            cooldown_seconds: 300,
            success_threshold: 1,
            exclude: BTreeSet::new(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Cooldown as a chrono duration.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        let secs = self.cooldown_seconds.min(MAX_COOLDOWN_SECONDS);
        Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }

    /// Whether a hook is on the exclude list.
    ///
    /// Entries match exactly; entries containing `*`, `?` or `[` are also
    /// tried as glob patterns.
    #[must_use]
    pub fn is_excluded(&self, hook_id: &str) -> bool {
        if self.exclude.contains(hook_id) {
            return true;
        }
        self.exclude
            .iter()
            .filter(|e| e.contains(['*', '?', '[']))
            .filter_map(|e| glob::Pattern::new(e).ok())
            .any(|p| p.matches(hook_id))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct LoggingConfig {
    /// Log file. Logs go to stderr when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Minimum level written.
    pub level: LogLevel,
}

/// Log level names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Everything.
    Debug,
    /// Skips and transitions.
    Info,
    /// Recoverable problems (default).
    #[default]
    Warning,
    /// Failures.
    Error,
    /// Treated as `Error` by the subscriber.
    Critical,
}

impl LogLevel {
    const NAMES: &'static str = "one of DEBUG, INFO, WARNING, ERROR, CRITICAL";

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// The equivalent `tracing` level.
    #[must_use]
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }
}

/// Subprocess execution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionConfig {
    /// Seconds before the wrapped command is killed.
    pub timeout_seconds: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
        }
    }
}

impl ExecutionConfig {
    /// Timeout as a std duration.
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// Get the hookguard home directory.
///
/// Uses `HOOKGUARD_HOME` if set, otherwise `~/.hookguard`.
#[must_use]
pub fn hookguard_home() -> PathBuf {
    if let Ok(home) = env::var("HOOKGUARD_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir().map_or_else(|| PathBuf::from(".hookguard"), |h| h.join(".hookguard"))
}

/// Get the path to the config file.
///
/// An explicit path wins, then `HOOKGUARD_CONFIG`, then the home directory.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var("HOOKGUARD_CONFIG") {
        return PathBuf::from(path);
    }
    hookguard_home().join("config.toml")
}

/// Load configuration from the process environment.
///
/// # Errors
///
/// Returns [`Error::Config`] if any layer fails to parse or any field is
/// invalid.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let path = config_path(explicit_path);
    let file = if path.exists() { Some(path.as_path()) } else { None };
    resolve(file, env::vars())
}

/// Resolve configuration from an optional file and a set of environment
/// variables.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or parsed, or if
/// validation fails.
pub fn resolve<I>(file: Option<&Path>, vars: I) -> Result<Config>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut merged = defaults_layer();

    if let Some(path) = file {
        let contents = fs::read_to_string(path).map_err(|e| parse_error(path, &e))?;
        let table: Table = toml::from_str(&contents).map_err(|e| parse_error(path, &e))?;
        merge(&mut merged, table);
    }

    merge(&mut merged, env_layer(vars));

    validate(&merged).map_err(Error::from)
}

/// Write the documented default config file.
///
/// # Errors
///
/// Returns a usage error if the file exists and `force` is false, or a
/// storage error if it cannot be written.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Usage(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML)?;
    Ok(())
}

fn parse_error(path: &Path, err: &dyn std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        source_name: path.display().to_string(),
        message: err.to_string(),
    }
}

fn defaults_layer() -> Table {
    let cb = CircuitBreakerConfig::default();
    let mut circuit_breaker = Table::new();
    circuit_breaker.insert("enabled".into(), Value::Boolean(cb.enabled));
    circuit_breaker.insert(
        "failure_threshold".into(),
        Value::Integer(cb.failure_threshold.into()),
    );
    circuit_breaker.insert(
        "cooldown_seconds".into(),
        Value::Integer(i64::try_from(cb.cooldown_seconds).unwrap_or(i64::MAX)),
    );
    circuit_breaker.insert(
        "success_threshold".into(),
        Value::Integer(cb.success_threshold.into()),
    );
    circuit_breaker.insert("exclude".into(), Value::Array(Vec::new()));

    let mut logging = Table::new();
    logging.insert("level".into(), Value::String("WARNING".into()));

    let mut execution = Table::new();
    execution.insert(
        "timeout_seconds".into(),
        Value::Integer(i64::try_from(ExecutionConfig::default().timeout_seconds).unwrap_or(60)),
    );

    let mut root = Table::new();
    root.insert(
        "state_file".into(),
        Value::String(hookguard_home().join("state.json").display().to_string()),
    );
    root.insert("circuit_breaker".into(), Value::Table(circuit_breaker));
    root.insert("logging".into(), Value::Table(logging));
    root.insert("execution".into(), Value::Table(execution));
    root
}

/// Deep-merge `overlay` into `base`.
fn merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        if let Value::Table(incoming) = value {
            if let Some(Value::Table(existing)) = base.get_mut(&key) {
                merge(existing, incoming);
                continue;
            }
            base.insert(key, Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

/// Build a table from `HOOKGUARD_*` variables.
fn env_layer<I>(vars: I) -> Table
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut root = Table::new();
    'vars: for (name, raw) in vars {
        if RESERVED_ENV.contains(&name.as_str()) {
            continue;
        }
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments = split_env_key(rest);
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };

        let mut table = &mut root;
        for segment in parents {
            let entry = table
                .entry(segment.clone())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(next) = entry else {
                continue 'vars;
            };
            table = next;
        }
        table.insert(leaf.clone(), parse_env_value(leaf, &raw));
    }
    root
}

/// Split an environment key into config path segments, keeping known compound
/// segments whole.
fn split_env_key(key: &str) -> Vec<String> {
    let lower = key.to_ascii_lowercase();
    let tokens: Vec<&str> = lower.split('_').filter(|t| !t.is_empty()).collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let compound = COMPOUND_SEGMENTS.iter().find_map(|c| {
            let width = c.split('_').count();
            (i + width <= tokens.len() && tokens[i..i + width].join("_") == *c)
                .then_some((*c, width))
        });
        match compound {
            Some((name, width)) => {
                segments.push(name.to_string());
                i += width;
            }
            None => {
                segments.push(tokens[i].to_string());
                i += 1;
            }
        }
    }
    segments
}

fn parse_env_value(leaf: &str, raw: &str) -> Value {
    if STRING_KEYS.contains(&leaf) {
        return Value::String(raw.to_string());
    }
    let trimmed = raw.trim();
    if let Some(array) = parse_toml_array(trimmed) {
        return array;
    }
    if LIST_KEYS.contains(&leaf) {
        return Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        );
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Integer(n);
    }
    if trimmed.contains(|c: char| c.is_ascii_digit()) {
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
    }
    Value::String(raw.to_string())
}

/// Parse `[...]` as a TOML array.
fn parse_toml_array(trimmed: &str) -> Option<Value> {
    if !trimmed.starts_with('[') {
        return None;
    }
    toml::from_str::<Table>(&format!("v = {trimmed}"))
        .ok()
        .and_then(|mut table| table.remove("v"))
}

/// Walks the merged table, recording every invalid field.
struct Validator<'a> {
    root: &'a Table,
    violations: Vec<FieldViolation>,
}

impl<'a> Validator<'a> {
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut parts = path.split('.');
        let mut value = self.root.get(parts.next()?)?;
        for part in parts {
            value = value.as_table()?.get(part)?;
        }
        Some(value)
    }

    fn reject(&mut self, path: &str, value: Option<&Value>, expected: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: path.to_string(),
            value: value.map_or_else(|| "<missing>".to_string(), ToString::to_string),
            expected: expected.into(),
        });
    }

    fn boolean(&mut self, path: &str) -> bool {
        match self.lookup(path) {
            Some(Value::Boolean(b)) => *b,
            other => {
                self.reject(path, other, "a boolean");
                false
            }
        }
    }

    fn int_in(&mut self, path: &str, range: &RangeInclusive<i64>) -> i64 {
        let expected = format!("an integer in {}..={}", range.start(), range.end());
        match self.lookup(path) {
            Some(Value::Integer(n)) if range.contains(n) => *n,
            other => {
                self.reject(path, other, expected);
                *range.start()
            }
        }
    }

    fn string(&mut self, path: &str) -> Option<String> {
        match self.lookup(path) {
            Some(Value::String(s)) => Some(s.clone()),
            None => None,
            other => {
                self.reject(path, other, "a string");
                None
            }
        }
    }

    fn string_list(&mut self, path: &str) -> Vec<String> {
        match self.lookup(path) {
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        other => self.reject(&format!("{path}[{i}]"), Some(other), "a string"),
                    }
                }
                out
            }
            other => {
                self.reject(path, other, "an array of strings");
                Vec::new()
            }
        }
    }
}

fn validate(table: &Table) -> std::result::Result<Config, ConfigError> {
    let mut v = Validator {
        root: table,
        violations: Vec::new(),
    };

    let enabled = v.boolean("circuit_breaker.enabled");
    let failure_threshold = v.int_in("circuit_breaker.failure_threshold", &FAILURE_THRESHOLD_RANGE);
    let cooldown_seconds = v.int_in("circuit_breaker.cooldown_seconds", &COOLDOWN_RANGE);
    let success_threshold = v.int_in("circuit_breaker.success_threshold", &SUCCESS_THRESHOLD_RANGE);
    let exclude = v.string_list("circuit_breaker.exclude");

    let level_raw = v.string("logging.level");
    let level = match level_raw.as_deref().map(LogLevel::parse) {
        Some(Some(level)) => level,
        Some(None) => {
            let value = v.lookup("logging.level");
            v.reject("logging.level", value, LogLevel::NAMES);
            LogLevel::default()
        }
        None => LogLevel::default(),
    };
    let log_file = v
        .string("logging.file")
        .filter(|s| !s.trim().is_empty())
        .map(|s| expand_path(&s));

    let timeout_seconds = v.int_in("execution.timeout_seconds", &TIMEOUT_RANGE);

    let state_file = match v.string("state_file").filter(|s| !s.trim().is_empty()) {
        Some(s) => expand_path(&s),
        None => {
            let value = v.lookup("state_file");
            v.reject("state_file", value, "a non-empty path");
            PathBuf::new()
        }
    };

    if !v.violations.is_empty() {
        return Err(ConfigError::Invalid(v.violations));
    }

    // Ranges were checked above, so the conversions cannot fail.
    Ok(Config {
        state_file,
        circuit_breaker: CircuitBreakerConfig {
            enabled,
            failure_threshold: u32::try_from(failure_threshold).unwrap_or(1),
            cooldown_seconds: u64::try_from(cooldown_seconds).unwrap_or(0),
            success_threshold: u32::try_from(success_threshold).unwrap_or(1),
            exclude: exclude.into_iter().collect(),
        },
        logging: LoggingConfig {
            file: log_file,
            level,
        },
        execution: ExecutionConfig {
            timeout_seconds: u64::try_from(timeout_seconds).unwrap_or(60),
        },
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path using the process environment.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    expand_with(raw, dirs::home_dir().as_deref(), |name| env::var(name).ok())
}

fn expand_with<F>(raw: &str, home: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    if let Some(home) = home {
        if rest == "~" {
            return home.to_path_buf();
        }
        if let Some(tail) = rest.strip_prefix("~/") {
            out.push_str(&home.display().to_string());
            out.push('/');
            rest = tail;
        }
    }

    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let after = &rest[i + 1..];
        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                out.push_str(&lookup(&braced[..end]).unwrap_or_default());
                // Skip `{`, the name and `}`.
                for _ in 0..braced[..end].chars().count() + 2 {
                    chars.next();
                }
                continue;
            }
        }
        let len = after
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            out.push('$');
            continue;
        }
        out.push_str(&lookup(&after[..len]).unwrap_or_default());
        for _ in 0..len {
            chars.next();
        }
    }
    PathBuf::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_resolve() {
        let config = resolve(None, vars(&[])).unwrap();
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.cooldown_seconds, 300);
        assert_eq!(config.circuit_breaker.success_threshold, 1);
        assert!(config.circuit_breaker.exclude.is_empty());
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert!(config.logging.file.is_none());
        assert_eq!(config.execution.timeout_seconds, 60);
        assert!(config.state_file.ends_with("state.json"));
    }

    #[test]
    fn documented_default_file_matches_defaults() {
        let file = config_file(DEFAULT_CONFIG_TOML);
        let from_file = resolve(Some(file.path()), vars(&[])).unwrap();
        let builtin = resolve(None, vars(&[])).unwrap();
        assert_eq!(from_file, builtin);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = config_file(
            r"
            [circuit_breaker]
            failure_threshold = 10
            ",
        );
        let config = resolve(Some(file.path()), vars(&[])).unwrap();
        assert_eq!(config.circuit_breaker.failure_threshold, 10);
        assert_eq!(config.circuit_breaker.cooldown_seconds, 300);
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.execution.timeout_seconds, 60);
    }

    #[test]
    fn env_overrides_file() {
        let file = config_file(
            r"
            [circuit_breaker]
            failure_threshold = 10
            cooldown_seconds = 60
            ",
        );
        let config = resolve(
            Some(file.path()),
            vars(&[
                ("HOOKGUARD_CIRCUIT_BREAKER_FAILURE_THRESHOLD", "5"),
                ("HOOKGUARD_LOGGING_LEVEL", "debug"),
            ]),
        )
        .unwrap();
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.cooldown_seconds, 60);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn env_key_keeps_compound_segments() {
        assert_eq!(
            split_env_key("CIRCUIT_BREAKER_FAILURE_THRESHOLD"),
            vec!["circuit_breaker", "failure_threshold"]
        );
        assert_eq!(split_env_key("STATE_FILE"), vec!["state_file"]);
        assert_eq!(split_env_key("LOGGING_LEVEL"), vec!["logging", "level"]);
        assert_eq!(
            split_env_key("EXECUTION_TIMEOUT_SECONDS"),
            vec!["execution", "timeout_seconds"]
        );
    }

    #[test]
    fn env_exclude_accepts_comma_list_and_array() {
        let config = resolve(
            None,
            vars(&[("HOOKGUARD_CIRCUIT_BREAKER_EXCLUDE", "make lint, ./check.sh ,")]),
        )
        .unwrap();
        let expected: BTreeSet<String> =
            ["make lint".to_string(), "./check.sh".to_string()].into();
        assert_eq!(config.circuit_breaker.exclude, expected);

        let config = resolve(
            None,
            vars(&[("HOOKGUARD_CIRCUIT_BREAKER_EXCLUDE", r#"["a, b", "c"]"#)]),
        )
        .unwrap();
        let expected: BTreeSet<String> = ["a, b".to_string(), "c".to_string()].into();
        assert_eq!(config.circuit_breaker.exclude, expected);
    }

    #[test]
    fn reserved_and_foreign_env_vars_are_ignored() {
        let config = resolve(
            None,
            vars(&[
                ("HOOKGUARD_CONFIG", "/nope.toml"),
                ("HOOKGUARD_HOME", "/nope"),
                ("PATH", "/usr/bin"),
                ("HOOKGUARD_UNKNOWN_KEY", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(config, resolve(None, vars(&[])).unwrap());
    }

    #[test]
    fn env_disables_breaker() {
        let config = resolve(None, vars(&[("HOOKGUARD_CIRCUIT_BREAKER_ENABLED", "false")])).unwrap();
        assert!(!config.circuit_breaker.enabled);
    }

    #[test]
    fn validation_reports_every_violation() {
        let file = config_file(
            r#"
            [circuit_breaker]
            failure_threshold = 0
            cooldown_seconds = 100000
            success_threshold = 101
            enabled = "yes"

            [logging]
            level = "LOUD"
            "#,
        );
        let err = resolve(Some(file.path()), vars(&[])).unwrap_err();
        let Error::Config(ConfigError::Invalid(violations)) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "circuit_breaker.enabled",
                "circuit_breaker.failure_threshold",
                "circuit_breaker.cooldown_seconds",
                "circuit_breaker.success_threshold",
                "logging.level",
            ]
        );
        assert!(violations[1].expected.contains("1..=100"));
        assert!(violations[2].expected.contains("0..=86400"));
    }

    #[test]
    fn env_type_errors_are_reported() {
        let err = resolve(
            None,
            vars(&[("HOOKGUARD_CIRCUIT_BREAKER_FAILURE_THRESHOLD", "many")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("circuit_breaker.failure_threshold"));
        assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
    }

    #[test]
    fn unparsable_file_is_parse_error() {
        let file = config_file("[circuit_breaker\nfailure_threshold = ");
        let err = resolve(Some(file.path()), vars(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn zero_cooldown_is_valid() {
        let config = resolve(
            None,
            vars(&[("HOOKGUARD_CIRCUIT_BREAKER_COOLDOWN_SECONDS", "0")]),
        )
        .unwrap();
        assert_eq!(config.circuit_breaker.cooldown_seconds, 0);
    }

    #[test]
    fn expand_home_and_vars() {
        let home = Path::new("/home/dev");
        let lookup = |name: &str| match name {
            "XDG_STATE_HOME" => Some("/var/state".to_string()),
            "USER" => Some("dev".to_string()),
            _ => None,
        };
        assert_eq!(
            expand_with("~/.hookguard/state.json", Some(home), lookup),
            PathBuf::from("/home/dev/.hookguard/state.json")
        );
        assert_eq!(
            expand_with("$XDG_STATE_HOME/hg/${USER}.json", Some(home), lookup),
            PathBuf::from("/var/state/hg/dev.json")
        );
        assert_eq!(
            expand_with("/tmp/$MISSING/x", Some(home), lookup),
            PathBuf::from("/tmp//x")
        );
        assert_eq!(
            expand_with("/cost/$5", Some(home), lookup),
            PathBuf::from("/cost/")
        );
        assert_eq!(expand_with("a$", Some(home), lookup), PathBuf::from("a$"));
        assert_eq!(expand_with("~", Some(home), lookup), PathBuf::from("/home/dev"));
    }

    #[test]
    fn braced_non_ascii_names_expand_cleanly() {
        let lookup = |name: &str| (name == "ÜSER").then(|| "dev".to_string());
        assert_eq!(
            expand_with("/data/${ÜSER}/state.json", None, lookup),
            PathBuf::from("/data/dev/state.json")
        );
    }

    #[test]
    fn env_values_infer_floats_and_arrays() {
        assert_eq!(parse_env_value("cooldown_seconds", "2.5"), Value::Float(2.5));
        assert_eq!(parse_env_value("cooldown_seconds", "30"), Value::Integer(30));
        assert_eq!(
            parse_env_value("failure_threshold", "[1, 2]"),
            Value::Array(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(parse_env_value("level", "1.5"), Value::String("1.5".into()));
        assert_eq!(parse_env_value("enabled", "nan"), Value::String("nan".into()));
    }

    #[test]
    fn float_for_integer_field_is_reported() {
        let err = resolve(
            None,
            vars(&[("HOOKGUARD_CIRCUIT_BREAKER_COOLDOWN_SECONDS", "2.5")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("circuit_breaker.cooldown_seconds"));
    }

    #[test]
    fn exclude_matches_exact_and_glob() {
        let config = CircuitBreakerConfig {
            exclude: ["make lint".to_string(), "npm run *".to_string()].into(),
            ..Default::default()
        };
        assert!(config.is_excluded("make lint"));
        assert!(!config.is_excluded("make lint --fix"));
        assert!(config.is_excluded("npm run test"));
        assert!(!config.is_excluded("cargo test"));
    }

    #[test]
    fn write_default_config_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path, false).unwrap();
        assert!(path.exists());
        assert!(matches!(
            write_default_config(&path, false),
            Err(Error::Usage(_))
        ));
        write_default_config(&path, true).unwrap();
    }

    #[test]
    fn config_dump_serializes_to_toml() {
        let config = resolve(None, vars(&[])).unwrap();
        let dumped = toml::to_string_pretty(&config).unwrap();
        assert!(dumped.contains("[circuit_breaker]"));
        assert!(dumped.contains("failure_threshold = 3"));
        assert!(dumped.contains("level = \"WARNING\""));
    }
}
