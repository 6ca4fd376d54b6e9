//! Hook execution.
//!
//! Runs a hook command through the platform shell with a bounded timeout and
//! classifies how it ended. [`run_hook`] puts the circuit breaker in front of
//! that: skipped hooks never spawn, executed ones have their outcome
//! recorded.

use crate::core::{CircuitBreaker, CircuitState, Evaluation, ExecutionDecision};
use crate::error::EXIT_INTERRUPTED;
use chrono::Utc;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Most stderr kept as the recorded error.
pub const MAX_ERROR_BYTES: usize = 2048;

/// Signal number of an interrupt.
const SIGINT: i32 = 2;

/// How often a running child is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Options for one command run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Kill the command after this long.
    pub timeout: Duration,

    /// Bytes fed to the command's stdin. `None` gives it an empty stdin.
    pub stdin: Option<Vec<u8>>,

    /// Capture stdout instead of passing it through.
    pub capture_stdout: bool,

    /// Copy captured stderr to our own stderr.
    pub echo_stderr: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            stdin: None,
            capture_stdout: false,
            echo_stderr: true,
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exit code 0.
    Success,
    /// Non-zero exit code.
    Failed {
        /// The exit code.
        code: i32,
        /// Tail of stderr.
        stderr: String,
    },
    /// Terminated by a signal.
    Signaled {
        /// Signal number.
        signal: i32,
    },
    /// Killed after exceeding the timeout.
    TimedOut {
        /// The timeout that was exceeded.
        after: Duration,
    },
    /// The shell could not be started.
    SpawnError(String),
}

impl Outcome {
    /// Whether the hook succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Error text recorded for a failure.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success => None,
            Self::Failed { code, stderr } if stderr.trim().is_empty() => {
                Some(format!("exit code {code}"))
            }
            Self::Failed { code, stderr } => Some(format!("exit code {code}: {}", stderr.trim())),
            Self::Signaled { signal } => Some(format!("killed by signal {signal}")),
            Self::TimedOut { after } => Some(format!("timeout after {}s", after.as_secs())),
            Self::SpawnError(e) => Some(format!("spawn error: {e}")),
        }
    }

    /// Exit code the wrapper reports to the host.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed { code, .. } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            Self::Signaled { signal } if *signal == SIGINT => EXIT_INTERRUPTED,
            Self::Signaled { signal } => u8::try_from(128 + signal).unwrap_or(1),
            Self::TimedOut { .. } | Self::SpawnError(_) => 1,
        }
    }
}

/// Result of running a command.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// How it ended.
    pub outcome: Outcome,
    /// Wall-clock time.
    pub elapsed: Duration,
    /// Captured stdout, when requested.
    pub stdout: Option<Vec<u8>>,
}

/// Result of running a hook behind the breaker.
#[derive(Debug, Clone)]
pub enum HookRun {
    /// The circuit was open; nothing ran.
    Skipped(Evaluation),
    /// The command ran and its outcome was recorded.
    Executed {
        /// The decision that allowed it.
        evaluation: Evaluation,
        /// What happened.
        result: ExecutionResult,
    },
}

impl HookRun {
    /// Exit code the wrapper reports to the host. Skips always report 0.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Skipped(_) => 0,
            Self::Executed { result, .. } => result.outcome.exit_code(),
        }
    }
}

/// Run `hook_id` if the breaker allows it, recording the outcome.
pub fn run_hook(hook_id: &str, breaker: &CircuitBreaker<'_>, options: &RunOptions) -> HookRun {
    let evaluation = breaker.evaluate(hook_id, Utc::now());

    if evaluation.decision == ExecutionDecision::SkipGracefully {
        info!(
            hook = hook_id,
            reason = ?evaluation.reason,
            retry_after = ?evaluation.retry_after,
            "skipping disabled hook"
        );
        return HookRun::Skipped(evaluation);
    }
    if evaluation.state == CircuitState::HalfOpen {
        info!(hook = hook_id, "running recovery trial");
    }

    let result = run_command(hook_id, options);
    let message = result.outcome.error_message();
    breaker.record(hook_id, message.as_deref().map_or(Ok(()), Err), Utc::now());

    HookRun::Executed { evaluation, result }
}

/// Run a command line through the platform shell.
///
/// Never fails: spawn errors and timeouts are reported as outcomes.
#[must_use]
pub fn run_command(command: &str, options: &RunOptions) -> ExecutionResult {
    let started = Instant::now();
    let mut cmd = shell_command(command);
    cmd.stdin(if options.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(if options.capture_stdout {
        Stdio::piped()
    } else {
        Stdio::inherit()
    })
    .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(command, error = %e, "failed to spawn hook");
            return ExecutionResult {
                outcome: Outcome::SpawnError(e.to_string()),
                elapsed: started.elapsed(),
                stdout: None,
            };
        }
    };
    debug!(command, pid = child.id(), "hook started");

    if let (Some(bytes), Some(mut pipe)) = (options.stdin.clone(), child.stdin.take()) {
        thread::spawn(move || {
            // The hook may exit without reading its input.
            if let Err(e) = pipe.write_all(&bytes) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    debug!(error = %e, "failed to write hook stdin");
                }
            }
        });
    }
    let stderr_reader = child.stderr.take().map(spawn_reader);
    let stdout_reader = child.stdout.take().map(spawn_reader);

    let Some(status) = wait_with_timeout(&mut child, options.timeout) else {
        warn!(command, timeout = ?options.timeout, "hook timed out, killed");
        // Readers may never finish if a grandchild still holds the pipes.
        return ExecutionResult {
            outcome: Outcome::TimedOut {
                after: options.timeout,
            },
            elapsed: started.elapsed(),
            stdout: None,
        };
    };

    let stderr = stderr_reader.map(join_reader).unwrap_or_default();
    let stdout = stdout_reader.map(join_reader);
    if options.echo_stderr && !stderr.is_empty() {
        let _ = io::stderr().write_all(&stderr);
    }

    let outcome = classify(status, &stderr);
    debug!(command, ?outcome, "hook finished");
    ExecutionResult {
        outcome,
        elapsed: started.elapsed(),
        stdout,
    }
}

/// Poll until the child exits or `timeout` passes. On timeout the child and
/// everything it spawned are killed, the child is reaped, and `None` is
/// returned.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() >= deadline => {
                kill_tree(child);
                let _ = child.wait();
                return None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                warn!(error = %e, "failed to poll hook, killing");
                kill_tree(child);
                return child.wait().ok();
            }
        }
    }
}

fn classify(status: ExitStatus, stderr: &[u8]) -> Outcome {
    if status.success() {
        return Outcome::Success;
    }
    if let Some(code) = status.code() {
        return Outcome::Failed {
            code,
            stderr: tail(stderr, MAX_ERROR_BYTES),
        };
    }
    Outcome::Signaled {
        signal: signal_of(status),
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(0)
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> i32 {
    0
}

/// Kill the shell's whole process group so forked workers die with it.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let killed = i32::try_from(child.id())
        .ok()
        .map(|pid| killpg(Pid::from_raw(pid), Signal::SIGKILL));
    if !matches!(killed, Some(Ok(()))) {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// The shell leads a new process group so a timeout can reach its children.
#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).process_group(0);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// The last `max` bytes of `bytes` as lossy UTF-8, starting on a char boundary.
fn tail(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= max {
        return text.into_owned();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;
    use crate::core::DecisionReason;
    use crate::storage::{MemoryBackend, StateStore};

    fn quiet() -> RunOptions {
        RunOptions {
            timeout: Duration::from_secs(10),
            capture_stdout: true,
            echo_stderr: false,
            ..Default::default()
        }
    }

    #[test]
    fn exit_zero_is_success() {
        let result = run_command("true", &quiet());
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.outcome.exit_code(), 0);
    }

    #[test]
    fn non_zero_exit_captures_stderr() {
        let result = run_command("echo 'lint failed' >&2; exit 3", &quiet());
        assert_eq!(
            result.outcome,
            Outcome::Failed {
                code: 3,
                stderr: "lint failed\n".to_string()
            }
        );
        assert_eq!(
            result.outcome.error_message().as_deref(),
            Some("exit code 3: lint failed")
        );
        assert_eq!(result.outcome.exit_code(), 3);
    }

    #[test]
    fn stdin_is_forwarded() {
        let options = RunOptions {
            stdin: Some(br#"{"session_id":"abc"}"#.to_vec()),
            ..quiet()
        };
        let result = run_command("cat", &options);
        assert!(result.outcome.is_success());
        assert_eq!(result.stdout.unwrap(), br#"{"session_id":"abc"}"#);
    }

    #[test]
    fn hung_command_is_killed() {
        let options = RunOptions {
            timeout: Duration::from_millis(200),
            ..quiet()
        };
        let result = run_command("sleep 30", &options);
        assert!(matches!(result.outcome, Outcome::TimedOut { .. }));
        assert!(result.elapsed < Duration::from_secs(10));
        assert!(result.outcome.error_message().unwrap().starts_with("timeout"));
        assert_eq!(result.outcome.exit_code(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn timeout_kills_forked_children() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let options = RunOptions {
            timeout: Duration::from_millis(300),
            ..quiet()
        };
        let command = format!("(sleep 1; touch {}); true", marker.display());

        let result = run_command(&command, &options);
        assert!(matches!(result.outcome, Outcome::TimedOut { .. }));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "subshell outlived the timeout");
    }

    #[test]
    fn interrupted_child_reports_130() {
        let outcome = Outcome::Signaled { signal: 2 };
        assert_eq!(outcome.exit_code(), crate::error::EXIT_INTERRUPTED);
        assert_eq!(outcome.error_message().as_deref(), Some("killed by signal 2"));
    }

    #[test]
    fn signal_exit_maps_to_128_plus_signal() {
        let result = run_command("kill -TERM $$", &quiet());
        assert_eq!(result.outcome, Outcome::Signaled { signal: 15 });
        assert_eq!(result.outcome.exit_code(), 143);
    }

    #[test]
    fn tail_keeps_end_of_long_output() {
        let long = format!("{}END", "x".repeat(5000));
        let t = tail(long.as_bytes(), 100);
        assert!(t.ends_with("END"));
        assert!(t.len() <= 103);
    }

    #[test]
    fn failures_open_the_circuit_then_skip() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        };
        let store = MemoryBackend::new(config.clone());
        let breaker = CircuitBreaker::new(&store, &config);

        for _ in 0..2 {
            let run = run_hook("exit 1", &breaker, &quiet());
            assert!(matches!(run, HookRun::Executed { .. }));
            assert_eq!(run.exit_code(), 1);
        }

        let run = run_hook("exit 1", &breaker, &quiet());
        let HookRun::Skipped(evaluation) = run else {
            panic!("expected skip, got {run:?}");
        };
        assert_eq!(evaluation.reason, DecisionReason::CoolingDown);
        assert_eq!(run_hook("exit 1", &breaker, &quiet()).exit_code(), 0);

        let hook = store.get("exit 1").unwrap().unwrap();
        assert_eq!(hook.total_executions, 2);
        assert_eq!(hook.last_error.as_deref(), Some("exit code 1"));
    }

    #[test]
    fn timeout_is_recorded_as_failure() {
        let config = CircuitBreakerConfig::default();
        let store = MemoryBackend::new(config.clone());
        let breaker = CircuitBreaker::new(&store, &config);
        let options = RunOptions {
            timeout: Duration::from_millis(100),
            ..quiet()
        };

        run_hook("sleep 5", &breaker, &options);
        let hook = store.get("sleep 5").unwrap().unwrap();
        assert_eq!(hook.consecutive_failures, 1);
        assert!(hook.last_error.unwrap().starts_with("timeout after"));
    }
}
