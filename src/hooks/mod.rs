//! Hook execution and host output.

pub mod output;
pub mod runner;

pub use output::HookOutput;
pub use runner::{ExecutionResult, HookRun, Outcome, RunOptions, run_command, run_hook};
