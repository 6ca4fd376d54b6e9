//! hookguard - Circuit breaker for hook commands.
//!
//! Wraps hook commands so one that keeps failing is disabled after a few
//! consecutive failures, skipped while it cools down, and retried
//! automatically once the cooldown passes.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
