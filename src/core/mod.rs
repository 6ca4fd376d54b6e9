//! Core types and circuit breaker logic.

pub mod circuit_breaker;
pub mod state;

pub use circuit_breaker::{CircuitBreaker, DecisionReason, Evaluation, ExecutionDecision};
pub use state::{CircuitState, GlobalStats, HookExecutionState, Recorded, StateSnapshot};
