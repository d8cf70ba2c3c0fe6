//! Lifecycle hooks for observing a run.
//!
//! Hooks are passed per run through
//! [`RunConfig::hooks`](crate::agent::RunConfig). They observe; they cannot
//! change what the orchestrator does.

mod hooks;
mod logging;
mod noop;

pub use hooks::{RunHooks, SharedRunHooks};
pub use logging::{LogLevel, LoggingRunHooks};
pub use noop::NoopRunHooks;
