//! Agent module, the tool-use turn loop.
//!
//! - **[`Agent`]** holds a provider, a tool registry and prompt settings.
//! - **[`Runner`]** drives one run: complete, parse, dispatch, repeat until
//!   the model answers with a `stop` result.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tooluse::agent::{Agent, RunConfig};
//!
//! let agent = Agent::new(provider).tools(tooluse::tools::arithmetic_toolset());
//! let result = agent.run("What is 1 + 1?", RunConfig::new().streaming(true)).await?;
//! println!("{}", result.output);
//! ```

mod cancel;
mod config;
pub mod result;
mod runner;

pub use cancel::CancelSignal;
pub use config::{Agent, DEFAULT_MAX_TURNS};
pub use result::{RunConfig, RunResult, StepInfo, ToolCallRecord};
pub use runner::Runner;
