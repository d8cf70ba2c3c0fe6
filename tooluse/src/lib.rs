//! Tooluse - a prompt-driven tool-use loop for hosted language models
//!
//! The model is told about the available tools in its system prompt and
//! answers with a JSON document inside a `<json>` block: either a list of
//! tool calls or a final answer. The [`agent::Runner`] dispatches the calls,
//! reports each result back as a conversation turn and repeats until the
//! model stops.

pub mod agent;
pub mod callback;
pub mod chat;
pub mod completion;
pub mod error;
pub mod llms;
pub mod message;
pub mod parse;
pub mod prelude;
pub mod prompt;
pub mod stream;
pub mod tool;
#[cfg(feature = "toolkit")]
pub mod tools;
pub mod usage;

pub use error::{Error, LlmError, Result, ToolError};
