//! LLM backend implementations.
//!
//! # Available Backends
//!
//! - [`anthropic`] - Anthropic Messages API (Claude models)
//! - [`scripted`] - replays canned model output, for tests and offline runs

#[cfg(feature = "anthropic")]
pub mod anthropic;

pub mod scripted;

#[cfg(feature = "anthropic")]
pub use anthropic::{Anthropic, AnthropicConfig};

pub use scripted::{ScriptedProvider, ScriptedReply};
