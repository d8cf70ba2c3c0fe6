//! Anthropic Messages API client.
//!
//! Supports batched and streaming completions over plain HTTPS with an API
//! key. Only text content is used; the JSON result protocol is carried in
//! ordinary text.

mod chat;
mod client;
mod config;
mod stream;

pub use client::Anthropic;
pub use config::AnthropicConfig;
pub use stream::SseDecoder;
