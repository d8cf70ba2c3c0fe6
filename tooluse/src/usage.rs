//! Token usage tracking across completions.
//!
//! Providers report usage per completion; the orchestrator sums them into a
//! run total. Anthropic reports `input_tokens` / `output_tokens` and, when
//! prompt caching is active, cache read/creation counts.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token usage statistics from one or more completions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the input/prompt.
    #[serde(default)]
    pub input_tokens: u32,

    /// Number of tokens in the output/completion.
    #[serde(default)]
    pub output_tokens: u32,

    /// Total tokens used (input + output).
    #[serde(default)]
    pub total_tokens: u32,

    /// Input tokens served from the prompt cache.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cache_read_input_tokens: u32,

    /// Input tokens written to the prompt cache.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cache_creation_input_tokens: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Usage {
    /// Create a new usage record.
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            cache_read_input_tokens: 0,
            cache_creation_input_tokens: 0,
        }
    }

    /// Create an empty usage record.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Set cache token counts.
    #[must_use]
    pub const fn with_cache(mut self, read: u32, creation: u32) -> Self {
        self.cache_read_input_tokens = read;
        self.cache_creation_input_tokens = creation;
        self
    }

    /// Check if usage is empty (no tokens used).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_tokens == 0
    }

    /// Fold a partial report into this one.
    ///
    /// Streaming providers report input tokens at the start of a message and
    /// output tokens at the end; non-zero fields of `other` overwrite ours.
    pub const fn merge(&mut self, other: &Self) {
        if other.input_tokens != 0 {
            self.input_tokens = other.input_tokens;
        }
        if other.output_tokens != 0 {
            self.output_tokens = other.output_tokens;
        }
        if other.cache_read_input_tokens != 0 {
            self.cache_read_input_tokens = other.cache_read_input_tokens;
        }
        if other.cache_creation_input_tokens != 0 {
            self.cache_creation_input_tokens = other.cache_creation_input_tokens;
        }
        self.total_tokens = self.input_tokens.saturating_add(self.output_tokens);
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
            cache_read_input_tokens: self
                .cache_read_input_tokens
                .saturating_add(rhs.cache_read_input_tokens),
            cache_creation_input_tokens: self
                .cache_creation_input_tokens
                .saturating_add(rhs.cache_creation_input_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} input + {} output = {} tokens",
            self.input_tokens, self.output_tokens, self.total_tokens
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_computes_total() {
        let usage = Usage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
        assert!(!usage.is_empty());
        assert!(Usage::zero().is_empty());
    }

    #[test]
    fn add_sums_every_field() {
        let a = Usage::new(10, 5).with_cache(3, 1);
        let b = Usage::new(20, 7).with_cache(2, 0);
        let sum = a + b;
        assert_eq!(sum.input_tokens, 30);
        assert_eq!(sum.output_tokens, 12);
        assert_eq!(sum.total_tokens, 42);
        assert_eq!(sum.cache_read_input_tokens, 5);
        assert_eq!(sum.cache_creation_input_tokens, 1);
    }

    #[test]
    fn add_assign_accumulates() {
        let mut total = Usage::zero();
        total += Usage::new(1, 2);
        total += Usage::new(3, 4);
        assert_eq!(total, Usage::new(4, 6));
    }

    #[test]
    fn sums_saturate_at_u32_max() {
        let big = Usage::new(u32::MAX, 1);
        assert_eq!(big.total_tokens, u32::MAX);

        let mut total = Usage::new(u32::MAX - 1, 0);
        total += Usage::new(5, 0).with_cache(u32::MAX, 0);
        total += Usage::zero().with_cache(1, 0);
        assert_eq!(total.input_tokens, u32::MAX);
        assert_eq!(total.cache_read_input_tokens, u32::MAX);

        let mut merged = Usage::new(u32::MAX, 0);
        merged.merge(&Usage::new(0, 9));
        assert_eq!(merged.total_tokens, u32::MAX);
    }

    #[test]
    fn merge_keeps_start_and_end_reports() {
        let mut usage = Usage::new(25, 1);
        usage.merge(&Usage::new(0, 40));
        assert_eq!(usage.input_tokens, 25);
        assert_eq!(usage.output_tokens, 40);
        assert_eq!(usage.total_tokens, 65);
    }

    #[test]
    fn deserializes_anthropic_usage_object() {
        let usage: Usage =
            serde_json::from_str(r#"{"input_tokens": 12, "output_tokens": 3}"#).unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 3);
        assert_eq!(usage.cache_read_input_tokens, 0);
    }

    #[test]
    fn serialization_skips_zero_cache_fields() {
        let json = serde_json::to_string(&Usage::new(1, 1)).unwrap();
        assert!(!json.contains("cache_read_input_tokens"));
    }

    #[test]
    fn display_format() {
        assert_eq!(
            Usage::new(100, 50).to_string(),
            "100 input + 50 output = 150 tokens"
        );
    }
}
