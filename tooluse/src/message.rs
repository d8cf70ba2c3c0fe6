//! Conversation types exchanged with the model.
//!
//! A [`Conversation`] is an append-only list of [`Turn`]s. The model sees the
//! whole history on every completion request, and the orchestrator only ever
//! pushes new turns onto the end.

use serde::{Deserialize, Serialize};

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side, including synthetic tool-result turns.
    User,
    /// The model side, including synthetic tool-intent turns.
    Assistant,
}

impl Role {
    /// Get the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the turn.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl Turn {
    /// Create a turn with an explicit role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered, append-only message history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in order.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Iterate over turns in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl From<Vec<Turn>> for Conversation {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl From<&str> for Conversation {
    fn from(question: &str) -> Self {
        Self {
            turns: vec![Turn::user(question)],
        }
    }
}

impl From<String> for Conversation {
    fn from(question: String) -> Self {
        Self {
            turns: vec![Turn::user(question)],
        }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    mod role {
        use super::*;

        #[test]
        fn serializes_lowercase() {
            assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
            assert_eq!(
                serde_json::to_string(&Role::Assistant).unwrap(),
                "\"assistant\""
            );
        }

        #[test]
        fn display_matches_as_str() {
            assert_eq!(Role::Assistant.to_string(), "assistant");
        }
    }

    mod conversation {
        use super::*;

        #[test]
        fn from_str_is_single_user_turn() {
            let conv = Conversation::from("What is 1 + 1?");
            assert_eq!(conv.len(), 1);
            assert_eq!(conv.turns()[0], Turn::user("What is 1 + 1?"));
        }

        #[test]
        fn push_appends_in_order() {
            let mut conv = Conversation::new();
            assert!(conv.is_empty());
            conv.push(Turn::user("a"));
            conv.push(Turn::assistant("b"));
            assert_eq!(conv.len(), 2);
            assert_eq!(conv.last().unwrap().content, "b");
            let roles: Vec<_> = conv.iter().map(|t| t.role).collect();
            assert_eq!(roles, vec![Role::User, Role::Assistant]);
        }

        #[test]
        fn serializes_as_plain_array() {
            let conv = Conversation::from(vec![Turn::user("hi")]);
            let json = serde_json::to_value(&conv).unwrap();
            assert_eq!(json, serde_json::json!([{"role": "user", "content": "hi"}]));
        }
    }
}
