//! Response parser: raw model text to a [`ModelResult`].
//!
//! The model is asked to answer with exactly one JSON document per turn,
//! tagged by a `result` field:
//!
//! ```json
//! {"result": "tool_use", "tool_calls": [{"tool": "get_weather", "tool_input": {"latitude": "1"}}], "explanation": "..."}
//! {"result": "stop", "content": "It is sunny.", "explanation": "..."}
//! ```
//!
//! An older singular shape (`"tool"` / `"tool_input"` at the top level) is
//! accepted on input and normalised into a one-element call list.
//!
//! Line breaks are stripped before decoding, since models routinely wrap the
//! document across lines. Escaped `\n` sequences inside strings survive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registry name of the tool.
    #[serde(rename = "tool")]
    pub name: String,
    /// Keyword arguments.
    #[serde(rename = "tool_input", default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a tool call.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Arguments rendered as compact JSON text.
    #[must_use]
    pub fn arguments_json(&self) -> String {
        Value::Object(self.arguments.clone()).to_string()
    }
}

/// Which tool-use input shape a document used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallShape {
    /// `tool_calls: [...]`.
    #[default]
    List,
    /// Legacy top-level `tool` / `tool_input`.
    Single,
}

/// Classified model output for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResult {
    /// The model wants one or more tools run before it answers.
    ToolUse {
        /// Calls in the order the model listed them. Never empty.
        calls: Vec<ToolCall>,
        /// Free-text reasoning, if the model gave any.
        explanation: Option<String>,
        /// Input shape the document used.
        shape: CallShape,
    },
    /// The model has a final answer.
    Stop {
        /// The answer text.
        content: String,
        /// Free-text reasoning, if the model gave any.
        explanation: Option<String>,
    },
}

impl ModelResult {
    /// Returns `true` for a final answer.
    #[must_use]
    pub const fn is_stop(&self) -> bool {
        matches!(self, Self::Stop { .. })
    }

    /// Tool calls requested by this result (empty for `Stop`).
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::ToolUse { calls, .. } => calls,
            Self::Stop { .. } => &[],
        }
    }

    /// The explanation, if present.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        match self {
            Self::ToolUse { explanation, .. } | Self::Stop { explanation, .. } => {
                explanation.as_deref()
            }
        }
    }

    /// Serialise to the canonical document shape.
    ///
    /// Tool use is always written in list form, regardless of [`CallShape`].
    #[must_use]
    pub fn to_json(&self) -> Value {
        let (mut doc, explanation) = match self {
            Self::ToolUse {
                calls, explanation, ..
            } => (
                json!({ "result": "tool_use", "tool_calls": calls }),
                explanation,
            ),
            Self::Stop {
                content,
                explanation,
            } => (json!({ "result": "stop", "content": content }), explanation),
        };
        if let (Some(text), Some(obj)) = (explanation, doc.as_object_mut()) {
            obj.insert("explanation".into(), Value::String(text.clone()));
        }
        doc
    }
}

/// Error produced when model output cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The text is not valid JSON.
    #[error("model output is not valid JSON: {reason}")]
    Decode {
        /// Decoder message.
        reason: String,
        /// The unmodified model text.
        raw: String,
    },
    /// The text is JSON but not a recognised result document.
    #[error("model output does not match the result schema: {reason}")]
    Schema {
        /// What was wrong.
        reason: String,
        /// The unmodified model text.
        raw: String,
    },
}

impl ParseError {
    /// Create a decode error.
    #[must_use]
    pub fn decode(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Create a schema error.
    #[must_use]
    pub fn schema(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Schema {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// The model text that failed to parse.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Decode { raw, .. } | Self::Schema { raw, .. } => raw,
        }
    }

    /// Human-readable failure reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Decode { reason, .. } | Self::Schema { reason, .. } => reason,
        }
    }

    /// Returns `true` for valid JSON of the wrong shape.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

/// Parse one model turn.
///
/// # Errors
///
/// [`ParseError::Decode`] if the text is not JSON after line breaks are
/// removed, [`ParseError::Schema`] if it is JSON but not a `tool_use` or
/// `stop` document.
pub fn parse_model_output(raw: &str) -> Result<ModelResult, ParseError> {
    let flattened: String = raw.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    let value: Value = serde_json::from_str(flattened.trim())
        .map_err(|e| ParseError::decode(e.to_string(), raw))?;

    let Value::Object(doc) = value else {
        return Err(ParseError::schema("expected a JSON object", raw));
    };

    let explanation = optional_string(&doc, "explanation", raw)?;

    match doc.get("result") {
        Some(Value::String(tag)) if tag == "tool_use" => {
            let (calls, shape) = parse_tool_calls(&doc, raw)?;
            Ok(ModelResult::ToolUse {
                calls,
                explanation,
                shape,
            })
        }
        Some(Value::String(tag)) if tag == "stop" => match doc.get("content") {
            Some(Value::String(content)) => Ok(ModelResult::Stop {
                content: content.clone(),
                explanation,
            }),
            _ => Err(ParseError::schema(
                "`stop` result needs a string `content`",
                raw,
            )),
        },
        Some(Value::String(tag)) => Err(ParseError::schema(
            format!("unknown result tag `{tag}`"),
            raw,
        )),
        Some(_) => Err(ParseError::schema("`result` must be a string", raw)),
        None => Err(ParseError::schema("missing `result` field", raw)),
    }
}

fn parse_tool_calls(
    doc: &Map<String, Value>,
    raw: &str,
) -> Result<(Vec<ToolCall>, CallShape), ParseError> {
    if let Some(list) = doc.get("tool_calls") {
        if doc.contains_key("tool") {
            warn!("Model output has both `tool_calls` and `tool`; using `tool_calls`");
        }
        let Value::Array(entries) = list else {
            return Err(ParseError::schema("`tool_calls` must be an array", raw));
        };
        if entries.is_empty() {
            return Err(ParseError::schema("`tool_calls` is empty", raw));
        }
        let calls = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| match entry {
                Value::Object(obj) => call_from_object(obj, raw, &format!("tool_calls[{i}]")),
                _ => Err(ParseError::schema(
                    format!("tool_calls[{i}] must be an object"),
                    raw,
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok((calls, CallShape::List));
    }

    if doc.contains_key("tool") {
        debug!("Model output uses the singular `tool` shape");
        let call = call_from_object(doc, raw, "tool_use")?;
        return Ok((vec![call], CallShape::Single));
    }

    Err(ParseError::schema(
        "`tool_use` result needs `tool_calls` or `tool`",
        raw,
    ))
}

fn call_from_object(
    obj: &Map<String, Value>,
    raw: &str,
    at: &str,
) -> Result<ToolCall, ParseError> {
    let name = match obj.get("tool") {
        Some(Value::String(name)) => name.clone(),
        _ => {
            return Err(ParseError::schema(
                format!("{at} needs a string `tool`"),
                raw,
            ));
        }
    };
    let arguments = match obj.get("tool_input") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args.clone(),
        Some(_) => {
            return Err(ParseError::schema(
                format!("{at}: `tool_input` must be an object"),
                raw,
            ));
        }
    };
    Ok(ToolCall { name, arguments })
}

fn optional_string(
    doc: &Map<String, Value>,
    key: &str,
    raw: &str,
) -> Result<Option<String>, ParseError> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::schema(format!("`{key}` must be a string"), raw)),
    }
}
