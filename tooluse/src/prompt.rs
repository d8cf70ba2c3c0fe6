//! System prompt generation.
//!
//! The prompt lists every registered tool as JSON and then describes the two
//! documents the model may answer with. Only the list form of tool use is
//! advertised; the parser still accepts the singular form.

use crate::tool::ToolDefinition;

const TOOL_USE_SCHEMA: &str = r#"{
    "result": "tool_use",
    "tool_calls": [
        {
            "tool": "<name of the selected tool>",
            "tool_input": <parameters for the selected tool, matching the tool's JSON schema>
        }
    ],
    "explanation": "<why these tools were chosen>"
}"#;

const STOP_SCHEMA: &str = r#"{
    "result": "stop",
    "content": "<your response to the user>",
    "explanation": "<how you arrived at the final answer>"
}"#;

/// Builder for the tool-use system prompt.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    tools: Vec<ToolDefinition>,
    instructions: Option<String>,
}

impl SystemPrompt {
    /// Start a prompt for the given tools, in order.
    #[must_use]
    pub fn new(tools: &[ToolDefinition]) -> Self {
        Self {
            tools: tools.to_vec(),
            instructions: None,
        }
    }

    /// Append free-form instructions after the output format section.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let text = instructions.into();
        self.instructions = (!text.trim().is_empty()).then_some(text);
        self
    }

    /// Render the prompt text.
    #[must_use]
    pub fn render(&self) -> String {
        let tools = serde_json::to_string_pretty(&self.tools).unwrap_or_else(|_| "[]".to_owned());
        let mut out = format!(
            "You have access to the following tools:\n{tools}\n\n\
             Please think step by step. If tools are needed, select one or more tools \
             whose parameters are already known. Respond with only a JSON object matching \
             the following schema inside a <json></json> xml tag:\n{TOOL_USE_SCHEMA}\n\n\
             If no further tools are needed, respond with only a JSON object matching \
             the following schema:\n{STOP_SCHEMA}\n"
        );
        if let Some(extra) = &self.instructions {
            out.push('\n');
            out.push_str(extra.trim());
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Display for SystemPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
