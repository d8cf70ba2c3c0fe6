//! Tool trait, registry and dispatch.
//!
//! Tools are local callables the model may ask for by name. The registry is
//! fixed once an [`Agent`](crate::agent::Agent) is built and is read-only
//! during a run.
//!
//! There are three ways to define a tool:
//! - implement [`TypedTool`] with a `Deserialize` argument struct (arguments are
//!   decoded before [`TypedTool::call`] runs),
//! - implement [`Tool`] directly against the raw argument map,
//! - wrap a closure in a [`FunctionTool`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::ToolError;
use crate::parse::ToolCall;

/// A type alias for `Result<T, ToolError>`.
pub type ToolResult<T> = Result<T, ToolError>;

/// Keyword arguments passed to a tool.
pub type ToolArgs = Map<String, Value>;

/// Definition of a tool as advertised to the model.
///
/// Serializes to the `{name, description, parameters}` object listed in the
/// system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Name of the tool (e.g., "get_weather").
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON schema for the tool's parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Parameter names listed under the schema's `required` array.
    #[must_use]
    pub fn required_parameters(&self) -> Vec<String> {
        required_from_schema(&self.parameters)
    }
}

fn required_from_schema(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Object-safe tool interface used by the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// What the tool does, shown to the model.
    fn description(&self) -> String;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Names of parameters that must be present.
    fn required_parameters(&self) -> Vec<String> {
        required_from_schema(&self.parameters_schema())
    }

    /// Check arguments before invocation.
    ///
    /// The default only checks that every required key is present.
    fn validate(&self, args: &ToolArgs) -> ToolResult<()> {
        let missing: Vec<String> = self
            .required_parameters()
            .into_iter()
            .filter(|key| !args.contains_key(key))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolError::invalid_args(format!(
                "missing required parameter(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Run the tool.
    async fn invoke(&self, args: &ToolArgs) -> ToolResult<Value>;

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters_schema())
    }
}

/// A tool with typed arguments and output.
///
/// Every `TypedTool` is a [`Tool`]; arguments that fail to deserialize into
/// [`TypedTool::Args`] are reported as [`ToolError::InvalidArguments`].
#[async_trait]
pub trait TypedTool: Send + Sync {
    /// Static name of the tool.
    const NAME: &'static str;

    /// Arguments type for the tool.
    type Args: DeserializeOwned + Send;

    /// Output type of the tool.
    type Output: Serialize + Send;

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Get the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with decoded arguments.
    async fn call(&self, args: Self::Args) -> ToolResult<Self::Output>;
}

#[async_trait]
impl<T: TypedTool + 'static> Tool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> String {
        TypedTool::description(self)
    }

    fn parameters_schema(&self) -> Value {
        TypedTool::parameters_schema(self)
    }

    async fn invoke(&self, args: &ToolArgs) -> ToolResult<Value> {
        let typed: T::Args = serde_json::from_value(Value::Object(args.clone()))?;
        let output = self.call(typed).await?;
        serde_json::to_value(output).map_err(|e| ToolError::execution(e.to_string()))
    }
}

/// A boxed dynamic tool that can be used in collections.
pub type BoxedTool = Box<dyn Tool>;

type ToolFn = dyn Fn(&ToolArgs) -> ToolResult<Value> + Send + Sync;

/// A tool backed by a synchronous closure.
///
/// ```rust,ignore
/// let echo = FunctionTool::new(
///     "echo",
///     "Echo the input back",
///     json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
///     |args| Ok(args["text"].clone()),
/// );
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
    func: Arc<ToolFn>,
}

impl FunctionTool {
    /// Create a tool from a closure.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        func: F,
    ) -> Self
    where
        F: Fn(&ToolArgs) -> ToolResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters_schema(&self) -> Value {
        self.parameters.clone()
    }

    async fn invoke(&self, args: &ToolArgs) -> ToolResult<Value> {
        (self.func)(args)
    }
}

/// Ordered set of tools, unique by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// A tool with an existing name replaces the earlier one in place.
    pub fn add<T: Tool + 'static>(&mut self, tool: T) {
        self.add_boxed(Box::new(tool));
    }

    /// Register an already boxed tool.
    pub fn add_boxed(&mut self, tool: BoxedTool) {
        let name = tool.name().to_owned();
        if let Some(&slot) = self.index.get(&name) {
            debug!(tool = %name, "Replacing registered tool");
            self.tools[slot] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.add(tool);
        self
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tool definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve, validate and invoke one call.
    ///
    /// String results are returned as-is; any other JSON value is rendered
    /// as its JSON text.
    ///
    /// # Errors
    ///
    /// [`ToolError::NotFound`] for an unregistered name (nothing is invoked),
    /// [`ToolError::InvalidArguments`] if validation fails, or whatever the
    /// tool itself returns.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::not_found(&call.name))?;
        tool.validate(&call.arguments)?;
        let value = tool.invoke(&call.arguments).await?;
        Ok(match value {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
