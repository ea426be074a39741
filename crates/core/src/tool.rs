//! Tool trait and the registry that dispatches model-issued tool calls.
//!
//! The registry is built once at startup and passed explicitly into the
//! turn loop; lookups are by the tool's advertised name.

use crate::error::ToolError;
use crate::message::ToolCall;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Named parameters decoded from a tool call's argument string.
pub type ToolArgs = Map<String, Value>;

/// A capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name advertised to the model (e.g. `search_products`).
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    ///
    /// `None` for tools that take no parameters.
    fn parameters_schema(&self) -> Option<Value>;

    /// Execute the tool. The result is handed back to the model unchanged.
    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Maps tool names to implementations.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool schemas in name order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve and run a tool call issued by the model.
    ///
    /// The argument string must decode to a JSON object. `extra` parameters
    /// are merged over the decoded ones before invocation. Errors raised by
    /// the tool body are returned as-is.
    pub async fn execute_tool_call(
        &self,
        call: &ToolCall,
        agent_name: &str,
        extra: ToolArgs,
    ) -> Result<Value, ToolError> {
        let mut args = parse_arguments(call)?;

        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        args.extend(extra);

        let shown = Value::Object(args.clone());
        debug!(agent = agent_name, tool = %call.name, args = %shown, "Invoking tool");

        tool.execute(args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a call's argument string into named parameters.
pub fn parse_arguments(call: &ToolCall) -> Result<ToolArgs, ToolError> {
    match serde_json::from_str::<Value>(&call.arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::MalformedArguments {
            tool_name: call.name.clone(),
            reason: format!("expected a JSON object, got {other}"),
        }),
        Err(e) => Err(ToolError::MalformedArguments {
            tool_name: call.name.clone(),
            reason: e.to_string(),
        }),
    }
}
