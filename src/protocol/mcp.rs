//! MCP tool definitions and the handler capability

use std::future::Future;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::BoxError;

/// Maximum stored description length, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Result returned by a tool handler
pub type HandlerResult = Result<Value, BoxError>;

/// MCP Tool definition
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl McpTool {
    /// Create a new MCP tool definition
    pub fn new(name: String, description: String, input_schema: Value) -> Self {
        Self {
            name,
            description,
            input_schema,
        }
    }

    /// Create a definition whose description is cut to
    /// [`MAX_DESCRIPTION_CHARS`] characters plus an ellipsis marker
    pub fn truncated(name: String, description: &str, input_schema: Value) -> Self {
        Self::new(name, truncate_description(description), input_schema)
    }
}

/// Cut a description to [`MAX_DESCRIPTION_CHARS`] characters, appending `...`
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        let mut cut: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        description.to_string()
    }
}

/// Server information reported in logs
#[derive(Clone, Debug)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    /// Create new server info
    pub fn new(name: String, version: String) -> Self {
        Self { name, version }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "tool-sonar".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Invocation capability attached to a registered tool
pub trait ToolHandler: Send + Sync {
    fn invoke(&self, arguments: Value) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> ToolHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn invoke(&self, arguments: Value) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(arguments))
    }
}

/// Trait for self-describing tools
///
/// A `Tool` supplies its own definition and execution; the registry wraps it
/// into a [`ToolHandler`].
pub trait Tool: Send + Sync {
    /// Get the tool definition for tools/list
    fn definition(&self) -> McpTool;

    /// Execute the tool with the given parameters
    fn execute(&self, params: Value) -> BoxFuture<'_, HandlerResult>;

    /// Get the tool name (convenience method)
    fn name(&self) -> String {
        self.definition().name
    }

    /// Whether calls to this tool feed the attached metrics store.
    ///
    /// Control tools that are not selection candidates return `false`.
    fn tracks_metrics(&self) -> bool {
        true
    }
}
