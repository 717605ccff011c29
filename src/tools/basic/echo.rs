//! Echo tool

use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::protocol::{HandlerResult, McpTool, Tool};
use crate::types::{ParamSpec, ToolSpec};

/// Returns its arguments unchanged under `echo`
pub struct EchoTool;

impl EchoTool {
    pub fn new() -> Self {
        Self
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new("echo", "Echo", "utility")
            .with_description("Echo the given arguments back to the caller unchanged")
            .with_param(ParamSpec::new("message").described("Text to echo back"))
            .with_example(json!({"message": "hello"}))
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for EchoTool {
    fn definition(&self) -> McpTool {
        let spec = Self::spec();
        McpTool::new(spec.id.clone(), spec.description.clone(), spec.input_schema())
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move { HandlerResult::Ok(json!({ "echo": params })) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_arguments() {
        let out = EchoTool::new().execute(json!({"x": [1, 2]})).await.unwrap();
        assert_eq!(out, json!({"echo": {"x": [1, 2]}}));
    }
}
