//! Wire messages exchanged between client and server
//!
//! Every message is a single JSON object with a `type` tag, written as one
//! line terminated by `\n`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::mcp::McpTool;
use crate::types::{McpError, McpResult};
use crate::utils::now_rfc3339;

/// Opaque version string exchanged for compatibility signaling
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Message type tags
pub mod message_type {
    pub const LIST_TOOLS: &str = "tools/list";
    pub const TOOLS_LIST: &str = "tools/list/response";
    pub const CALL_TOOL: &str = "tools/call";
    pub const CALL_TOOL_RESPONSE: &str = "tools/call/response";
    pub const ERROR: &str = "error";
    pub const TOOL_REGISTERED: &str = "notification/tool_registered";
}

/// Status of a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Success,
    Error,
}

/// Result of one registry call, as carried by `tools/call/response`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool: String,
    pub execution_time_ms: f64,
    pub timestamp: String,
}

impl CallOutcome {
    pub fn success(tool: &str, result: Value, execution_time_ms: f64) -> Self {
        Self {
            status: CallStatus::Success,
            result: Some(result),
            error: None,
            tool: tool.to_string(),
            execution_time_ms,
            timestamp: now_rfc3339(),
        }
    }

    pub fn failure(tool: &str, error: impl Into<String>, execution_time_ms: f64) -> Self {
        Self {
            status: CallStatus::Error,
            result: None,
            error: Some(error.into()),
            tool: tool.to_string(),
            execution_time_ms,
            timestamp: now_rfc3339(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "tools/list")]
    ListTools,

    #[serde(rename = "tools/list/response")]
    ToolsList {
        tools: Vec<McpTool>,
        protocol_version: String,
        timestamp: String,
    },

    #[serde(rename = "tools/call")]
    CallTool {
        tool: String,
        #[serde(default = "empty_arguments")]
        arguments: Value,
    },

    #[serde(rename = "tools/call/response")]
    CallToolResponse(CallOutcome),

    #[serde(rename = "error")]
    Error { error: String, timestamp: String },

    #[serde(rename = "notification/tool_registered")]
    ToolRegistered { tool: McpTool, timestamp: String },
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Message {
    pub fn call_tool(tool: impl Into<String>, arguments: Value) -> Self {
        Message::CallTool {
            tool: tool.into(),
            arguments,
        }
    }

    pub fn tools_list(tools: Vec<McpTool>) -> Self {
        Message::ToolsList {
            tools,
            protocol_version: PROTOCOL_VERSION.to_string(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Message::Error {
            error: message.into(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn tool_registered(tool: McpTool) -> Self {
        Message::ToolRegistered {
            tool,
            timestamp: now_rfc3339(),
        }
    }

    /// The `type` tag of this message
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::ListTools => message_type::LIST_TOOLS,
            Message::ToolsList { .. } => message_type::TOOLS_LIST,
            Message::CallTool { .. } => message_type::CALL_TOOL,
            Message::CallToolResponse(_) => message_type::CALL_TOOL_RESPONSE,
            Message::Error { .. } => message_type::ERROR,
            Message::ToolRegistered { .. } => message_type::TOOL_REGISTERED,
        }
    }

    /// Client-to-server request
    pub fn is_request(&self) -> bool {
        matches!(self, Message::ListTools | Message::CallTool { .. })
    }

    /// Unsolicited server-to-client message
    pub fn is_notification(&self) -> bool {
        matches!(self, Message::ToolRegistered { .. })
    }

    /// Serialize to one wire line, newline included
    pub fn encode(&self) -> McpResult<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parse one wire line.
    ///
    /// Malformed JSON, an unknown `type` tag and a known tag with bad fields
    /// are reported as distinct framing errors.
    pub fn decode(line: &str) -> McpResult<Message> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| McpError::Framing(format!("Invalid JSON: {}", e)))?;

        let msg_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_string);
        match msg_type.as_deref() {
            Some(
                message_type::LIST_TOOLS
                | message_type::TOOLS_LIST
                | message_type::CALL_TOOL
                | message_type::CALL_TOOL_RESPONSE
                | message_type::ERROR
                | message_type::TOOL_REGISTERED,
            ) => serde_json::from_value(value)
                .map_err(|e| McpError::Framing(format!("Invalid message: {}", e))),
            Some(other) => Err(McpError::Framing(format!(
                "Unknown message type: {}",
                other
            ))),
            None => Err(McpError::Framing(
                "Unknown message type: missing 'type' field".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_tool_round_trip() {
        let msg = Message::call_tool("echo", json!({"x": 1, "nested": {"y": [1, 2]}}));
        let line = msg.encode().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        match Message::decode(&line).unwrap() {
            Message::CallTool { tool, arguments } => {
                assert_eq!(tool, "echo");
                assert_eq!(arguments, json!({"x": 1, "nested": {"y": [1, 2]}}));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_list_request_wire_form() {
        let line = Message::ListTools.encode().unwrap();
        assert_eq!(line, "{\"type\":\"tools/list\"}\n");
        assert_eq!(Message::decode(&line).unwrap(), Message::ListTools);
    }

    #[test]
    fn test_call_tool_defaults_arguments() {
        let msg = Message::decode(r#"{"type":"tools/call","tool":"echo"}"#).unwrap();
        assert_eq!(msg, Message::call_tool("echo", json!({})));
    }

    #[test]
    fn test_call_response_fields_are_flat() {
        let outcome = CallOutcome::success("echo", json!({"ok": true}), 1.5);
        let value = serde_json::to_value(Message::CallToolResponse(outcome)).unwrap();
        assert_eq!(value["type"], "tools/call/response");
        assert_eq!(value["status"], "success");
        assert_eq!(value["tool"], "echo");
        assert_eq!(value["result"], json!({"ok": true}));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_decode_distinguishes_failures() {
        let invalid = Message::decode("{not json").unwrap_err().to_string();
        assert!(invalid.contains("Invalid JSON"));

        let unknown = Message::decode(r#"{"type":"tools/delete"}"#).unwrap_err().to_string();
        assert!(unknown.contains("Unknown message type: tools/delete"));

        let missing = Message::decode(r#"{"tool":"echo"}"#).unwrap_err().to_string();
        assert!(missing.contains("Unknown message type"));

        let bad_fields = Message::decode(r#"{"type":"tools/call"}"#).unwrap_err().to_string();
        assert!(bad_fields.contains("Invalid message"));
    }

    #[test]
    fn test_message_classification() {
        assert!(Message::ListTools.is_request());
        assert!(!Message::error("x").is_request());
        let note = Message::tool_registered(McpTool::new("a".into(), "b".into(), json!({})));
        assert!(note.is_notification());
        assert_eq!(note.message_type(), message_type::TOOL_REGISTERED);
    }
}
