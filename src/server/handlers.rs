//! Request dispatch for the protocol server
//!
//! Turns one request line into exactly one response message. Nothing in
//! here ends a connection: every failure becomes an `error` message.

use tracing::debug;

use crate::protocol::Message;
use crate::registry::ToolRegistry;
use crate::types::McpError;

/// Handle one non-blank request line
pub async fn dispatch(registry: &ToolRegistry, line: &str) -> Message {
    let request = match Message::decode(line) {
        Ok(request) => request,
        Err(e) => return Message::error(error_text(e)),
    };

    match request {
        Message::ListTools => {
            let tools = registry.list();
            debug!("Listing {} tool(s)", tools.len());
            Message::tools_list(tools)
        }
        Message::CallTool { tool, arguments } => {
            debug!("Calling '{}'", tool);
            Message::CallToolResponse(registry.call(&tool, arguments).await)
        }
        other => Message::error(format!("Unknown message type: {}", other.message_type())),
    }
}

/// Response to a line that exceeded the frame limit
pub fn oversized(size: usize, limit: usize) -> Message {
    Message::error(format!(
        "Message of {} bytes exceeds the {} byte limit",
        size, limit
    ))
}

/// Wire text for a decode failure, without the error-kind prefix
fn error_text(err: McpError) -> String {
    match err {
        McpError::Framing(detail) => detail,
        other => other.to_string(),
    }
}
