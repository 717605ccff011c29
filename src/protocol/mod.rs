//! Protocol types for the newline-delimited JSON tool protocol
//!
//! This module contains the wire messages, tool definitions, the handler
//! capability and the line framing used by both server and client.

mod framing;
mod mcp;
mod message;

pub use framing::{write_message, Frame, FrameReader, MAX_MESSAGE_BYTES};
pub use mcp::{
    truncate_description, HandlerResult, McpTool, ServerInfo, Tool, ToolHandler,
    MAX_DESCRIPTION_CHARS,
};
pub use message::{message_type, CallOutcome, CallStatus, Message, PROTOCOL_VERSION};
