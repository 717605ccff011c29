//! Error taxonomy shared by the registry, transport and selector

use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by tool handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Errors surfaced by the crate
#[derive(Debug, Error)]
pub enum McpError {
    /// Unknown tool id at call time
    #[error("Tool '{0}' not found")]
    NotFound(String),

    /// A tool with this id is already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateRegistration(String),

    /// Malformed or oversized frame
    #[error("Framing error: {0}")]
    Framing(String),

    /// No response within the deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Peer closed the connection
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Operation needs an open connection
    #[error("Client is not connected")]
    NotConnected,

    /// Selection found nothing to rank
    #[error("No suitable tools found")]
    NoCandidates,

    /// The tool's own execution failed
    #[error("{0}")]
    HandlerFailure(String),

    /// The server answered with an `error` message
    #[error("Server error: {0}")]
    Remote(String),

    /// Catalog entry violates a tool invariant
    #[error("Invalid tool '{id}': {reason}")]
    InvalidTool { id: String, reason: String },

    /// Embedder boundary failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Latency sample that cannot feed the reliability score
    #[error("Invalid latency {0}: expected a finite, non-negative number of milliseconds")]
    InvalidLatency(f64),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl McpError {
    /// Whether this error ends the session it happened on
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            McpError::Timeout(_) | McpError::ConnectionClosed | McpError::Io(_)
        )
    }
}
