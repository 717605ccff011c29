//! Tool SONAR
//!
//! A tool selection engine and the newline-delimited JSON protocol it is
//! served over, in pure Rust on tokio.
//!
//! # Features
//!
//! - **Tool protocol**: TCP server and client exchanging one JSON object per line
//! - **Registry**: insertion-ordered catalog with panic-safe invocation and call counters
//! - **Notifications**: tool registrations are broadcast to every connected client
//! - **SONAR selection**: semantic relevance, network reliability, usage
//!   diversity and description quality blended into one score
//! - **Learning**: reported call outcomes shift future selections
//!
//! # Modules
//!
//! - `types`: Core data structures (ToolSpec, SelectionRecord, ServerStats, errors)
//! - `protocol`: Wire messages, tool definitions and line framing
//! - `registry`: Tool registry and invocation
//! - `server`: TCP protocol server and notification broadcaster
//! - `client`: Protocol client
//! - `metrics`: Per-tool latency and success history
//! - `embedder`: Embedding boundary and keyword embedder
//! - `selector`: The SONAR selection engine
//! - `tools`: Built-in tools
//! - `config`: Configuration from defaults, file and environment
//! - `utils`: Timestamps and logging setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tool_sonar::config::Config;
//! use tool_sonar::tools::{builtin_catalog, register_all_tools};
//! use tool_sonar::{KeywordEmbedder, McpServer, MetricsStore, Sonar};
//!
//! #[tokio::main]
//! async fn main() -> tool_sonar::McpResult<()> {
//!     let config = Config::default();
//!     let metrics = Arc::new(MetricsStore::new());
//!     let sonar = Arc::new(
//!         Sonar::new(config.selection.clone(), Arc::new(KeywordEmbedder::default()), metrics.clone())
//!             .with_tools(builtin_catalog())?,
//!     );
//!     let server = McpServer::new(config.server).with_metrics(metrics);
//!     register_all_tools(&server, sonar);
//!     server.run().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod embedder;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod selector;
pub mod server;
pub mod tools;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use client::McpClient;
pub use config::Config;
pub use embedder::{Embedder, KeywordEmbedder};
pub use metrics::{MetricsStore, NetworkMetrics};
pub use protocol::{CallOutcome, McpTool, Message, ServerInfo, Tool, ToolHandler};
pub use registry::ToolRegistry;
pub use selector::{SelectionContext, Sonar};
pub use server::{McpServer, ShutdownHandle};
pub use types::{
    McpError, McpResult, ParamSpec, SelectionInfo, SelectionRecord, SelectorStats, ServerStats,
    ToolSpec,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
