//! Data types for the tool selection server
//!
//! This module contains the core data structures shared by the registry,
//! the transport and the selector.

mod error;
mod selection;
mod stats;
mod tool;

pub use error::{BoxError, McpError, McpResult};
pub use selection::{
    Alternative, ScoreBreakdown, SelectedTool, SelectionInfo, SelectionRecord, SelectorStats,
};
pub use stats::ServerStats;
pub use tool::{ParamSpec, ToolSpec};
