//! Selection audit types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tool chosen by a selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTool {
    pub id: String,
    pub name: String,
    pub category: String,
    pub score: f64,
}

/// Runner-up candidate of a selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub id: String,
    pub name: String,
    pub score: f64,
    pub category: String,
}

/// Per-signal scores behind a ranking decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub semantic: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<f64>,
    pub diversity: f64,
    pub quality: f64,
}

/// One audit entry per successful selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub selection_id: String,
    pub query: String,
    pub selected_tool: SelectedTool,
    pub alternatives: Vec<Alternative>,
    pub score_components: ScoreBreakdown,
    pub candidates_evaluated: usize,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub processing_time_ms: f64,
}

/// Outcome details returned next to the selected tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionInfo {
    Selected(SelectionRecord),
    Rejected { selection_id: String, error: String },
}

impl SelectionInfo {
    pub fn selection_id(&self) -> &str {
        match self {
            SelectionInfo::Selected(record) => &record.selection_id,
            SelectionInfo::Rejected { selection_id, .. } => selection_id,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SelectionInfo::Selected(_) => None,
            SelectionInfo::Rejected { error, .. } => Some(error),
        }
    }

    pub fn record(&self) -> Option<&SelectionRecord> {
        match self {
            SelectionInfo::Selected(record) => Some(record),
            SelectionInfo::Rejected { .. } => None,
        }
    }
}

/// Aggregate view over the selector's state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorStats {
    pub total_tools: usize,
    pub network_metrics_tracked: usize,
    pub selection_history_count: usize,
    pub avg_selection_time_ms: f64,
    pub tool_usage_distribution: HashMap<String, usize>,
}
