//! Context filtering ahead of ranking

use serde::{Deserialize, Serialize};

use crate::types::ToolSpec;

/// Constraints a caller places on candidate tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionContext {
    /// Case-insensitive category match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Parameter names every candidate must declare
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_params: Vec<String>,
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_required_param(mut self, name: impl Into<String>) -> Self {
        self.required_params.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.required_params.is_empty()
    }

    /// Whether `tool` satisfies every constraint
    pub fn matches(&self, tool: &ToolSpec) -> bool {
        if let Some(category) = &self.category {
            if tool.category.to_lowercase() != category.to_lowercase() {
                return false;
            }
        }
        if self.required_params.is_empty() {
            return true;
        }
        let declared = tool.param_names_lower();
        self.required_params
            .iter()
            .all(|p| declared.contains(&p.to_lowercase()))
    }
}

/// Tools satisfying `context`, in catalog order. No context keeps everything.
pub fn filter_by_context(tools: &[ToolSpec], context: Option<&SelectionContext>) -> Vec<ToolSpec> {
    match context {
        Some(ctx) if !ctx.is_empty() => tools.iter().filter(|t| ctx.matches(t)).cloned().collect(),
        _ => tools.to_vec(),
    }
}
