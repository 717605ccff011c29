//! Selection tools exposing the SONAR engine over the wire

mod report_outcome;
mod select_tool;
mod selector_stats;

pub use report_outcome::ReportOutcomeTool;
pub use select_tool::SelectToolTool;
pub use selector_stats::SelectorStatsTool;
