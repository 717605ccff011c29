//! Report outcome tool

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::{HandlerResult, McpTool, Tool};
use crate::selector::Sonar;

#[derive(Deserialize)]
struct OutcomeArgs {
    tool_id: String,
    latency_ms: f64,
    success: bool,
}

/// Tool for feeding an observed call outcome into the reliability metrics
pub struct ReportOutcomeTool {
    sonar: Arc<Sonar>,
}

impl ReportOutcomeTool {
    pub fn new(sonar: Arc<Sonar>) -> Self {
        Self { sonar }
    }

    async fn invoke(&self, params: Value) -> HandlerResult {
        let args: OutcomeArgs = serde_json::from_value(params)?;
        self.sonar
            .report_outcome(&args.tool_id, args.latency_ms, args.success)?;
        let reliability = self.sonar.metrics().reliability_score(&args.tool_id);

        Ok(json!({
            "recorded": true,
            "tool_id": args.tool_id,
            "reliability_score": reliability,
        }))
    }
}

impl Tool for ReportOutcomeTool {
    fn definition(&self) -> McpTool {
        McpTool {
            name: "report_outcome".to_string(),
            description: "Record the latency and success of a tool call so future selections learn from it".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tool_id": { "type": "string", "description": "Id of the tool that was called" },
                    "latency_ms": { "type": "number", "description": "Observed latency in milliseconds" },
                    "success": { "type": "boolean", "description": "Whether the call succeeded" }
                },
                "required": ["tool_id", "latency_ms", "success"]
            }),
        }
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, HandlerResult> {
        Box::pin(self.invoke(params))
    }

    fn tracks_metrics(&self) -> bool {
        false
    }
}
