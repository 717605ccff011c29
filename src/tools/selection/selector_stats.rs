//! Selector statistics tool

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Value};

use crate::protocol::{HandlerResult, McpTool, Tool};
use crate::selector::Sonar;

/// Tool reporting selection statistics and per-tool reliability
pub struct SelectorStatsTool {
    sonar: Arc<Sonar>,
}

impl SelectorStatsTool {
    pub fn new(sonar: Arc<Sonar>) -> Self {
        Self { sonar }
    }

    async fn invoke(&self, _params: Value) -> HandlerResult {
        Ok(json!({
            "statistics": self.sonar.statistics(),
            "categories": self.sonar.categories(),
            "metrics": self.sonar.metrics().snapshot(),
        }))
    }
}

impl Tool for SelectorStatsTool {
    fn definition(&self) -> McpTool {
        McpTool {
            name: "selector_stats".to_string(),
            description: "Get selection statistics, catalog categories and per-tool network reliability".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
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
