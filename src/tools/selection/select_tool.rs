//! Select tool: runs a SONAR selection for a query

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::{HandlerResult, McpTool, Tool};
use crate::selector::{SelectionContext, Sonar};

#[derive(Deserialize)]
struct SelectArgs {
    query: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    required_params: Vec<String>,
    #[serde(default = "enabled")]
    use_semantic: bool,
    #[serde(default = "enabled")]
    use_network: bool,
}

fn enabled() -> bool {
    true
}

/// Tool that picks the best catalog tool for a natural-language query
pub struct SelectToolTool {
    sonar: Arc<Sonar>,
}

impl SelectToolTool {
    pub fn new(sonar: Arc<Sonar>) -> Self {
        Self { sonar }
    }

    async fn invoke(&self, params: Value) -> HandlerResult {
        let args: SelectArgs = serde_json::from_value(params)?;
        let context = SelectionContext {
            category: args.category,
            required_params: args.required_params,
        };

        // Ranking is CPU-bound and may fan out over rayon
        let sonar = Arc::clone(&self.sonar);
        let (tool, info) = tokio::task::spawn_blocking(move || {
            sonar.select_tool(&args.query, Some(&context), args.use_semantic, args.use_network)
        })
        .await?;

        Ok(json!({
            "tool": tool,
            "selection": info,
        }))
    }
}

impl Tool for SelectToolTool {
    fn definition(&self) -> McpTool {
        McpTool {
            name: "select_tool".to_string(),
            description: "Select the most suitable tool for a query, blending semantic relevance, network reliability, usage diversity and description quality".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "What the caller wants to do" },
                    "category": { "type": "string", "description": "Only consider tools in this category" },
                    "required_params": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Parameter names the tool must accept"
                    },
                    "use_semantic": { "type": "boolean", "description": "Rank by semantic similarity (default true)" },
                    "use_network": { "type": "boolean", "description": "Include network reliability (default true)" }
                },
                "required": ["query"]
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
