//! Built-in tools
//!
//! Two groups:
//! - Basic tools: `echo` and the simulated lookup tools (`fast_unstable`,
//!   `medium`, `slow_stable`). These form the selector's default catalog.
//! - Selection tools: `select_tool`, `report_outcome`, `selector_stats`,
//!   which expose the SONAR engine to protocol clients.

pub mod basic;
pub mod selection;

use std::sync::Arc;

use tracing::info;

use crate::selector::Sonar;
use crate::server::McpServer;
use crate::types::ToolSpec;

// Re-export all tools for convenience
pub use basic::{text_content, EchoTool, Profile, SimulatedTool};
pub use selection::{ReportOutcomeTool, SelectToolTool, SelectorStatsTool};

/// Catalog entries for the basic tools, for seeding the selector
pub fn builtin_catalog() -> Vec<ToolSpec> {
    let mut catalog = vec![EchoTool::spec()];
    catalog.extend(Profile::all().iter().map(SimulatedTool::spec));
    catalog
}

/// Register all tools with the server; returns how many were added
pub fn register_all_tools(server: &McpServer, sonar: Arc<Sonar>) -> usize {
    let mut registered = 0;
    let mut add = |ok: bool| registered += ok as usize;

    // Basic tools (4)
    add(server.register_tool(Box::new(EchoTool::new())));
    for profile in Profile::all() {
        add(server.register_tool(Box::new(SimulatedTool::new(profile))));
    }

    // Selection tools (3)
    add(server.register_tool(Box::new(SelectToolTool::new(sonar.clone()))));
    add(server.register_tool(Box::new(ReportOutcomeTool::new(sonar.clone()))));
    add(server.register_tool(Box::new(SelectorStatsTool::new(sonar))));

    info!("Registered {} built-in tool(s)", registered);
    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SelectionConfig, ServerConfig};
    use crate::embedder::KeywordEmbedder;
    use crate::metrics::MetricsStore;
    use serde_json::json;

    fn sonar() -> Arc<Sonar> {
        Arc::new(
            Sonar::new(
                SelectionConfig::default(),
                Arc::new(KeywordEmbedder::default()),
                Arc::new(MetricsStore::new()),
            )
            .with_tools(builtin_catalog())
            .unwrap(),
        )
    }

    #[test]
    fn test_builtin_catalog_ids() {
        let ids: Vec<String> = builtin_catalog().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["echo", "fast_unstable", "medium", "slow_stable"]);
    }

    #[test]
    fn test_register_all_tools_once() {
        let server = McpServer::new(ServerConfig::default());
        let sonar = sonar();
        assert_eq!(register_all_tools(&server, Arc::clone(&sonar)), 7);
        assert_eq!(register_all_tools(&server, sonar), 0);
        assert_eq!(server.tool_count(), 7);
    }

    #[tokio::test]
    async fn test_select_tool_over_registry() {
        let server = McpServer::new(ServerConfig::default());
        register_all_tools(&server, sonar());

        let outcome = server
            .registry()
            .call("select_tool", json!({"query": "echo the message back"}))
            .await;
        assert!(outcome.is_success(), "{:?}", outcome.error);
        let result = outcome.result.unwrap();
        assert_eq!(result["tool"]["id"], "echo");
        assert_eq!(result["selection"]["selection_id"], "sel_0");
    }

    #[tokio::test]
    async fn test_report_outcome_validates_arguments() {
        let server = McpServer::new(ServerConfig::default());
        let sonar = sonar();
        register_all_tools(&server, Arc::clone(&sonar));

        let missing = server
            .registry()
            .call("report_outcome", json!({"tool_id": "medium"}))
            .await;
        assert!(!missing.is_success());

        let negative = server
            .registry()
            .call(
                "report_outcome",
                json!({"tool_id": "medium", "latency_ms": -5.0, "success": true}),
            )
            .await;
        assert!(!negative.is_success());
        assert!(negative.error.unwrap().contains("Invalid latency"));
        assert!(sonar.metrics().get("medium").is_none());

        let ok = server
            .registry()
            .call(
                "report_outcome",
                json!({"tool_id": "medium", "latency_ms": 0.0, "success": true}),
            )
            .await;
        assert!(ok.is_success());
        assert_eq!(ok.result.unwrap()["reliability_score"], json!(1.0));
        assert_eq!(sonar.metrics().get("medium").unwrap().call_count, 1);

        let stats = server.registry().call("selector_stats", json!({})).await;
        assert_eq!(stats.result.unwrap()["statistics"]["total_tools"], 4);
    }
}
