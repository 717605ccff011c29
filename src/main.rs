//! Tool SONAR Server - Binary Entry Point
//!
//! This is the main entry point for the sonar-server binary.

use std::sync::Arc;

use tracing::{error, info};

use tool_sonar::config::Config;
use tool_sonar::embedder::KeywordEmbedder;
use tool_sonar::metrics::MetricsStore;
use tool_sonar::protocol::ServerInfo;
use tool_sonar::selector::Sonar;
use tool_sonar::server::McpServer;
use tool_sonar::tools::{builtin_catalog, register_all_tools};
use tool_sonar::types::McpResult;
use tool_sonar::utils::init_tracing;

#[tokio::main]
async fn main() -> McpResult<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };
    init_tracing(&config.log_level);
    let source = Config::path_from_env();
    info!("Configuration: {}", config.describe(source.as_deref()));

    let metrics = Arc::new(MetricsStore::new());
    let embedder = Arc::new(KeywordEmbedder::new(
        tool_sonar::embedder::DEFAULT_DIMENSIONS,
        config.selection.min_similarity_threshold,
    ));
    let sonar = Arc::new(
        Sonar::new(config.selection.clone(), embedder, Arc::clone(&metrics))
            .with_tools(builtin_catalog())?,
    );

    let server_info = ServerInfo::new("tool-sonar".to_string(), tool_sonar::VERSION.to_string());
    let server = McpServer::with_info(server_info, config.server.clone()).with_metrics(metrics);

    // Register all 7 built-in tools
    register_all_tools(&server, sonar);

    let shutdown = server.shutdown_handle();
    ctrlc::set_handler(move || {
        info!("Interrupt received, shutting down");
        shutdown.trigger();
    })?;

    server.run().await
}
