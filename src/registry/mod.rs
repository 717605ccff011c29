//! Tool registry
//!
//! In-memory catalog mapping tool names to their wire definition and an
//! invocation handler. Registration order is preserved for `list()`.
//! Calls never fail at this boundary: every outcome, including an unknown
//! tool or a panicking handler, comes back as a [`CallOutcome`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::metrics::MetricsStore;
use crate::protocol::{CallOutcome, McpTool, Message, Tool, ToolHandler};
use crate::server::Broadcaster;
use crate::types::{BoxError, McpError, ServerStats};
use crate::utils::elapsed_ms;

/// A registered tool: its wire definition plus handler
#[derive(Clone)]
pub struct ToolRegistration {
    pub definition: McpTool,
    pub handler: Arc<dyn ToolHandler>,
    /// Calls are recorded in the attached metrics store
    pub tracked: bool,
}

#[derive(Default)]
struct Catalog {
    order: Vec<String>,
    entries: HashMap<String, ToolRegistration>,
}

#[derive(Default)]
struct CallCounters {
    tools_registered: AtomicU64,
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
}

/// Adapts a self-describing [`Tool`] into a handler
struct ToolAdapter(Arc<dyn Tool>);

impl ToolHandler for ToolAdapter {
    fn invoke(&self, arguments: Value) -> futures::future::BoxFuture<'static, crate::protocol::HandlerResult> {
        let tool = Arc::clone(&self.0);
        Box::pin(async move { tool.execute(arguments).await })
    }
}

/// Registry of callable tools
pub struct ToolRegistry {
    catalog: RwLock<Catalog>,
    counters: CallCounters,
    broadcaster: Arc<Broadcaster>,
    metrics: OnceLock<Arc<MetricsStore>>,
}

impl ToolRegistry {
    /// Create an empty registry that announces registrations on `broadcaster`
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            counters: CallCounters::default(),
            broadcaster,
            metrics: OnceLock::new(),
        }
    }

    /// Feed every call outcome into `metrics`
    pub fn with_metrics(self, metrics: Arc<MetricsStore>) -> Self {
        self.attach_metrics(metrics);
        self
    }

    /// Attach a metrics store after construction.
    ///
    /// Only the first store sticks; returns `false` if one was already set.
    pub fn attach_metrics(&self, metrics: Arc<MetricsStore>) -> bool {
        self.metrics.set(metrics).is_ok()
    }

    /// Register a tool.
    ///
    /// Returns `false` without touching the catalog when `name` is taken.
    pub fn register(
        &self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> bool {
        self.insert(name, description, input_schema, handler, true)
    }

    fn insert(
        &self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
        tracked: bool,
    ) -> bool {
        let definition = McpTool::truncated(name.to_string(), description, input_schema);
        {
            let mut catalog = self.catalog.write();
            if catalog.entries.contains_key(name) {
                warn!("{}", McpError::DuplicateRegistration(name.to_string()));
                return false;
            }
            catalog.order.push(name.to_string());
            catalog.entries.insert(
                name.to_string(),
                ToolRegistration {
                    definition: definition.clone(),
                    handler,
                    tracked,
                },
            );
        }

        self.counters.tools_registered.fetch_add(1, Ordering::SeqCst);
        info!("Tool '{}' registered", name);

        let delivered = self.broadcaster.notify(Message::tool_registered(definition));
        debug!("Registration of '{}' announced to {} client(s)", name, delivered);
        true
    }

    /// Register a self-describing tool
    pub fn register_tool(&self, tool: Box<dyn Tool>) -> bool {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        let definition = tool.definition();
        let tracked = tool.tracks_metrics();
        self.insert(
            &definition.name,
            &definition.description,
            definition.input_schema,
            Arc::new(ToolAdapter(tool)),
            tracked,
        )
    }

    /// Snapshot of all registered tools in registration order
    pub fn list(&self) -> Vec<McpTool> {
        let catalog = self.catalog.read();
        catalog
            .order
            .iter()
            .filter_map(|name| catalog.entries.get(name))
            .map(|r| r.definition.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<ToolRegistration> {
        self.catalog.read().entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalog.read().entries.contains_key(name)
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.catalog.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke a tool by name
    pub async fn call(&self, name: &str, arguments: Value) -> CallOutcome {
        self.counters.total_calls.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        let entry = self
            .catalog
            .read()
            .entries
            .get(name)
            .map(|r| (Arc::clone(&r.handler), r.tracked));
        let Some((handler, tracked)) = entry else {
            self.counters.failed_calls.fetch_add(1, Ordering::SeqCst);
            let err = McpError::NotFound(name.to_string());
            warn!("{}", err);
            return CallOutcome::failure(name, err.to_string(), elapsed_ms(started));
        };

        let result = AssertUnwindSafe(handler.invoke(arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(panic_message(panic)));
        let execution_time_ms = elapsed_ms(started);

        let outcome = match result {
            Ok(value) => {
                self.counters.successful_calls.fetch_add(1, Ordering::SeqCst);
                debug!("Tool '{}' succeeded in {:.1}ms", name, execution_time_ms);
                CallOutcome::success(name, value, execution_time_ms)
            }
            Err(e) => {
                self.counters.failed_calls.fetch_add(1, Ordering::SeqCst);
                let err = McpError::HandlerFailure(e.to_string());
                error!("Tool '{}' failed: {}", name, err);
                CallOutcome::failure(name, err.to_string(), execution_time_ms)
            }
        };

        if let Some(metrics) = self.metrics.get().filter(|_| tracked) {
            if let Err(e) = metrics.update(name, execution_time_ms, outcome.is_success()) {
                warn!("Metrics for '{}' not recorded: {}", name, e);
            }
        }
        outcome
    }

    /// Counters combined with connection-level figures from the server
    pub fn stats(&self, clients: usize, dropped_notifications: u64) -> ServerStats {
        let total = self.counters.total_calls.load(Ordering::SeqCst);
        let successful = self.counters.successful_calls.load(Ordering::SeqCst);
        ServerStats {
            tools_registered: self.counters.tools_registered.load(Ordering::SeqCst),
            total_calls: total,
            successful_calls: successful,
            failed_calls: self.counters.failed_calls.load(Ordering::SeqCst),
            clients,
            success_rate: ServerStats::compute_success_rate(successful, total),
            dropped_notifications,
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> BoxError {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("handler panicked: {}", detail).into()
}
