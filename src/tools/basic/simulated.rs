//! Simulated tools with fixed latency and failure profiles
//!
//! Stand-ins for remote APIs so the selector has something with real
//! reliability differences to learn from. Failures are deterministic: a tool
//! with `fail_every = n` fails on every n-th call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;

use super::text_content;
use crate::protocol::{HandlerResult, McpTool, Tool};
use crate::types::{ParamSpec, ToolSpec};

/// Latency and failure behavior of a simulated tool
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub latency: Duration,
    pub fail_every: Option<u64>,
}

impl Profile {
    pub fn fast_unstable() -> Self {
        Self {
            name: "fast_unstable",
            label: "FastUnstable",
            description: "Fast but unstable lookup tool, roughly 100 ms per call",
            latency: Duration::from_millis(100),
            fail_every: Some(10),
        }
    }

    pub fn medium() -> Self {
        Self {
            name: "medium",
            label: "Medium",
            description: "Lookup tool with medium speed and medium stability",
            latency: Duration::from_millis(250),
            fail_every: Some(10),
        }
    }

    pub fn slow_stable() -> Self {
        Self {
            name: "slow_stable",
            label: "SlowStable",
            description: "Slow but stable lookup tool, roughly 500 ms per call",
            latency: Duration::from_millis(500),
            fail_every: None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::fast_unstable(), Self::medium(), Self::slow_stable()]
    }
}

#[derive(Deserialize)]
struct QueryArgs {
    #[serde(default)]
    query: String,
}

/// A tool that sleeps for its profile latency and sometimes fails
pub struct SimulatedTool {
    profile: Profile,
    calls: AtomicU64,
}

impl SimulatedTool {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            calls: AtomicU64::new(0),
        }
    }

    /// Same failure pattern with a different latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.profile.latency = latency;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn spec(profile: &Profile) -> ToolSpec {
        ToolSpec::new(profile.name, profile.label, "search")
            .with_description(profile.description)
            .with_param(
                ParamSpec::new("query")
                    .required()
                    .described("Free-text query to look up"),
            )
    }
}

impl Tool for SimulatedTool {
    fn definition(&self) -> McpTool {
        let spec = Self::spec(&self.profile);
        McpTool::new(spec.id.clone(), spec.description.clone(), spec.input_schema())
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, HandlerResult> {
        Box::pin(self.invoke(params))
    }
}

impl SimulatedTool {
    async fn invoke(&self, params: Value) -> HandlerResult {
        let args: QueryArgs = serde_json::from_value(params)?;
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.profile.latency).await;

        if let Some(every) = self.profile.fail_every {
            if every > 0 && call % every == 0 {
                return Err(format!("{} tool failed", self.profile.label).into());
            }
        }
        Ok(text_content(format!(
            "[{}] Result for '{}'",
            self.profile.label, args.query
        )))
    }
}
