//! Network reliability metrics
//!
//! Rolling latency/success history per tool and the reliability score the
//! selector derives from it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::debug;

use crate::types::{McpError, McpResult};

/// History length that triggers a trim
pub const MAX_HISTORY: usize = 1000;
/// Samples kept after a trim
pub const TRIMMED_HISTORY: usize = 500;
/// Samples averaged for latency
pub const LATENCY_WINDOW: usize = 100;
/// Latency at which the latency score reaches zero
pub const LATENCY_CEILING_MS: f64 = 5000.0;

const DEFAULT_LATENCY_MS: f64 = 100.0;
const DEFAULT_SUCCESS_RATE: f64 = 0.8;
const RECENT_USE_WINDOW_HOURS: i64 = 1;

/// One observed call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub latency_ms: f64,
    pub success: bool,
}

/// Per-tool rolling history
#[derive(Debug, Clone, Default)]
pub struct NetworkMetrics {
    samples: Vec<Sample>,
    pub last_call: Option<DateTime<Utc>>,
    pub call_count: u64,
    pub success_count: u64,
}

impl NetworkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call outcome.
    ///
    /// Rejects NaN, infinite and negative latencies without touching the history.
    pub fn update(&mut self, latency_ms: f64, success: bool) -> McpResult<()> {
        check_latency(latency_ms)?;
        self.samples.push(Sample { latency_ms, success });
        self.call_count += 1;
        if success {
            self.success_count += 1;
        }
        self.last_call = Some(Utc::now());

        if self.samples.len() > MAX_HISTORY {
            let excess = self.samples.len() - TRIMMED_HISTORY;
            self.samples.drain(..excess);
        }
        Ok(())
    }

    /// Stored samples, oldest first
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Mean latency of the most recent samples
    pub fn avg_latency(&self) -> f64 {
        if self.samples.is_empty() {
            return DEFAULT_LATENCY_MS;
        }
        let window = &self.samples[self.samples.len().saturating_sub(LATENCY_WINDOW)..];
        window.iter().map(|s| s.latency_ms).sum::<f64>() / window.len() as f64
    }

    pub fn success_rate(&self) -> f64 {
        if self.call_count == 0 {
            return DEFAULT_SUCCESS_RATE;
        }
        self.success_count as f64 / self.call_count as f64
    }

    /// Blend of latency and success rate in [0, 1]
    pub fn reliability_score(&self) -> f64 {
        let latency_score = (1.0 - self.avg_latency() / LATENCY_CEILING_MS).clamp(0.0, 1.0);
        (0.4 * latency_score + 0.6 * self.success_rate()).clamp(0.0, 1.0)
    }

    pub fn is_recently_used(&self) -> bool {
        self.last_call
            .map(|t| Utc::now() - t < Duration::hours(RECENT_USE_WINDOW_HOURS))
            .unwrap_or(false)
    }
}

fn check_latency(latency_ms: f64) -> McpResult<()> {
    if latency_ms.is_finite() && latency_ms >= 0.0 {
        Ok(())
    } else {
        Err(McpError::InvalidLatency(latency_ms))
    }
}

/// Serializable view of one tool's metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tool_id: String,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
    pub reliability_score: f64,
    pub call_count: u64,
    pub success_count: u64,
    pub last_call: Option<DateTime<Utc>>,
}

/// Shared metrics for all tools.
///
/// Updates to one tool are serialized by that tool's entry lock; updates to
/// different tools only contend on the map lock while an entry is created.
#[derive(Default)]
pub struct MetricsStore {
    entries: RwLock<HashMap<String, Arc<Mutex<NetworkMetrics>>>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, tool_id: &str) -> Arc<Mutex<NetworkMetrics>> {
        if let Some(entry) = self.entries.read().get(tool_id) {
            return Arc::clone(entry);
        }
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(tool_id.to_string()).or_default())
    }

    /// Record one call outcome for `tool_id`, creating its entry on first use.
    ///
    /// An invalid latency is rejected before any entry is created.
    pub fn update(&self, tool_id: &str, latency_ms: f64, success: bool) -> McpResult<()> {
        check_latency(latency_ms)?;
        let entry = self.entry(tool_id);
        let mut metrics = entry.lock();
        metrics.update(latency_ms, success)?;
        debug!(
            "Metrics for {}: latency={:.1}ms success={} reliability={:.3}",
            tool_id,
            latency_ms,
            success,
            metrics.reliability_score()
        );
        Ok(())
    }

    /// Copy of a tool's metrics
    pub fn get(&self, tool_id: &str) -> Option<NetworkMetrics> {
        self.entries.read().get(tool_id).map(|m| m.lock().clone())
    }

    pub fn reliability_score(&self, tool_id: &str) -> Option<f64> {
        self.entries
            .read()
            .get(tool_id)
            .map(|m| m.lock().reliability_score())
    }

    /// Number of tools with recorded history
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots of every tracked tool, sorted by id
    pub fn snapshot(&self) -> Vec<MetricsSnapshot> {
        let entries = self.entries.read();
        let mut out: Vec<MetricsSnapshot> = entries
            .iter()
            .map(|(id, m)| {
                let m = m.lock();
                MetricsSnapshot {
                    tool_id: id.clone(),
                    avg_latency_ms: m.avg_latency(),
                    success_rate: m.success_rate(),
                    reliability_score: m.reliability_score(),
                    call_count: m.call_count,
                    success_count: m.success_count,
                    last_call: m.last_call,
                }
            })
            .collect();
        out.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_defaults_without_history() {
        let m = NetworkMetrics::new();
        assert_eq!(m.avg_latency(), 100.0);
        assert_eq!(m.success_rate(), 0.8);
        assert!((m.reliability_score() - (0.4 * 0.98 + 0.6 * 0.8)).abs() < 1e-12);
        assert!(!m.is_recently_used());
    }

    #[test]
    fn test_average_uses_last_hundred_samples() {
        let mut m = NetworkMetrics::new();
        for _ in 0..50 {
            m.update(1000.0, true).unwrap();
        }
        for _ in 0..100 {
            m.update(200.0, true).unwrap();
        }
        assert_eq!(m.avg_latency(), 200.0);
        assert!(m.is_recently_used());
    }

    #[test]
    fn test_trim_keeps_most_recent_in_order() {
        let mut m = NetworkMetrics::new();
        for i in 0..1001 {
            m.update(i as f64, i % 2 == 0).unwrap();
        }
        let samples = m.samples();
        assert!(samples.len() <= MAX_HISTORY);
        assert_eq!(samples.len(), TRIMMED_HISTORY);
        let latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
        let expected: Vec<f64> = (501..1001).map(|i| i as f64).collect();
        assert_eq!(latencies, expected);
        assert_eq!(m.call_count, 1001);
        assert_eq!(m.success_count, 501);
    }

    #[test]
    fn test_no_trim_at_capacity() {
        let mut m = NetworkMetrics::new();
        for i in 0..MAX_HISTORY {
            m.update(i as f64, true).unwrap();
        }
        assert_eq!(m.samples().len(), MAX_HISTORY);
    }

    #[test]
    fn test_reliability_bounds() {
        let mut slow = NetworkMetrics::new();
        slow.update(60_000.0, false).unwrap();
        assert_eq!(slow.reliability_score(), 0.0);

        let mut fast = NetworkMetrics::new();
        fast.update(0.0, true).unwrap();
        assert_eq!(fast.reliability_score(), 1.0);
    }

    #[test]
    fn test_invalid_latency_is_rejected() {
        let mut m = NetworkMetrics::new();
        m.update(200.0, true).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -500.0] {
            assert!(matches!(m.update(bad, true), Err(McpError::InvalidLatency(_))));
        }
        assert_eq!(m.call_count, 1);
        assert_eq!(m.avg_latency(), 200.0);
        let score = m.reliability_score();
        assert!((0.0..=1.0).contains(&score));

        let store = MetricsStore::new();
        assert!(store.update("ghost", f64::NAN, true).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_creates_entries_lazily() {
        let store = MetricsStore::new();
        assert!(store.get("a").is_none());
        assert_eq!(store.reliability_score("a"), None);

        store.update("a", 100.0, true).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().call_count, 1);
        assert_eq!(store.snapshot()[0].tool_id, "a");
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(MetricsStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..250 {
                        store.update("shared", 10.0, (i + t) % 2 == 0).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let m = store.get("shared").unwrap();
        assert_eq!(m.call_count, 2000);
        assert_eq!(m.success_count, 1000);
    }
}
