//! SONAR selection engine
//!
//! Ranks catalog tools for a query by blending semantic relevance, network
//! reliability, usage diversity and description quality. Successful
//! selections are recorded in a bounded history which in turn feeds the
//! diversity signal; reported call outcomes feed the reliability signal.

mod filter;
mod history;
mod scoring;

pub use filter::{filter_by_context, SelectionContext};
pub use history::{SelectionHistory, STATS_WINDOW};
pub use scoring::{
    combine, diversity_score, quality_score, ScoredCandidate, Weights, DEFAULT_RELIABILITY,
    DIVERSITY_FLOOR, DIVERSITY_WINDOW, NEUTRAL_SEMANTIC_SCORE, QUALITY_WEIGHT,
};

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SelectionConfig;
use crate::embedder::Embedder;
use crate::metrics::MetricsStore;
use crate::types::{
    Alternative, McpError, McpResult, ScoreBreakdown, SelectedTool, SelectionInfo,
    SelectionRecord, SelectorStats, ToolSpec,
};
use crate::utils::{elapsed_ms, now_rfc3339};

/// Runner-up candidates kept per selection
pub const MAX_ALTERNATIVES: usize = 3;

/// The selection engine
pub struct Sonar {
    config: SelectionConfig,
    embedder: Arc<dyn Embedder>,
    metrics: Arc<MetricsStore>,
    catalog: RwLock<Vec<ToolSpec>>,
    history: Mutex<SelectionHistory>,
    next_selection: AtomicU64,
}

impl Sonar {
    pub fn new(
        config: SelectionConfig,
        embedder: Arc<dyn Embedder>,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        let history = SelectionHistory::new(config.history_capacity);
        Self {
            config,
            embedder,
            metrics,
            catalog: RwLock::new(Vec::new()),
            history: Mutex::new(history),
            next_selection: AtomicU64::new(0),
        }
    }

    /// Add every tool in `tools`, failing on the first invalid or duplicate entry
    pub fn with_tools(self, tools: impl IntoIterator<Item = ToolSpec>) -> McpResult<Self> {
        for tool in tools {
            self.add_tool(tool)?;
        }
        Ok(self)
    }

    /// Add one catalog entry. Ids are unique and never replaced.
    pub fn add_tool(&self, tool: ToolSpec) -> McpResult<()> {
        tool.validate()?;
        let mut catalog = self.catalog.write();
        if catalog.iter().any(|t| t.id == tool.id) {
            return Err(McpError::DuplicateRegistration(tool.id));
        }
        debug!("Catalog: added '{}' ({})", tool.id, tool.category);
        catalog.push(tool);
        Ok(())
    }

    /// Snapshot of the catalog in insertion order
    pub fn tools(&self) -> Vec<ToolSpec> {
        self.catalog.read().clone()
    }

    pub fn tool(&self, id: &str) -> Option<ToolSpec> {
        self.catalog.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsStore> {
        &self.metrics
    }

    fn weights(&self) -> Weights {
        Weights {
            semantic: self.config.semantic_weight,
            network: self.config.network_weight,
            diversity: self.config.diversity_weight,
        }
    }

    /// Score and order candidates for `query` without recording anything.
    ///
    /// Returns [`McpError::NoCandidates`] when filtering or narrowing leaves
    /// nothing, and [`McpError::Embedding`] when the embedder fails or
    /// reports a non-finite similarity.
    pub fn rank(
        &self,
        query: &str,
        context: Option<&SelectionContext>,
        use_semantic: bool,
        use_network: bool,
    ) -> McpResult<Vec<ScoredCandidate>> {
        let filtered = filter_by_context(&self.catalog.read(), context);
        let top_k = self.config.top_k_candidates;

        let candidates: Vec<(ToolSpec, f64)> = if use_semantic && !filtered.is_empty() {
            self.embedder
                .semantic_search(query, &filtered, top_k)?
                .into_iter()
                .map(|m| (m.tool, m.similarity))
                .collect()
        } else {
            filtered
                .into_iter()
                .map(|tool| (tool, NEUTRAL_SEMANTIC_SCORE))
                .collect()
        };

        if candidates.is_empty() {
            return Err(McpError::NoCandidates);
        }
        if let Some((tool, similarity)) = candidates.iter().find(|(_, s)| !s.is_finite()) {
            return Err(McpError::Embedding(format!(
                "non-finite similarity {} for '{}'",
                similarity, tool.id
            )));
        }

        let weights = self.weights();
        let history = self.history.lock();
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .take(top_k)
            .map(|(tool, semantic)| {
                let network = use_network.then(|| {
                    self.metrics
                        .reliability_score(&tool.id)
                        .unwrap_or(DEFAULT_RELIABILITY)
                });
                let components = ScoreBreakdown {
                    semantic,
                    network,
                    diversity: diversity_score(history.recent_uses(&tool.id, DIVERSITY_WINDOW)),
                    quality: quality_score(&tool),
                };
                ScoredCandidate {
                    score: combine(&components, &weights),
                    tool,
                    components,
                }
            })
            .collect();
        drop(history);

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(CmpOrdering::Equal));
        Ok(scored)
    }

    /// Pick the best tool for `query` and record the decision.
    ///
    /// Failures come back as `(None, SelectionInfo::Rejected)` and leave the
    /// history untouched.
    pub fn select_tool(
        &self,
        query: &str,
        context: Option<&SelectionContext>,
        use_semantic: bool,
        use_network: bool,
    ) -> (Option<ToolSpec>, SelectionInfo) {
        let started = Instant::now();
        let selection_id = format!(
            "sel_{}",
            self.next_selection.fetch_add(1, Ordering::SeqCst)
        );

        let ranked = match self.rank(query, context, use_semantic, use_network) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!("[{}] Selection for '{}' failed: {}", selection_id, query, e);
                return (
                    None,
                    SelectionInfo::Rejected {
                        selection_id,
                        error: e.to_string(),
                    },
                );
            }
        };

        let candidates_evaluated = ranked.len();
        let mut ranked = ranked.into_iter();
        let Some(best) = ranked.next() else {
            return (
                None,
                SelectionInfo::Rejected {
                    selection_id,
                    error: McpError::NoCandidates.to_string(),
                },
            );
        };
        let alternatives: Vec<Alternative> = ranked
            .take(MAX_ALTERNATIVES)
            .map(|c| Alternative {
                id: c.tool.id,
                name: c.tool.name,
                score: c.score,
                category: c.tool.category,
            })
            .collect();

        let record = SelectionRecord {
            selection_id: selection_id.clone(),
            query: query.to_string(),
            selected_tool: SelectedTool {
                id: best.tool.id.clone(),
                name: best.tool.name.clone(),
                category: best.tool.category.clone(),
                score: best.score,
            },
            alternatives,
            score_components: best.components,
            candidates_evaluated,
            timestamp: now_rfc3339(),
            processing_time_ms: elapsed_ms(started),
        };

        info!(
            "[{}] Selected '{}' (score {:.3}) from {} candidate(s)",
            selection_id, best.tool.id, best.score, candidates_evaluated
        );
        debug!("[{}] Components: {:?}", selection_id, best.components);

        self.history.lock().push(record.clone());
        (Some(best.tool), SelectionInfo::Selected(record))
    }

    /// Feed an observed call outcome into the reliability metrics.
    ///
    /// Fails with [`McpError::InvalidLatency`] for NaN, infinite or negative
    /// latencies; nothing is recorded in that case.
    pub fn report_outcome(&self, tool_id: &str, latency_ms: f64, success: bool) -> McpResult<()> {
        self.metrics.update(tool_id, latency_ms, success)
    }

    pub fn statistics(&self) -> SelectorStats {
        let history = self.history.lock();
        SelectorStats {
            total_tools: self.catalog.read().len(),
            network_metrics_tracked: self.metrics.len(),
            selection_history_count: history.len(),
            avg_selection_time_ms: history.avg_selection_time_ms(),
            tool_usage_distribution: history.usage_distribution(),
        }
    }

    /// Retained selection records, oldest first
    pub fn history(&self) -> Vec<SelectionRecord> {
        self.history.lock().to_vec()
    }

    /// Distinct catalog categories, compared case-insensitively
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.catalog
            .read()
            .iter()
            .filter(|t| seen.insert(t.category.to_lowercase()))
            .map(|t| t.category.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::KeywordEmbedder;
    use crate::types::ParamSpec;

    /// Every text embeds to the same vector
    struct Uniform;

    impl Embedder for Uniform {
        fn embed(&self, _text: &str) -> McpResult<Vec<f64>> {
            Ok(vec![1.0, 1.0])
        }
    }

    struct Broken;

    impl Embedder for Broken {
        fn embed(&self, _text: &str) -> McpResult<Vec<f64>> {
            Err(McpError::Embedding("model offline".to_string()))
        }
    }

    fn catalog() -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("weather", "Weather Forecast", "weather")
                .with_description("Forecast temperature and rain for a city")
                .with_param(ParamSpec::new("city").required().described("City name")),
            ToolSpec::new("fx", "Currency Converter", "finance")
                .with_description("Convert an amount between currency exchange rates")
                .with_param(ParamSpec::new("amount").required()),
            ToolSpec::new("flights", "Flight Search", "transportation")
                .with_description("Find flights and airline tickets between airports"),
        ]
    }

    fn sonar(embedder: Arc<dyn Embedder>) -> Sonar {
        Sonar::new(
            SelectionConfig::default(),
            embedder,
            Arc::new(MetricsStore::new()),
        )
        .with_tools(catalog())
        .unwrap()
    }

    #[test]
    fn test_add_tool_rejects_duplicates_and_invalid() {
        let sonar = sonar(Arc::new(Uniform));
        let err = sonar.add_tool(ToolSpec::new("fx", "Other", "misc")).unwrap_err();
        assert!(matches!(err, McpError::DuplicateRegistration(_)));
        assert!(sonar.add_tool(ToolSpec::new("", "Nameless", "misc")).is_err());
        assert_eq!(sonar.tools().len(), 3);
    }

    #[test]
    fn test_semantic_selection() {
        let sonar = sonar(Arc::new(KeywordEmbedder::default()));
        let (tool, info) = sonar.select_tool("convert currency amount", None, true, true);
        assert_eq!(tool.unwrap().id, "fx");

        let record = info.record().unwrap();
        assert_eq!(record.selection_id, "sel_0");
        assert_eq!(record.selected_tool.id, "fx");
        assert!(record.score_components.network.is_some());
        assert!(record.alternatives.len() <= MAX_ALTERNATIVES);
        assert_eq!(sonar.history().len(), 1);
    }

    #[test]
    fn test_scores_are_bounded_and_sorted() {
        let sonar = sonar(Arc::new(Uniform));
        sonar.report_outcome("weather", 50_000.0, false).unwrap();
        let ranked = sonar.rank("anything", None, true, true).unwrap();
        assert_eq!(ranked.len(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(ranked.iter().all(|c| (0.0..=1.0).contains(&c.score)));
        assert_eq!(ranked.last().unwrap().tool.id, "weather");
    }

    #[test]
    fn test_without_semantic_uses_neutral_score() {
        let sonar = sonar(Arc::new(Broken));
        let ranked = sonar.rank("ignored", None, false, false).unwrap();
        assert!(ranked.iter().all(|c| c.components.semantic == NEUTRAL_SEMANTIC_SCORE));
        assert!(ranked.iter().all(|c| c.components.network.is_none()));
    }

    #[test]
    fn test_context_filters_candidates() {
        let sonar = sonar(Arc::new(Uniform));
        let ctx = SelectionContext::new().with_required_param("CITY");
        let (tool, _) = sonar.select_tool("anything", Some(&ctx), true, true);
        assert_eq!(tool.unwrap().id, "weather");

        let ctx = SelectionContext::new().with_category("sports");
        let (tool, info) = sonar.select_tool("anything", Some(&ctx), true, true);
        assert!(tool.is_none());
        assert_eq!(info.error(), Some("No suitable tools found"));
        assert_eq!(sonar.history().len(), 1);
    }

    #[test]
    fn test_embedder_failure_is_rejected_without_record() {
        let sonar = sonar(Arc::new(Broken));
        let (tool, info) = sonar.select_tool("weather", None, true, true);
        assert!(tool.is_none());
        assert!(info.error().unwrap().contains("model offline"));
        assert!(sonar.history().is_empty());
    }

    #[test]
    fn test_selection_ids_increase() {
        let sonar = sonar(Arc::new(Uniform));
        let (_, first) = sonar.select_tool("a", None, true, true);
        let (_, second) = sonar.select_tool("b", None, true, true);
        assert_eq!(first.selection_id(), "sel_0");
        assert_eq!(second.selection_id(), "sel_1");
    }

    #[test]
    fn test_statistics() {
        let sonar = sonar(Arc::new(Uniform));
        sonar.report_outcome("fx", 120.0, true).unwrap();
        sonar.select_tool("a", None, true, true);
        sonar.select_tool("b", None, true, true);

        let stats = sonar.statistics();
        assert_eq!(stats.total_tools, 3);
        assert_eq!(stats.network_metrics_tracked, 1);
        assert_eq!(stats.selection_history_count, 2);
        assert_eq!(stats.tool_usage_distribution.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_categories_are_unique() {
        let sonar = sonar(Arc::new(Uniform));
        sonar.add_tool(ToolSpec::new("w2", "Other weather", "Weather")).unwrap();
        assert_eq!(sonar.categories(), vec!["weather", "finance", "transportation"]);
    }
}
