//! Bounded selection history

use std::collections::{HashMap, VecDeque};

use crate::types::SelectionRecord;

/// Number of recent records statistics are computed over
pub const STATS_WINDOW: usize = 100;

/// Append-only ring of selection records; the oldest entry is evicted once
/// `capacity` is reached.
#[derive(Debug)]
pub struct SelectionHistory {
    records: VecDeque<SelectionRecord>,
    capacity: usize,
}

impl SelectionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, record: SelectionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn recent(&self, window: usize) -> impl Iterator<Item = &SelectionRecord> {
        self.records.iter().skip(self.records.len().saturating_sub(window))
    }

    /// How often `tool_id` was selected in the last `window` records
    pub fn recent_uses(&self, tool_id: &str, window: usize) -> usize {
        self.recent(window)
            .filter(|r| r.selected_tool.id == tool_id)
            .count()
    }

    /// Selection counts per tool over the last [`STATS_WINDOW`] records
    pub fn usage_distribution(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for record in self.recent(STATS_WINDOW) {
            *counts.entry(record.selected_tool.id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Mean processing time over the last [`STATS_WINDOW`] records
    pub fn avg_selection_time_ms(&self) -> f64 {
        let window: Vec<f64> = self
            .recent(STATS_WINDOW)
            .map(|r| r.processing_time_ms)
            .collect();
        if window.is_empty() {
            return 0.0;
        }
        window.iter().sum::<f64>() / window.len() as f64
    }

    /// Copy of every retained record, oldest first
    pub fn to_vec(&self) -> Vec<SelectionRecord> {
        self.records.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScoreBreakdown, SelectedTool};

    fn record(n: usize, tool: &str, ms: f64) -> SelectionRecord {
        SelectionRecord {
            selection_id: format!("sel_{}", n),
            query: "q".to_string(),
            selected_tool: SelectedTool {
                id: tool.to_string(),
                name: tool.to_string(),
                category: "misc".to_string(),
                score: 0.5,
            },
            alternatives: Vec::new(),
            score_components: ScoreBreakdown {
                semantic: 0.5,
                network: None,
                diversity: 1.0,
                quality: 0.5,
            },
            candidates_evaluated: 1,
            timestamp: String::new(),
            processing_time_ms: ms,
        }
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut history = SelectionHistory::new(3);
        for i in 0..5 {
            history.push(record(i, "a", 1.0));
        }
        let ids: Vec<String> = history.to_vec().into_iter().map(|r| r.selection_id).collect();
        assert_eq!(ids, vec!["sel_2", "sel_3", "sel_4"]);
    }

    #[test]
    fn test_recent_uses_window() {
        let mut history = SelectionHistory::new(100);
        for i in 0..10 {
            history.push(record(i, "a", 1.0));
        }
        for i in 10..30 {
            history.push(record(i, "b", 1.0));
        }
        assert_eq!(history.recent_uses("a", 20), 0);
        assert_eq!(history.recent_uses("b", 20), 20);
        assert_eq!(history.recent_uses("a", 30), 10);
    }

    #[test]
    fn test_statistics_over_last_hundred() {
        let mut history = SelectionHistory::new(1000);
        for i in 0..50 {
            history.push(record(i, "old", 100.0));
        }
        for i in 50..150 {
            history.push(record(i, if i % 2 == 0 { "x" } else { "y" }, 2.0));
        }
        assert_eq!(history.avg_selection_time_ms(), 2.0);
        let usage = history.usage_distribution();
        assert_eq!(usage.get("x"), Some(&50));
        assert_eq!(usage.get("y"), Some(&50));
        assert!(!usage.contains_key("old"));
        assert_eq!(SelectionHistory::new(10).avg_selection_time_ms(), 0.0);
    }
}
