//! Embedder boundary
//!
//! The selector consumes embeddings through the [`Embedder`] trait; real
//! models live outside this crate. [`KeywordEmbedder`] is a deterministic
//! hashed bag-of-words implementation used by the server binary and tests.

mod keyword;

pub use keyword::{KeywordEmbedder, DEFAULT_DIMENSIONS};

use std::cmp::Ordering;

use crate::types::{McpError, McpResult, ToolSpec};

/// A tool paired with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub tool: ToolSpec,
    pub similarity: f64,
}

/// Text embedding capability
pub trait Embedder: Send + Sync {
    /// Fixed-length vector for `text`
    fn embed(&self, text: &str) -> McpResult<Vec<f64>>;

    /// Matches scoring below this are dropped by [`Embedder::semantic_search`]
    fn min_similarity(&self) -> f64 {
        -1.0
    }

    /// Vector for a catalog entry; implementations may cache by tool id
    fn embed_tool(&self, tool: &ToolSpec) -> McpResult<Vec<f64>> {
        self.embed(&tool.search_text())
    }

    /// Rank `tools` by cosine similarity to `query`.
    ///
    /// Results are sorted descending, cut to `top_k`, and stop at the first
    /// similarity below [`Embedder::min_similarity`].
    fn semantic_search(
        &self,
        query: &str,
        tools: &[ToolSpec],
        top_k: usize,
    ) -> McpResult<Vec<SemanticMatch>> {
        if tools.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embed(query)?;
        let mut scored = Vec::with_capacity(tools.len());
        for tool in tools {
            let tool_vec = self.embed_tool(tool)?;
            scored.push((tool, cosine_similarity(&query_vec, &tool_vec)?));
        }
        Ok(rank_matches(scored, top_k, self.min_similarity()))
    }
}

/// Sort scored tools descending, keep `top_k`, stop below `threshold`
pub(crate) fn rank_matches(
    mut scored: Vec<(&ToolSpec, f64)>,
    top_k: usize,
    threshold: f64,
) -> Vec<SemanticMatch> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(top_k)
        .take_while(|(_, similarity)| *similarity >= threshold)
        .map(|(tool, similarity)| SemanticMatch {
            tool: tool.clone(),
            similarity,
        })
        .collect()
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> McpResult<f64> {
    if a.len() != b.len() {
        return Err(McpError::Embedding(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds text as (contains "weather", contains "money")
    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn embed(&self, text: &str) -> McpResult<Vec<f64>> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.contains("weather") as u8 as f64,
                lower.contains("money") as u8 as f64,
            ])
        }

        fn min_similarity(&self) -> f64 {
            0.1
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_semantic_search_sorts_and_thresholds() {
        let tools = vec![
            ToolSpec::new("fx", "Money exchange", "finance"),
            ToolSpec::new("wx", "Weather now", "weather"),
            ToolSpec::new("mix", "Weather money", "misc"),
        ];
        let matches = AxisEmbedder.semantic_search("weather today", &tools, 5).unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.tool.id.as_str()).collect();
        assert_eq!(ids, vec!["wx", "mix"]);
        assert!(matches[0].similarity > matches[1].similarity);
    }

    #[test]
    fn test_semantic_search_respects_top_k() {
        let tools = vec![
            ToolSpec::new("a", "Weather a", "weather"),
            ToolSpec::new("b", "Weather b", "weather"),
        ];
        assert_eq!(AxisEmbedder.semantic_search("weather", &tools, 1).unwrap().len(), 1);
        assert!(AxisEmbedder.semantic_search("weather", &[], 3).unwrap().is_empty());
    }
}
