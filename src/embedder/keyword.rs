//! Hashed bag-of-words embedder

use std::collections::HashMap;

use parking_lot::RwLock;
use rayon::prelude::*;

use super::{cosine_similarity, rank_matches, Embedder, SemanticMatch};
use crate::types::{McpResult, ToolSpec};

/// Default vector length
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Catalog size above which tools are scored in parallel
const PARALLEL_SEARCH_THRESHOLD: usize = 1000;

const STOP_WORDS: &[&str] = &[
    "the", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "your", "you", "this", "that", "is", "are", "tool", "description", "category", "parameters",
];

/// Deterministic embedder: each token is hashed into one of `dimensions`
/// buckets and counted. Tool vectors are cached by tool id.
pub struct KeywordEmbedder {
    dimensions: usize,
    min_similarity: f64,
    cache: RwLock<HashMap<String, Vec<f64>>>,
}

impl KeywordEmbedder {
    pub fn new(dimensions: usize, min_similarity: f64) -> Self {
        Self {
            dimensions: dimensions.max(1),
            min_similarity,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of cached tool vectors
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    /// Drop all cached tool vectors
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimensions];
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS, 0.1)
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> McpResult<Vec<f64>> {
        Ok(self.vectorize(text))
    }

    fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    fn embed_tool(&self, tool: &ToolSpec) -> McpResult<Vec<f64>> {
        if let Some(cached) = self.cache.read().get(&tool.id) {
            return Ok(cached.clone());
        }
        let vector = self.vectorize(&tool.search_text());
        self.cache.write().insert(tool.id.clone(), vector.clone());
        Ok(vector)
    }

    fn semantic_search(
        &self,
        query: &str,
        tools: &[ToolSpec],
        top_k: usize,
    ) -> McpResult<Vec<SemanticMatch>> {
        if tools.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.vectorize(query);

        let score = |tool: &ToolSpec| -> McpResult<f64> {
            let tool_vec = self.embed_tool(tool)?;
            cosine_similarity(&query_vec, &tool_vec)
        };

        let similarities: Vec<f64> = if tools.len() > PARALLEL_SEARCH_THRESHOLD {
            tools.par_iter().map(score).collect::<McpResult<_>>()?
        } else {
            tools.iter().map(score).collect::<McpResult<_>>()?
        };

        let scored = tools.iter().zip(similarities).collect();
        Ok(rank_matches(scored, top_k, self.min_similarity))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= 2 && !STOP_WORDS.contains(s))
        .map(|s| s.to_string())
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
