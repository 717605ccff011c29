//! Candidate scoring

use crate::types::{ScoreBreakdown, ToolSpec};

/// Semantic score used when semantic narrowing is off
pub const NEUTRAL_SEMANTIC_SCORE: f64 = 0.5;
/// Reliability assumed for tools without call history
pub const DEFAULT_RELIABILITY: f64 = 0.7;
/// Fixed weight of the description quality signal
pub const QUALITY_WEIGHT: f64 = 0.1;
/// Number of recent selections diversity looks at
pub const DIVERSITY_WINDOW: usize = 20;
/// Lowest diversity score a frequently used tool can get
pub const DIVERSITY_FLOOR: f64 = 0.1;

/// Relative weight of each ranking signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub semantic: f64,
    pub network: f64,
    pub diversity: f64,
}

/// A candidate with its final score and components
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub tool: ToolSpec,
    pub score: f64,
    pub components: ScoreBreakdown,
}

/// Static description quality in [0.5, 1.0]
pub fn quality_score(tool: &ToolSpec) -> f64 {
    let mut score = 0.5;
    if tool.description.chars().count() > 20 {
        score += 0.2;
    }
    if !tool.examples.is_empty() {
        score += 0.15;
    }
    if !tool.parameters.is_empty() {
        score += 0.1;
        if tool.parameters.iter().any(|p| !p.description.is_empty()) {
            score += 0.05;
        }
    }
    f64::min(score, 1.0)
}

/// Penalty for tools chosen often in the last [`DIVERSITY_WINDOW`] selections
pub fn diversity_score(recent_uses: usize) -> f64 {
    let raw = 1.0 - recent_uses as f64 / DIVERSITY_WINDOW as f64;
    raw.max(DIVERSITY_FLOOR)
}

/// Weighted mean of the available signals, clamped to [0, 1].
///
/// The network term only participates when `components.network` is set;
/// weights are renormalised over the participating terms.
pub fn combine(components: &ScoreBreakdown, weights: &Weights) -> f64 {
    let mut total = weights.semantic * components.semantic
        + weights.diversity * components.diversity
        + QUALITY_WEIGHT * components.quality;
    let mut weight_sum = weights.semantic + weights.diversity + QUALITY_WEIGHT;

    if let Some(network) = components.network {
        total += weights.network * network;
        weight_sum += weights.network;
    }

    let score = total / weight_sum;
    if weight_sum <= 0.0 || !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamSpec;
    use serde_json::json;

    const WEIGHTS: Weights = Weights {
        semantic: 0.5,
        network: 0.3,
        diversity: 0.1,
    };

    #[test]
    fn test_quality_components() {
        let bare = ToolSpec::new("a", "A", "misc");
        assert_eq!(quality_score(&bare), 0.5);

        let full = ToolSpec::new("b", "B", "misc")
            .with_description("A thorough description of the tool")
            .with_example(json!({"q": 1}))
            .with_param(ParamSpec::new("q").described("Query"));
        assert!((quality_score(&full) - 1.0).abs() < 1e-12);

        let undescribed = ToolSpec::new("c", "C", "misc").with_param(ParamSpec::new("q"));
        assert!((quality_score(&undescribed) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_diversity_has_floor() {
        assert_eq!(diversity_score(0), 1.0);
        assert!((diversity_score(5) - 0.75).abs() < 1e-12);
        assert_eq!(diversity_score(20), DIVERSITY_FLOOR);
        assert_eq!(diversity_score(50), DIVERSITY_FLOOR);
    }

    #[test]
    fn test_combine_renormalises_weights() {
        let with_network = ScoreBreakdown {
            semantic: 1.0,
            network: Some(1.0),
            diversity: 1.0,
            quality: 1.0,
        };
        assert!((combine(&with_network, &WEIGHTS) - 1.0).abs() < 1e-12);

        let without_network = ScoreBreakdown {
            network: None,
            ..with_network
        };
        assert!((combine(&without_network, &WEIGHTS) - 1.0).abs() < 1e-12);

        let mixed = ScoreBreakdown {
            semantic: 0.5,
            network: Some(0.7),
            diversity: 1.0,
            quality: 0.5,
        };
        let expected = (0.5 * 0.5 + 0.3 * 0.7 + 0.1 * 1.0 + 0.1 * 0.5) / 1.0;
        assert!((combine(&mixed, &WEIGHTS) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_combine_clamps() {
        let negative = ScoreBreakdown {
            semantic: -1.0,
            network: None,
            diversity: 0.1,
            quality: 0.5,
        };
        assert_eq!(combine(&negative, &WEIGHTS), 0.0);
    }

    #[test]
    fn test_combine_maps_non_finite_to_zero() {
        let poisoned = ScoreBreakdown {
            semantic: 0.8,
            network: Some(f64::NAN),
            diversity: 1.0,
            quality: 0.7,
        };
        assert_eq!(combine(&poisoned, &WEIGHTS), 0.0);

        let infinite = ScoreBreakdown {
            semantic: f64::INFINITY,
            network: None,
            ..poisoned
        };
        assert_eq!(combine(&infinite, &WEIGHTS), 0.0);
    }
}
