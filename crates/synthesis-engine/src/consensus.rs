use analysis_core::AnalysisSource;
use serde_json::json;

use crate::config::SynthesisConfig;
use crate::types::{ConvergenceFactor, DivergenceFactor, PerSource, SourceWeights, SOURCE_PAIRS};

/// Gap at or above which a divergence is reported as severe
const SEVERE_DIVERGENCE: f64 = 50.0;

/// Slack for float noise in score differences (85.1 - 60.1 lands just under 25)
const SCORE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    fn of(score: f64, config: &SynthesisConfig) -> Self {
        if score > config.bullish_threshold {
            Direction::Bullish
        } else if score < config.bearish_threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Neutral => "neutral",
        }
    }
}

fn scores_json(scores: &PerSource<f64>) -> serde_json::Value {
    json!({
        "fundamental": scores.fundamental,
        "technical": scores.technical,
        "esg": scores.esg,
    })
}

fn capitalize(source: AnalysisSource) -> String {
    match source {
        AnalysisSource::Esg => "ESG".to_string(),
        other => {
            let name = other.as_str();
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// All three sources agree: same side of neutral and within the band
pub fn detect_convergence(scores: &PerSource<f64>, config: &SynthesisConfig) -> Option<ConvergenceFactor> {
    let spread = scores.max() - scores.min();
    if spread > config.convergence_band {
        return None;
    }

    let directions: Vec<Direction> = scores.iter().map(|(_, s)| Direction::of(*s, config)).collect();
    let direction = directions[0];
    if direction == Direction::Neutral || directions.iter().any(|d| *d != direction) {
        return None;
    }

    let average = scores.total() / 3.0;
    let extremity = scores.iter().map(|(_, s)| (s - 50.0).abs()).sum::<f64>() / 3.0 / 50.0;
    let weight = (0.5 + 0.5 * extremity).clamp(0.0, 1.0);

    Some(ConvergenceFactor {
        description: format!(
            "Fundamental, technical and ESG analyses all point {} (average {:.0}, spread {:.0})",
            direction.as_str(),
            average,
            spread
        ),
        weight,
        supporting_analyses: AnalysisSource::ALL.to_vec(),
        metadata: json!({
            "direction": direction.as_str(),
            "averageScore": average,
            "spread": spread,
            "scores": scores_json(scores),
        }),
    })
}

/// One factor per source pair whose scores differ by at least the threshold
pub fn detect_divergences(scores: &PerSource<f64>, config: &SynthesisConfig) -> Vec<DivergenceFactor> {
    SOURCE_PAIRS
        .iter()
        .filter_map(|&(a, b)| {
            let (score_a, score_b) = (*scores.get(a), *scores.get(b));
            let delta = (score_a - score_b).abs();
            if delta < config.divergence_threshold - SCORE_EPSILON {
                return None;
            }

            let severity = if delta >= SEVERE_DIVERGENCE - SCORE_EPSILON { "severe" } else { "moderate" };
            Some(DivergenceFactor {
                category: format!("{}_vs_{}", a, b),
                description: format!(
                    "{} analysis ({:.0}, {}) disagrees with {} analysis ({:.0}, {}) by {:.0} points",
                    capitalize(a),
                    score_a,
                    Direction::of(score_a, config).as_str(),
                    capitalize(b),
                    score_b,
                    Direction::of(score_b, config).as_str(),
                    delta
                ),
                conflicting_analyses: vec![a, b],
                metadata: json!({
                    a.as_str(): score_a,
                    b.as_str(): score_b,
                    "delta": delta,
                    "severity": severity,
                }),
            })
        })
        .collect()
}

/// Largest pairwise gap between source scores
pub fn max_divergence(scores: &PerSource<f64>) -> f64 {
    scores.max() - scores.min()
}

/// Weighted average of source confidences, scaled down by inconsistency
pub fn blended_confidence(
    weights: &SourceWeights,
    confidences: &PerSource<f64>,
    scores: &PerSource<f64>,
    config: &SynthesisConfig,
) -> f64 {
    let base = weights.weighted_mean(confidences);
    let penalty = (1.0 - config.consistency_penalty * max_divergence(scores) / 100.0).max(0.0);
    (base * penalty).clamp(0.0, 1.0)
}
