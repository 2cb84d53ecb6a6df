use analysis_core::{AnalysisContext, AnalysisOutput, Timeframe};
use serde::{Deserialize, Serialize};

use crate::recommendation::Recommendation;
use crate::types::{ConvergenceFactor, DivergenceFactor, PerSource, SourceWeights, SynthesisInput};
use crate::weights::ResolvedWeights;

/// Known limitations attached to every report
pub const LIMITATIONS: &[&str] = &[
    "Scores are heuristic composites and are not calibrated probabilities",
    "Technical signals reflect historical price action only",
    "Fundamental and ESG inputs are only as current as their upstream data",
    "Fixed source weights may not suit every sector or market regime",
    "Not investment advice",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightingExplanation {
    pub context: AnalysisContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    pub base_weights: SourceWeights,
    pub applied_weights: SourceWeights,
    pub technical_multiplier: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisReport {
    pub summary: String,
    pub recommendation: Recommendation,
    /// Source sub-reports, unchanged
    pub sources: PerSource<AnalysisOutput>,
    pub weighting: WeightingExplanation,
    pub limitations: Vec<String>,
}

fn percent(weight: f64) -> String {
    format!("{:.0}%", weight * 100.0)
}

fn explain_weights(context: AnalysisContext, timeframe: Option<Timeframe>, weights: &ResolvedWeights) -> String {
    let applied = &weights.applied;
    let mut text = format!(
        "{} context weights: fundamental {}, technical {}, ESG {}",
        context,
        percent(applied.fundamental),
        percent(applied.technical),
        percent(applied.esg)
    );
    if weights.technical_multiplier != 1.0 {
        if let Some(tf) = timeframe {
            text.push_str(&format!(
                " (technical weight x{:.1} for the {} timeframe, then renormalized)",
                weights.technical_multiplier, tf
            ));
        }
    }
    text
}

fn summarize(
    ticker: &str,
    score: u8,
    recommendation: Recommendation,
    convergence: &[ConvergenceFactor],
    divergences: &[DivergenceFactor],
) -> String {
    let mut summary = format!(
        "{}: synthesis score {}/100, recommendation {}.",
        ticker,
        score,
        recommendation.to_label()
    );
    if !convergence.is_empty() {
        summary.push_str(" All analyses converge.");
    }
    match divergences.len() {
        0 => {}
        1 => summary.push_str(" 1 divergence between analyses."),
        n => summary.push_str(&format!(" {} divergences between analyses.", n)),
    }
    summary
}

pub fn build_report(
    input: &SynthesisInput,
    score: u8,
    recommendation: Recommendation,
    weights: &ResolvedWeights,
    convergence: &[ConvergenceFactor],
    divergences: &[DivergenceFactor],
) -> SynthesisReport {
    SynthesisReport {
        summary: summarize(&input.ticker, score, recommendation, convergence, divergences),
        recommendation,
        sources: PerSource::new(input.fundamental.clone(), input.technical.clone(), input.esg.clone()),
        weighting: WeightingExplanation {
            context: input.context,
            timeframe: input.timeframe,
            base_weights: weights.base,
            applied_weights: weights.applied,
            technical_multiplier: weights.technical_multiplier,
            explanation: explain_weights(input.context, input.timeframe, weights),
        },
        limitations: LIMITATIONS.iter().map(|s| s.to_string()).collect(),
    }
}
