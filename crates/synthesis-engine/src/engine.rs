use analysis_core::{AnalysisError, AnalysisSource};

use crate::config::SynthesisConfig;
use crate::consensus::{blended_confidence, detect_convergence, detect_divergences};
use crate::recommendation::Recommendation;
use crate::report::build_report;
use crate::types::{SynthesisInput, SynthesisOutput};
use crate::weights::{resolve_weights, weighted_score};

/// Merges fundamental, technical and ESG outputs into one composite signal.
/// Stateless: the same input always yields the same output.
#[derive(Default)]
pub struct SynthesisEngine {
    config: SynthesisConfig,
}

impl SynthesisEngine {
    pub fn new(config: SynthesisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    fn validate(&self, input: &SynthesisInput) -> Result<(), AnalysisError> {
        if input.ticker.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("ticker must not be empty".to_string()));
        }
        for source in AnalysisSource::ALL {
            input.output(source).validate(source)?;
        }
        Ok(())
    }

    pub fn synthesize(&self, input: &SynthesisInput) -> Result<SynthesisOutput, AnalysisError> {
        self.validate(input)?;

        let scores = input.scores();
        let weights = resolve_weights(&self.config, input.context, input.timeframe);
        let synthesis_score = weighted_score(&weights.applied, &scores);

        let convergence_factors: Vec<_> = detect_convergence(&scores, &self.config).into_iter().collect();
        let divergence_factors = detect_divergences(&scores, &self.config);
        let confidence = blended_confidence(&weights.applied, &input.confidences(), &scores, &self.config);
        let recommendation = Recommendation::from_score(synthesis_score, &self.config.recommendation_bands);

        if !divergence_factors.is_empty() {
            tracing::debug!(
                "{} divergence(s) for {}: {:?}",
                divergence_factors.len(),
                input.ticker,
                divergence_factors.iter().map(|d| d.category.as_str()).collect::<Vec<_>>()
            );
        }

        let report = build_report(
            input,
            synthesis_score,
            recommendation,
            &weights,
            &convergence_factors,
            &divergence_factors,
        );

        tracing::info!(
            "Synthesized {} ({}): score {}, {}, confidence {:.2}",
            input.ticker,
            input.context,
            synthesis_score,
            recommendation,
            confidence
        );

        Ok(SynthesisOutput {
            synthesis_score,
            convergence_factors,
            divergence_factors,
            report,
            confidence,
        })
    }
}
