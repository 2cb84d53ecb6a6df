use analysis_core::{AnalysisContext, AnalysisError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::recommendation::RecommendationBands;
use crate::types::SourceWeights;

/// Multipliers on the technical weight, trading context only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalBoost {
    pub one_day: f64,   // 1.5
    pub one_week: f64,  // 1.3
    pub one_month: f64, // 1.1
}

impl Default for TechnicalBoost {
    fn default() -> Self {
        Self {
            one_day: 1.5,
            one_week: 1.3,
            one_month: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    // Source weights per context (fundamental, technical, esg)
    pub investment_weights: SourceWeights, // 0.5 / 0.2 / 0.3
    pub trading_weights: SourceWeights,    // 0.25 / 0.6 / 0.15
    pub technical_boost: TechnicalBoost,

    // Convergence: every score on the same side and within the band
    pub convergence_band: f64,    // 20
    pub bullish_threshold: f64,   // all above 60
    pub bearish_threshold: f64,   // all below 40

    // Divergence: any pair at least this far apart
    pub divergence_threshold: f64, // 25

    /// Confidence is scaled by `1 - consistency_penalty * maxΔ / 100`
    pub consistency_penalty: f64, // 0.6

    pub recommendation_bands: RecommendationBands,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            investment_weights: SourceWeights::new(0.5, 0.2, 0.3),
            trading_weights: SourceWeights::new(0.25, 0.6, 0.15),
            technical_boost: TechnicalBoost::default(),
            convergence_band: 20.0,
            bullish_threshold: 60.0,
            bearish_threshold: 40.0,
            divergence_threshold: 25.0,
            consistency_penalty: 0.6,
            recommendation_bands: RecommendationBands::default(),
        }
    }
}

impl SynthesisConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: f64| -> Result<f64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
                None => Ok(default),
            }
        };
        let weights = |key: &str, default: &SourceWeights| -> Result<SourceWeights> {
            match lookup(key) {
                Some(raw) => parse_weights(&raw).with_context(|| format!("Invalid {}", key)),
                None => Ok(*default),
            }
        };

        let config = Self {
            investment_weights: weights("SYNTHESIS_INVESTMENT_WEIGHTS", &defaults.investment_weights)?,
            trading_weights: weights("SYNTHESIS_TRADING_WEIGHTS", &defaults.trading_weights)?,
            technical_boost: TechnicalBoost {
                one_day: number("SYNTHESIS_BOOST_1D", defaults.technical_boost.one_day)?,
                one_week: number("SYNTHESIS_BOOST_1W", defaults.technical_boost.one_week)?,
                one_month: number("SYNTHESIS_BOOST_1M", defaults.technical_boost.one_month)?,
            },
            convergence_band: number("SYNTHESIS_CONVERGENCE_BAND", defaults.convergence_band)?,
            bullish_threshold: number("SYNTHESIS_BULLISH_THRESHOLD", defaults.bullish_threshold)?,
            bearish_threshold: number("SYNTHESIS_BEARISH_THRESHOLD", defaults.bearish_threshold)?,
            divergence_threshold: number("SYNTHESIS_DIVERGENCE_THRESHOLD", defaults.divergence_threshold)?,
            consistency_penalty: number("SYNTHESIS_CONSISTENCY_PENALTY", defaults.consistency_penalty)?,
            recommendation_bands: defaults.recommendation_bands,
        };

        config.validate().context("Invalid synthesis configuration")?;
        Ok(config)
    }

    pub fn weights_for(&self, context: AnalysisContext) -> &SourceWeights {
        match context {
            AnalysisContext::Investment => &self.investment_weights,
            AnalysisContext::Trading => &self.trading_weights,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        for (name, weights) in [
            ("investment", &self.investment_weights),
            ("trading", &self.trading_weights),
        ] {
            if weights.iter().any(|(_, w)| !w.is_finite() || *w < 0.0) {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} weights must be finite and non-negative",
                    name
                )));
            }
            if weights.total() <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} weights must not sum to zero",
                    name
                )));
            }
        }

        let boosts = [
            self.technical_boost.one_day,
            self.technical_boost.one_week,
            self.technical_boost.one_month,
        ];
        if boosts.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(AnalysisError::InvalidInput(
                "technical boosts must be finite and positive".to_string(),
            ));
        }

        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.convergence_band) || !in_range(self.divergence_threshold) {
            return Err(AnalysisError::InvalidInput(
                "convergence band and divergence threshold must be within [0, 100]".to_string(),
            ));
        }
        if !in_range(self.bullish_threshold)
            || !in_range(self.bearish_threshold)
            || self.bearish_threshold > self.bullish_threshold
        {
            return Err(AnalysisError::InvalidInput(
                "bearish threshold must not exceed bullish threshold".to_string(),
            ));
        }
        if !self.consistency_penalty.is_finite() || !(0.0..=1.0).contains(&self.consistency_penalty) {
            return Err(AnalysisError::InvalidInput(
                "consistency penalty must be within [0, 1]".to_string(),
            ));
        }
        if !self.recommendation_bands.is_monotonic() {
            return Err(AnalysisError::InvalidInput(
                "recommendation bands must increase strictly within (0, 100]".to_string(),
            ));
        }
        Ok(())
    }
}

/// "fundamental,technical,esg", e.g. "0.5,0.2,0.3"
fn parse_weights(raw: &str) -> Result<SourceWeights> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .context("weights must be comma-separated numbers")?;

    match parts.as_slice() {
        [fundamental, technical, esg] => Ok(SourceWeights::new(*fundamental, *technical, *esg)),
        _ => anyhow::bail!("expected 3 weights (fundamental,technical,esg), got {}", parts.len()),
    }
}
