use analysis_core::{AnalysisContext, Timeframe};
use serde::{Deserialize, Serialize};

use crate::config::SynthesisConfig;
use crate::types::{PerSource, SourceWeights};

/// Weights actually used for one synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedWeights {
    /// Context table entry before any adjustment
    pub base: SourceWeights,
    /// After the timeframe adjustment, normalized to sum to 1.0
    pub applied: SourceWeights,
    pub technical_multiplier: f64,
}

pub fn technical_multiplier(
    config: &SynthesisConfig,
    context: AnalysisContext,
    timeframe: Option<Timeframe>,
) -> f64 {
    if context != AnalysisContext::Trading {
        return 1.0;
    }
    match timeframe {
        Some(Timeframe::OneDay) => config.technical_boost.one_day,
        Some(Timeframe::OneWeek) => config.technical_boost.one_week,
        Some(Timeframe::OneMonth) => config.technical_boost.one_month,
        _ => 1.0,
    }
}

pub fn resolve_weights(
    config: &SynthesisConfig,
    context: AnalysisContext,
    timeframe: Option<Timeframe>,
) -> ResolvedWeights {
    let base = *config.weights_for(context);
    let multiplier = technical_multiplier(config, context, timeframe);
    let adjusted = SourceWeights {
        technical: base.technical * multiplier,
        ..base
    };

    ResolvedWeights {
        base,
        applied: adjusted.normalized(),
        technical_multiplier: multiplier,
    }
}

/// round(Σ w·s / Σ w), clamped to [0, 100]
pub fn weighted_score(weights: &SourceWeights, scores: &PerSource<f64>) -> u8 {
    weights.weighted_mean(scores).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_investment_ignores_timeframe() {
        let config = SynthesisConfig::default();
        let weights = resolve_weights(&config, AnalysisContext::Investment, Some(Timeframe::OneDay));
        assert_eq!(weights.technical_multiplier, 1.0);
        assert!((weights.applied.technical - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_trading_intraday_boosts_technical() {
        let config = SynthesisConfig::default();
        let weights = resolve_weights(&config, AnalysisContext::Trading, Some(Timeframe::OneDay));
        assert_eq!(weights.technical_multiplier, 1.5);
        // 0.9 / (0.25 + 0.9 + 0.15)
        assert!((weights.applied.technical - 0.9 / 1.3).abs() < 1e-12);
        assert!((weights.applied.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_trading_long_timeframes_unboosted() {
        let config = SynthesisConfig::default();
        for tf in [Timeframe::ThreeMonths, Timeframe::SixMonths, Timeframe::OneYear] {
            let weights = resolve_weights(&config, AnalysisContext::Trading, Some(tf));
            assert_eq!(weights.technical_multiplier, 1.0);
        }
        assert_eq!(technical_multiplier(&config, AnalysisContext::Trading, None), 1.0);
        assert_eq!(technical_multiplier(&config, AnalysisContext::Trading, Some(Timeframe::OneWeek)), 1.3);
        assert_eq!(technical_multiplier(&config, AnalysisContext::Trading, Some(Timeframe::OneMonth)), 1.1);
    }

    #[test]
    fn test_weighted_score_rounds_half_away_from_zero() {
        let weights = SourceWeights::new(1.0, 1.0, 0.0);
        assert_eq!(weighted_score(&weights, &PerSource::new(60.0, 61.0, 0.0)), 61);
        assert_eq!(weighted_score(&weights, &PerSource::new(60.0, 60.8, 0.0)), 60);
    }
}
