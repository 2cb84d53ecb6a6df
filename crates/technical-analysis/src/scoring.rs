use analysis_core::{FactorType, Timeframe};
use serde::{Deserialize, Serialize};

use crate::factors::{GeneratedFactor, SignalHorizon};

pub const POSITIVE_FACTOR_SCORE: f64 = 85.0;
pub const NEGATIVE_FACTOR_SCORE: f64 = 15.0;
pub const NEUTRAL_SCORE: f64 = 50.0;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;

fn factor_score(factor_type: FactorType) -> f64 {
    match factor_type {
        FactorType::Positive => POSITIVE_FACTOR_SCORE,
        FactorType::Negative => NEGATIVE_FACTOR_SCORE,
    }
}

/// Boost applied to short-horizon factors when the analysis itself is short
/// horizon. Long-horizon factors always weigh 1.0.
pub fn timeframe_multiplier(horizon: SignalHorizon, timeframe: Option<Timeframe>) -> f64 {
    match (horizon, timeframe) {
        (SignalHorizon::Short, Some(Timeframe::OneDay)) => 1.5,
        (SignalHorizon::Short, Some(Timeframe::OneWeek)) => 1.25,
        _ => 1.0,
    }
}

/// Weighted mean of factor scores on a 0-100 scale. No factors (or no
/// effective weight) is the neutral 50.
pub fn score_factors(factors: &[GeneratedFactor], timeframe: Option<Timeframe>) -> f64 {
    let (weighted_sum, total_weight) = factors.iter().fold((0.0, 0.0), |(sum, total), generated| {
        let factor = &generated.factor;
        let effective = factor.weight * factor.confidence * timeframe_multiplier(generated.horizon, timeframe);
        (sum + factor_score(factor.factor_type) * effective, total + effective)
    });

    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }
    (weighted_sum / total_weight).clamp(0.0, 100.0)
}

/// Reasons the technical confidence gets marked down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePenalty {
    /// Fewer bars than the longest configured period needs
    InsufficientHistory,
    ShortTimeframe,
    ZeroVolumeBars,
    MalformedBars,
    NoFactors,
}

impl ConfidencePenalty {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidencePenalty::InsufficientHistory => "insufficient_history",
            ConfidencePenalty::ShortTimeframe => "short_timeframe",
            ConfidencePenalty::ZeroVolumeBars => "zero_volume_bars",
            ConfidencePenalty::MalformedBars => "malformed_bars",
            ConfidencePenalty::NoFactors => "no_factors",
        }
    }
}

/// Multipliers in (0, 1] applied for each penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyConfig {
    pub insufficient_history: f64,
    pub intraday_timeframe: f64,
    pub weekly_timeframe: f64,
    pub zero_volume_bars: f64,
    pub malformed_bars: f64,
    pub no_factors: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            insufficient_history: 0.75,
            intraday_timeframe: 0.8,
            weekly_timeframe: 0.9,
            zero_volume_bars: 0.85,
            malformed_bars: 0.7,
            no_factors: 0.6,
        }
    }
}

impl PenaltyConfig {
    pub fn multiplier(&self, penalty: ConfidencePenalty, timeframe: Option<Timeframe>) -> f64 {
        match penalty {
            ConfidencePenalty::InsufficientHistory => self.insufficient_history,
            ConfidencePenalty::ShortTimeframe => match timeframe {
                Some(Timeframe::OneDay) => self.intraday_timeframe,
                Some(Timeframe::OneWeek) => self.weekly_timeframe,
                _ => 1.0,
            },
            ConfidencePenalty::ZeroVolumeBars => self.zero_volume_bars,
            ConfidencePenalty::MalformedBars => self.malformed_bars,
            ConfidencePenalty::NoFactors => self.no_factors,
        }
    }
}

/// Product of the penalty multipliers, clamped to [0.1, 1.0]
pub fn combine_penalties(multipliers: &[f64]) -> f64 {
    multipliers
        .iter()
        .map(|m| if m.is_finite() { m.clamp(0.0, 1.0) } else { 1.0 })
        .product::<f64>()
        .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{AnalysisFactor, AnalysisSource};

    fn generated(factor_type: FactorType, weight: f64, confidence: f64, horizon: SignalHorizon) -> GeneratedFactor {
        GeneratedFactor {
            rule: "test",
            horizon,
            factor: AnalysisFactor::new(AnalysisSource::Technical, factor_type, "test", weight, confidence),
        }
    }

    #[test]
    fn test_no_factors_is_neutral() {
        assert_eq!(score_factors(&[], None), NEUTRAL_SCORE);
        assert_eq!(score_factors(&[], Some(Timeframe::OneDay)), NEUTRAL_SCORE);
    }

    #[test]
    fn test_zero_weight_factors_are_neutral() {
        let factors = vec![generated(FactorType::Positive, 0.0, 0.9, SignalHorizon::Long)];
        assert_eq!(score_factors(&factors, None), NEUTRAL_SCORE);
    }

    #[test]
    fn test_single_direction_scores() {
        let bullish = vec![generated(FactorType::Positive, 0.7, 0.7, SignalHorizon::Long)];
        let bearish = vec![generated(FactorType::Negative, 0.7, 0.7, SignalHorizon::Long)];
        assert!((score_factors(&bullish, None) - 85.0).abs() < 1e-9);
        assert!((score_factors(&bearish, None) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_balanced_factors_average() {
        let factors = vec![
            generated(FactorType::Positive, 0.5, 0.8, SignalHorizon::Long),
            generated(FactorType::Negative, 0.5, 0.8, SignalHorizon::Long),
        ];
        assert!((score_factors(&factors, None) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_intraday_boosts_short_horizon_factors() {
        let factors = vec![
            generated(FactorType::Positive, 0.5, 0.8, SignalHorizon::Short),
            generated(FactorType::Negative, 0.5, 0.8, SignalHorizon::Long),
        ];
        let monthly = score_factors(&factors, Some(Timeframe::OneMonth));
        let intraday = score_factors(&factors, Some(Timeframe::OneDay));
        assert!((monthly - 50.0).abs() < 1e-9);
        // (85 * 1.5 + 15) / 2.5 = 57
        assert!((intraday - 57.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_clamped_regardless_of_penalty_count() {
        assert_eq!(combine_penalties(&[]), 1.0);
        assert_eq!(combine_penalties(&[0.5; 20]), MIN_CONFIDENCE);
        assert_eq!(combine_penalties(&[0.0]), MIN_CONFIDENCE);
        assert_eq!(combine_penalties(&[1.7, f64::NAN]), 1.0);
        assert!((combine_penalties(&[0.8, 0.5]) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_short_timeframe_penalty_only_for_short_buckets() {
        let config = PenaltyConfig::default();
        assert_eq!(config.multiplier(ConfidencePenalty::ShortTimeframe, Some(Timeframe::OneYear)), 1.0);
        assert_eq!(config.multiplier(ConfidencePenalty::ShortTimeframe, None), 1.0);
        assert!(config.multiplier(ConfidencePenalty::ShortTimeframe, Some(Timeframe::OneDay)) < 1.0);
    }
}
