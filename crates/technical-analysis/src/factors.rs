use analysis_core::{AnalysisFactor, AnalysisSource, FactorType};
use serde::{Deserialize, Serialize};

use crate::indicator_set::IndicatorSet;
use crate::params::IndicatorParams;

/// Whether a rule reads short-term momentum or the longer trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalHorizon {
    Short,
    Long,
}

/// A factor together with the rule that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFactor {
    pub rule: &'static str,
    pub horizon: SignalHorizon,
    pub factor: AnalysisFactor,
}

/// Weight and confidence attached to every factor a rule emits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleConstants {
    pub weight: f64,
    pub confidence: f64,
}

const fn constants(weight: f64, confidence: f64) -> RuleConstants {
    RuleConstants { weight, confidence }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorConfig {
    pub trend_alignment: RuleConstants,
    pub macd_momentum: RuleConstants,
    pub rsi_extreme: RuleConstants,
    pub oscillator_extreme: RuleConstants,
    pub band_breakout: RuleConstants,
    pub volume_confirmation: RuleConstants,
    pub level_proximity: RuleConstants,
    pub volatility_regime: RuleConstants,
    /// Latest volume must exceed the average by this ratio
    pub volume_spike_ratio: f64,
    /// Max distance (% of price) to count as "near" a level
    pub level_proximity_pct: f64,
    /// ATR as % of price above which volatility counts as elevated
    pub high_volatility_pct: f64,
    pub stochastic_oversold: f64,
    pub stochastic_overbought: f64,
    pub williams_oversold: f64,
    pub williams_overbought: f64,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            trend_alignment: constants(0.8, 0.75),
            macd_momentum: constants(0.6, 0.65),
            rsi_extreme: constants(0.7, 0.7),
            oscillator_extreme: constants(0.5, 0.6),
            band_breakout: constants(0.6, 0.65),
            volume_confirmation: constants(0.5, 0.6),
            level_proximity: constants(0.5, 0.55),
            volatility_regime: constants(0.3, 0.5),
            volume_spike_ratio: 1.5,
            level_proximity_pct: 2.0,
            high_volatility_pct: 4.0,
            stochastic_oversold: 20.0,
            stochastic_overbought: 80.0,
            williams_oversold: -80.0,
            williams_overbought: -20.0,
        }
    }
}

struct RuleInput<'a> {
    indicators: &'a IndicatorSet,
    price: f64,
    params: &'a IndicatorParams,
    config: &'a FactorConfig,
}

type Rule = fn(&RuleInput) -> Option<(FactorType, String, RuleConstants)>;

/// The fixed rule battery. Each rule sees the same input and never looks at
/// another rule's output.
const RULES: &[(&str, SignalHorizon, Rule)] = &[
    ("trend_alignment", SignalHorizon::Long, trend_alignment),
    ("macd_momentum", SignalHorizon::Short, macd_momentum),
    ("rsi_extreme", SignalHorizon::Short, rsi_extreme),
    ("oscillator_extreme", SignalHorizon::Short, oscillator_extreme),
    ("band_breakout", SignalHorizon::Short, band_breakout),
    ("volume_confirmation", SignalHorizon::Short, volume_confirmation),
    ("level_proximity", SignalHorizon::Short, level_proximity),
    ("volatility_regime", SignalHorizon::Long, volatility_regime),
];

/// Run every rule against the indicator snapshot
pub fn generate_factors(
    indicators: &IndicatorSet,
    price: f64,
    params: &IndicatorParams,
    config: &FactorConfig,
) -> Vec<GeneratedFactor> {
    let input = RuleInput {
        indicators,
        price,
        params,
        config,
    };

    RULES
        .iter()
        .filter_map(|(name, horizon, rule)| {
            rule(&input).map(|(factor_type, description, constants)| GeneratedFactor {
                rule: *name,
                horizon: *horizon,
                factor: AnalysisFactor::new(
                    AnalysisSource::Technical,
                    factor_type,
                    description,
                    constants.weight.clamp(0.0, 1.0),
                    constants.confidence.clamp(0.0, 1.0),
                ),
            })
        })
        .collect()
}

fn trend_alignment(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let short = input.indicators.get("sma_short")?;
    let medium = input.indicators.get("sma_medium")?;
    let long = input.indicators.get("sma_long");
    let mut constants = input.config.trend_alignment;
    let price = input.price;

    let (factor_type, direction) = if price > short && short > medium {
        (FactorType::Positive, "above")
    } else if price < short && short < medium {
        (FactorType::Negative, "below")
    } else {
        return None;
    };

    let long_agrees = match (factor_type, long) {
        (FactorType::Positive, Some(long)) => medium > long,
        (FactorType::Negative, Some(long)) => medium < long,
        _ => false,
    };
    let description = if long_agrees {
        constants.confidence = (constants.confidence + 0.1).min(1.0);
        format!(
            "Price {} {}/{}/{}-period moving averages in full alignment",
            direction, input.params.sma_short, input.params.sma_medium, input.params.sma_long
        )
    } else {
        format!(
            "Price {} {}/{}-period moving averages",
            direction, input.params.sma_short, input.params.sma_medium
        )
    };
    Some((factor_type, description, constants))
}

fn macd_momentum(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let macd = input.indicators.get("macd")?;
    let histogram = input.indicators.get("macd_histogram")?;
    let constants = input.config.macd_momentum;

    if macd > 0.0 && histogram > 0.0 {
        Some((FactorType::Positive, format!("MACD bullish momentum ({:.2})", macd), constants))
    } else if macd < 0.0 && histogram < 0.0 {
        Some((FactorType::Negative, format!("MACD bearish momentum ({:.2})", macd), constants))
    } else {
        None
    }
}

fn rsi_extreme(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let rsi = input.indicators.get("rsi")?;
    let constants = input.config.rsi_extreme;

    if rsi <= input.params.rsi_oversold {
        Some((FactorType::Positive, format!("RSI oversold ({:.1})", rsi), constants))
    } else if rsi >= input.params.rsi_overbought {
        Some((FactorType::Negative, format!("RSI overbought ({:.1})", rsi), constants))
    } else {
        None
    }
}

fn oscillator_extreme(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let k = input.indicators.get("stoch_k")?;
    let williams = input.indicators.get("williams_r")?;
    let config = input.config;

    if k < config.stochastic_oversold && williams <= config.williams_oversold {
        Some((
            FactorType::Positive,
            format!("Stochastic ({:.1}) and Williams %R ({:.1}) oversold", k, williams),
            config.oscillator_extreme,
        ))
    } else if k > config.stochastic_overbought && williams >= config.williams_overbought {
        Some((
            FactorType::Negative,
            format!("Stochastic ({:.1}) and Williams %R ({:.1}) overbought", k, williams),
            config.oscillator_extreme,
        ))
    } else {
        None
    }
}

fn band_breakout(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let upper = input.indicators.get("bb_upper")?;
    let lower = input.indicators.get("bb_lower")?;
    let constants = input.config.band_breakout;

    if upper <= lower {
        // Zero-width bands on a flat series
        return None;
    }
    if input.price < lower {
        Some((FactorType::Positive, "Price below lower Bollinger Band".to_string(), constants))
    } else if input.price > upper {
        Some((FactorType::Negative, "Price above upper Bollinger Band".to_string(), constants))
    } else {
        None
    }
}

fn volume_confirmation(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let average = input.indicators.get("volume_avg")?;
    let latest = input.indicators.get("volume_latest")?;
    let change = input.indicators.get("price_change")?;
    let constants = input.config.volume_confirmation;

    if average <= 0.0 || latest < average * input.config.volume_spike_ratio {
        return None;
    }
    let ratio = latest / average;
    if change > 0.0 {
        Some((
            FactorType::Positive,
            format!("Advance confirmed by volume ({:.1}x average)", ratio),
            constants,
        ))
    } else if change < 0.0 {
        Some((
            FactorType::Negative,
            format!("Decline confirmed by volume ({:.1}x average)", ratio),
            constants,
        ))
    } else {
        None
    }
}

fn level_proximity(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    if input.price <= 0.0 {
        return None;
    }
    let constants = input.config.level_proximity;
    let threshold = input.config.level_proximity_pct;

    let support_distance = input
        .indicators
        .get("nearest_support")
        .map(|s| (s, (input.price - s) / input.price * 100.0))
        .filter(|(_, d)| *d <= threshold);
    let resistance_distance = input
        .indicators
        .get("nearest_resistance")
        .map(|r| (r, (r - input.price) / input.price * 100.0))
        .filter(|(_, d)| *d <= threshold);

    match (support_distance, resistance_distance) {
        (Some((level, ds)), Some((_, dr))) if ds <= dr => Some(near_support(level, ds, constants)),
        (Some((level, ds)), None) => Some(near_support(level, ds, constants)),
        (_, Some((level, dr))) => Some((
            FactorType::Negative,
            format!("Price {:.1}% below resistance at {:.2}", dr, level),
            constants,
        )),
        (None, None) => None,
    }
}

fn near_support(level: f64, distance: f64, constants: RuleConstants) -> (FactorType, String, RuleConstants) {
    (
        FactorType::Positive,
        format!("Price {:.1}% above support at {:.2}", distance, level),
        constants,
    )
}

fn volatility_regime(input: &RuleInput) -> Option<(FactorType, String, RuleConstants)> {
    let atr = input.indicators.get("atr")?;
    if input.price <= 0.0 {
        return None;
    }
    let atr_pct = atr / input.price * 100.0;
    if atr_pct >= input.config.high_volatility_pct {
        Some((
            FactorType::Negative,
            format!("Elevated volatility (ATR {:.1}% of price)", atr_pct),
            input.config.volatility_regime,
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator_set::IndicatorOptions;
    use analysis_core::{AnalysisContext, Bar};
    use chrono::{Duration, TimeZone, Utc};

    fn bars_from(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close * 1.005,
                low: close * 0.995,
                close,
                volume,
            })
            .collect()
    }

    fn factors_for(closes: &[f64], volumes: &[f64], context: AnalysisContext) -> Vec<GeneratedFactor> {
        let bars = bars_from(closes, volumes);
        let params = IndicatorParams::resolve(context, None);
        let set = IndicatorSet::compute(&bars, &params, &IndicatorOptions::default());
        let price = *closes.last().unwrap();
        generate_factors(&set, price, &params, &FactorConfig::default())
    }

    fn has_rule(factors: &[GeneratedFactor], rule: &str, factor_type: FactorType) -> bool {
        factors
            .iter()
            .any(|f| f.rule == rule && f.factor.factor_type == factor_type)
    }

    #[test]
    fn test_uptrend_emits_positive_trend_and_overbought() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let volumes = vec![1_000.0; 60];
        let factors = factors_for(&closes, &volumes, AnalysisContext::Trading);

        assert!(has_rule(&factors, "trend_alignment", FactorType::Positive));
        assert!(has_rule(&factors, "macd_momentum", FactorType::Positive));
        assert!(has_rule(&factors, "rsi_extreme", FactorType::Negative));
        assert!(factors.iter().all(|f| f.factor.category == AnalysisSource::Technical));
    }

    #[test]
    fn test_downtrend_emits_negative_trend_and_oversold() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let volumes = vec![1_000.0; 60];
        let factors = factors_for(&closes, &volumes, AnalysisContext::Trading);

        assert!(has_rule(&factors, "trend_alignment", FactorType::Negative));
        assert!(has_rule(&factors, "rsi_extreme", FactorType::Positive));
    }

    #[test]
    fn test_volume_spike_on_up_day() {
        let mut closes = vec![50.0; 30];
        closes.push(51.0);
        let mut volumes = vec![1_000.0; 30];
        volumes.push(5_000.0);
        let factors = factors_for(&closes, &volumes, AnalysisContext::Trading);

        assert!(has_rule(&factors, "volume_confirmation", FactorType::Positive));
    }

    #[test]
    fn test_rules_emit_at_most_one_factor_each() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 8.0).collect();
        let volumes: Vec<f64> = (0..60).map(|i| 1_000.0 + (i % 7) as f64 * 400.0).collect();
        let factors = factors_for(&closes, &volumes, AnalysisContext::Investment);

        for (name, _, _) in RULES {
            assert!(factors.iter().filter(|f| f.rule == *name).count() <= 1);
        }
    }

    #[test]
    fn test_flat_series_emits_no_directional_factors() {
        let closes = vec![100.0; 40];
        let volumes = vec![1_000.0; 40];
        let factors = factors_for(&closes, &volumes, AnalysisContext::Investment);

        assert!(!has_rule(&factors, "trend_alignment", FactorType::Positive));
        assert!(!has_rule(&factors, "trend_alignment", FactorType::Negative));
        assert!(!has_rule(&factors, "band_breakout", FactorType::Positive));
        assert!(!has_rule(&factors, "macd_momentum", FactorType::Positive));
    }
}
