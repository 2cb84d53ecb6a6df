use std::collections::BTreeMap;

use analysis_core::{AnalysisError, AnalysisOutput, AnalysisRequest, Bar, TechnicalAnalyzer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::factors::*;
use crate::indicator_set::{IndicatorOptions, IndicatorSet};
use crate::params::IndicatorParams;
use crate::scoring::*;

/// Below this many bars the technical analysis fails outright
pub const MIN_BARS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalConfig {
    pub factors: FactorConfig,
    pub penalties: PenaltyConfig,
    pub indicators: IndicatorOptions,
}

/// Counts of suspect bars; they lower confidence but never abort
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DataQualityReport {
    pub malformed_bars: usize,
    pub zero_volume_bars: usize,
}

impl DataQualityReport {
    pub fn assess(bars: &[Bar]) -> Self {
        bars.iter().fold(Self::default(), |mut report, bar| {
            if bar.check_quality().is_err() {
                report.malformed_bars += 1;
            }
            if bar.volume <= 0.0 {
                report.zero_volume_bars += 1;
            }
            report
        })
    }
}

pub struct TechnicalAnalysisEngine {
    config: TechnicalConfig,
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self::with_config(TechnicalConfig::default())
    }

    pub fn with_config(config: TechnicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TechnicalConfig {
        &self.config
    }

    fn validate(&self, request: &AnalysisRequest, bars: &[Bar]) -> Result<(), AnalysisError> {
        if request.ticker.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("ticker must not be empty".to_string()));
        }
        if bars.len() < MIN_BARS {
            return Err(AnalysisError::InsufficientData(format!(
                "Need at least {} bars for technical analysis, got {}",
                MIN_BARS,
                bars.len()
            )));
        }
        if let Some(index) = bars.iter().position(|b| !b.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "bar {} contains a non-finite value",
                index
            )));
        }
        if bars.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
            return Err(AnalysisError::InvalidInput(
                "bars must be ordered oldest to newest".to_string(),
            ));
        }
        Ok(())
    }

    fn penalties(
        &self,
        request: &AnalysisRequest,
        bar_count: usize,
        params: &IndicatorParams,
        quality: &DataQualityReport,
        factor_count: usize,
    ) -> Vec<ConfidencePenalty> {
        let mut penalties = Vec::new();
        if bar_count < params.longest_period() + 1 {
            penalties.push(ConfidencePenalty::InsufficientHistory);
        }
        if request.timeframe.map(|tf| tf.is_short_term()).unwrap_or(false) {
            penalties.push(ConfidencePenalty::ShortTimeframe);
        }
        if quality.zero_volume_bars > 0 {
            penalties.push(ConfidencePenalty::ZeroVolumeBars);
        }
        if quality.malformed_bars > 0 {
            penalties.push(ConfidencePenalty::MalformedBars);
        }
        if factor_count == 0 {
            penalties.push(ConfidencePenalty::NoFactors);
        }
        penalties
    }

    /// Run the full indicator → factor → score pipeline over `bars`
    pub fn analyze_bars(&self, request: &AnalysisRequest, bars: &[Bar]) -> Result<AnalysisOutput, AnalysisError> {
        self.validate(request, bars)?;

        let quality = DataQualityReport::assess(bars);
        if quality.malformed_bars > 0 || quality.zero_volume_bars > 0 {
            tracing::warn!(
                "Data quality issues for {}: {} malformed bars, {} zero-volume bars",
                request.ticker,
                quality.malformed_bars,
                quality.zero_volume_bars
            );
        }

        let params = IndicatorParams::resolve(request.context, request.timeframe);
        let indicators = IndicatorSet::compute(bars, &params, &self.config.indicators);
        let current_price = bars[bars.len() - 1].close;

        let generated = generate_factors(&indicators, current_price, &params, &self.config.factors);
        let score = score_factors(&generated, request.timeframe);

        let penalties = self.penalties(request, bars.len(), &params, &quality, generated.len());
        let multipliers: Vec<f64> = penalties
            .iter()
            .map(|p| self.config.penalties.multiplier(*p, request.timeframe))
            .collect();
        let confidence = combine_penalties(&multipliers);

        let mut details: BTreeMap<String, f64> = indicators
            .available()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        details.insert("current_price".to_string(), current_price);
        details.insert("bar_count".to_string(), bars.len() as f64);
        details.insert("malformed_bars".to_string(), quality.malformed_bars as f64);
        details.insert("zero_volume_bars".to_string(), quality.zero_volume_bars as f64);
        details.insert("unavailable_indicators".to_string(), indicators.unavailable_count() as f64);
        for (penalty, multiplier) in penalties.iter().zip(&multipliers) {
            details.insert(format!("penalty_{}", penalty.as_str()), *multiplier);
        }

        tracing::debug!(
            "Technical analysis for {} ({} / {:?}): score {:.1}, confidence {:.2}, {} factors",
            request.ticker,
            request.context,
            request.timeframe,
            score,
            confidence,
            generated.len()
        );

        Ok(AnalysisOutput {
            score,
            factors: generated.into_iter().map(|g| g.factor).collect(),
            details,
            confidence,
        })
    }
}

#[async_trait]
impl TechnicalAnalyzer for TechnicalAnalysisEngine {
    async fn analyze(&self, request: &AnalysisRequest, bars: &[Bar]) -> Result<AnalysisOutput, AnalysisError> {
        self.analyze_bars(request, bars)
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
