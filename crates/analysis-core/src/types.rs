use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Check the OHLC ordering invariants. Violations are a data-quality
    /// problem, never a reason to drop the bar.
    pub fn check_quality(&self) -> Result<(), AnalysisError> {
        if self.high < self.low {
            return Err(AnalysisError::DataQuality(format!(
                "high {} below low {}",
                self.high, self.low
            )));
        }
        if self.high < self.open.max(self.close) {
            return Err(AnalysisError::DataQuality(format!(
                "high {} below open/close",
                self.high
            )));
        }
        if self.low > self.open.min(self.close) {
            return Err(AnalysisError::DataQuality(format!(
                "low {} above open/close",
                self.low
            )));
        }
        Ok(())
    }

    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Typical price (H+L+C)/3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Purpose of the analysis: long-horizon investing or short-term trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisContext {
    Investment,
    Trading,
}

impl AnalysisContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisContext::Investment => "investment",
            AnalysisContext::Trading => "trading",
        }
    }
}

impl fmt::Display for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizon bucket used to parameterize indicators and weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneDay => "1D",
            Timeframe::OneWeek => "1W",
            Timeframe::OneMonth => "1M",
            Timeframe::ThreeMonths => "3M",
            Timeframe::SixMonths => "6M",
            Timeframe::OneYear => "1Y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|tf| tf.as_str().eq_ignore_ascii_case(s))
    }

    /// The intraday bucket
    pub fn is_intraday(&self) -> bool {
        matches!(self, Timeframe::OneDay)
    }

    /// Buckets considered short-horizon (intraday and weekly)
    pub fn is_short_term(&self) -> bool {
        matches!(self, Timeframe::OneDay | Timeframe::OneWeek)
    }

    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::OneDay,
            Timeframe::OneWeek,
            Timeframe::OneMonth,
            Timeframe::ThreeMonths,
            Timeframe::SixMonths,
            Timeframe::OneYear,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three independent analysis sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Fundamental,
    Technical,
    Esg,
}

impl AnalysisSource {
    pub const ALL: [AnalysisSource; 3] = [
        AnalysisSource::Fundamental,
        AnalysisSource::Technical,
        AnalysisSource::Esg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Fundamental => "fundamental",
            AnalysisSource::Technical => "technical",
            AnalysisSource::Esg => "esg",
        }
    }
}

impl fmt::Display for AnalysisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorType {
    Positive,
    Negative,
}

/// A discrete, weighted, directional signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFactor {
    pub category: AnalysisSource,
    #[serde(rename = "type")]
    pub factor_type: FactorType,
    pub description: String,
    pub weight: f64,     // 0.0 to 1.0
    pub confidence: f64, // 0.0 to 1.0
}

impl AnalysisFactor {
    pub fn new(
        category: AnalysisSource,
        factor_type: FactorType,
        description: impl Into<String>,
        weight: f64,
        confidence: f64,
    ) -> Self {
        Self {
            category,
            factor_type,
            description: description.into(),
            weight,
            confidence,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.factor_type == FactorType::Positive
    }
}

/// Result of one analysis source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub score: f64, // 0.0 to 100.0
    pub factors: Vec<AnalysisFactor>,
    #[serde(default)]
    pub details: BTreeMap<String, f64>,
    pub confidence: f64, // 0.0 to 1.0
}

impl AnalysisOutput {
    /// Reject any value outside its declared range. Out-of-range values are an
    /// upstream contract violation and are never clamped here.
    pub fn validate(&self, source: AnalysisSource) -> Result<(), AnalysisError> {
        if !self.score.is_finite() || !(0.0..=100.0).contains(&self.score) {
            return Err(AnalysisError::InvalidInput(format!(
                "{} score {} outside [0, 100]",
                source, self.score
            )));
        }
        if !in_unit_range(self.confidence) {
            return Err(AnalysisError::InvalidInput(format!(
                "{} confidence {} outside [0, 1]",
                source, self.confidence
            )));
        }
        for factor in &self.factors {
            if !in_unit_range(factor.weight) || !in_unit_range(factor.confidence) {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} factor '{}' has weight {} / confidence {} outside [0, 1]",
                    source, factor.description, factor.weight, factor.confidence
                )));
            }
        }
        if let Some((key, value)) = self.details.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "{} detail '{}' is not finite ({})",
                source, key, value
            )));
        }
        Ok(())
    }
}

fn in_unit_range(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(score: f64, confidence: f64) -> AnalysisOutput {
        AnalysisOutput {
            score,
            factors: vec![],
            details: BTreeMap::new(),
            confidence,
        }
    }

    #[test]
    fn test_bar_quality_flags_inverted_range() {
        let bar = Bar {
            timestamp: Utc::now(),
            open: 10.0,
            high: 9.0,
            low: 11.0,
            close: 10.0,
            volume: 100.0,
        };
        assert!(matches!(bar.check_quality(), Err(AnalysisError::DataQuality(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(output(50.0, 0.5).validate(AnalysisSource::Esg).is_ok());
        assert!(output(100.5, 0.5).validate(AnalysisSource::Esg).is_err());
        assert!(output(-1.0, 0.5).validate(AnalysisSource::Esg).is_err());
        assert!(output(50.0, 1.2).validate(AnalysisSource::Esg).is_err());
        assert!(output(f64::NAN, 0.5).validate(AnalysisSource::Esg).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_factor_weight() {
        let mut out = output(60.0, 0.7);
        out.factors.push(AnalysisFactor::new(
            AnalysisSource::Fundamental,
            FactorType::Positive,
            "Strong margins",
            1.4,
            0.8,
        ));
        assert!(matches!(
            out.validate(AnalysisSource::Fundamental),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_factor_type_serializes_as_type() {
        let factor = AnalysisFactor::new(
            AnalysisSource::Technical,
            FactorType::Negative,
            "RSI overbought",
            0.6,
            0.7,
        );
        let json = serde_json::to_value(&factor).unwrap();
        assert_eq!(json["type"], "negative");
        assert_eq!(json["category"], "technical");
    }

    #[test]
    fn test_timeframe_round_trip_labels() {
        assert_eq!(Timeframe::parse("1w"), Some(Timeframe::OneWeek));
        assert_eq!(Timeframe::parse("2D"), None);
        let json = serde_json::to_string(&Timeframe::ThreeMonths).unwrap();
        assert_eq!(json, "\"3M\"");
    }
}
