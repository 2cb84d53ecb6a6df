use analysis_core::{AnalysisContext, AnalysisOutput, AnalysisSource, Timeframe};
use serde::{Deserialize, Serialize};

use crate::recommendation::Recommendation;
use crate::report::SynthesisReport;

/// One value per analysis source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerSource<T> {
    pub fundamental: T,
    pub technical: T,
    pub esg: T,
}

pub type SourceWeights = PerSource<f64>;

impl<T> PerSource<T> {
    pub fn new(fundamental: T, technical: T, esg: T) -> Self {
        Self {
            fundamental,
            technical,
            esg,
        }
    }

    pub fn get(&self, source: AnalysisSource) -> &T {
        match source {
            AnalysisSource::Fundamental => &self.fundamental,
            AnalysisSource::Technical => &self.technical,
            AnalysisSource::Esg => &self.esg,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnalysisSource, &T)> {
        AnalysisSource::ALL.into_iter().map(move |source| (source, self.get(source)))
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> PerSource<U> {
        PerSource {
            fundamental: f(&self.fundamental),
            technical: f(&self.technical),
            esg: f(&self.esg),
        }
    }
}

impl PerSource<f64> {
    pub fn total(&self) -> f64 {
        self.fundamental + self.technical + self.esg
    }

    /// Scale so the three values sum to 1.0 (unchanged when the sum is zero)
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return *self;
        }
        self.map(|w| w / total)
    }

    /// Weighted mean of `values` using `self` as weights
    pub fn weighted_mean(&self, values: &PerSource<f64>) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        self.iter().map(|(source, w)| w * values.get(source)).sum::<f64>() / total
    }

    pub fn max(&self) -> f64 {
        self.fundamental.max(self.technical).max(self.esg)
    }

    pub fn min(&self) -> f64 {
        self.fundamental.min(self.technical).min(self.esg)
    }
}

/// Source pairs checked for divergence, in report order
pub const SOURCE_PAIRS: [(AnalysisSource, AnalysisSource); 3] = [
    (AnalysisSource::Fundamental, AnalysisSource::Technical),
    (AnalysisSource::Fundamental, AnalysisSource::Esg),
    (AnalysisSource::Technical, AnalysisSource::Esg),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisInput {
    pub ticker: String,
    pub context: AnalysisContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    pub fundamental: AnalysisOutput,
    pub technical: AnalysisOutput,
    pub esg: AnalysisOutput,
}

impl SynthesisInput {
    pub fn output(&self, source: AnalysisSource) -> &AnalysisOutput {
        match source {
            AnalysisSource::Fundamental => &self.fundamental,
            AnalysisSource::Technical => &self.technical,
            AnalysisSource::Esg => &self.esg,
        }
    }

    pub fn scores(&self) -> PerSource<f64> {
        PerSource::new(self.fundamental.score, self.technical.score, self.esg.score)
    }

    pub fn confidences(&self) -> PerSource<f64> {
        PerSource::new(
            self.fundamental.confidence,
            self.technical.confidence,
            self.esg.confidence,
        )
    }
}

/// Agreement of all sources on direction and magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceFactor {
    pub description: String,
    pub weight: f64,
    pub supporting_analyses: Vec<AnalysisSource>,
    pub metadata: serde_json::Value,
}

/// Disagreement between two sources beyond the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivergenceFactor {
    pub category: String,
    pub description: String,
    pub conflicting_analyses: Vec<AnalysisSource>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOutput {
    pub synthesis_score: u8,
    pub convergence_factors: Vec<ConvergenceFactor>,
    pub divergence_factors: Vec<DivergenceFactor>,
    pub report: SynthesisReport,
    pub confidence: f64,
}

impl SynthesisOutput {
    pub fn recommendation(&self) -> Recommendation {
        self.report.recommendation
    }
}
