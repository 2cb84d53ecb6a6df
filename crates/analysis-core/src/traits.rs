use async_trait::async_trait;
use crate::{AnalysisContext, AnalysisError, AnalysisOutput, Bar, Timeframe};

/// What a source analysis is asked to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub context: AnalysisContext,
    pub timeframe: Option<Timeframe>,
}

impl AnalysisRequest {
    pub fn new(ticker: impl Into<String>, context: AnalysisContext, timeframe: Option<Timeframe>) -> Self {
        Self {
            ticker: ticker.into(),
            context,
            timeframe,
        }
    }
}

/// Supplies ordered (oldest first) OHLCV bars for a ticker
#[async_trait]
pub trait PriceSeriesProvider: Send + Sync {
    async fn bars(&self, request: &AnalysisRequest) -> Result<Vec<Bar>, AnalysisError>;
}

/// Trait for technical analysis engines
#[async_trait]
pub trait TechnicalAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest, bars: &[Bar]) -> Result<AnalysisOutput, AnalysisError>;
}

/// Trait for fundamental analysis engines
#[async_trait]
pub trait FundamentalAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError>;
}

/// Trait for ESG / sentiment analysis engines
#[async_trait]
pub trait EsgAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError>;
}
