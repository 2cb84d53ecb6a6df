use analysis_core::{
    AnalysisError, AnalysisOutput, AnalysisRequest, AnalysisSource, Bar, EsgAnalyzer, FundamentalAnalyzer,
    PriceSeriesProvider, TechnicalAnalyzer,
};
use std::sync::Arc;
use synthesis_engine::{SynthesisEngine, SynthesisInput, SynthesisOutput};
use technical_analysis::TechnicalAnalysisEngine;

use crate::cache::{BarCache, BarCacheKey};
use crate::config::OrchestratorConfig;
use crate::retry::{call_with_retry, into_upstream};

/// Gathers the three source analyses for a ticker and synthesizes them
pub struct AnalysisOrchestrator {
    price_provider: Arc<dyn PriceSeriesProvider>,
    fundamental_analyzer: Arc<dyn FundamentalAnalyzer>,
    esg_analyzer: Arc<dyn EsgAnalyzer>,
    technical_analyzer: Arc<dyn TechnicalAnalyzer>,
    synthesis_engine: SynthesisEngine,
    bar_cache: BarCache,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        price_provider: Arc<dyn PriceSeriesProvider>,
        fundamental_analyzer: Arc<dyn FundamentalAnalyzer>,
        esg_analyzer: Arc<dyn EsgAnalyzer>,
    ) -> Self {
        let config = OrchestratorConfig::default();
        Self {
            price_provider,
            fundamental_analyzer,
            esg_analyzer,
            technical_analyzer: Arc::new(TechnicalAnalysisEngine::new()),
            synthesis_engine: SynthesisEngine::default(),
            bar_cache: BarCache::new(config.cache_ttl, config.cache_capacity),
            config,
        }
    }

    /// Replaces the config and resets the bar cache to its TTL/capacity
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.bar_cache = BarCache::new(config.cache_ttl, config.cache_capacity);
        self.config = config;
        self
    }

    pub fn with_technical_analyzer(mut self, analyzer: Arc<dyn TechnicalAnalyzer>) -> Self {
        self.technical_analyzer = analyzer;
        self
    }

    pub fn with_synthesis_engine(mut self, engine: SynthesisEngine) -> Self {
        self.synthesis_engine = engine;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn bar_cache(&self) -> &BarCache {
        &self.bar_cache
    }

    /// Run all three analyses concurrently and synthesize the result. Any
    /// source failure aborts with `UpstreamFailure`; no partial synthesis.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<SynthesisOutput, AnalysisError> {
        if request.ticker.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("ticker must not be empty".to_string()));
        }
        tracing::info!(
            "Starting synthesis for {} (context: {}, timeframe: {:?})",
            request.ticker,
            request.context,
            request.timeframe
        );

        // First failure drops the sources still in flight
        let (fundamental, technical, esg) = tokio::try_join!(
            self.fundamental_output(request),
            self.technical_output(request),
            self.esg_output(request),
        )?;

        let input = SynthesisInput {
            ticker: request.ticker.clone(),
            context: request.context,
            timeframe: request.timeframe,
            fundamental,
            technical,
            esg,
        };

        self.synthesis_engine.synthesize(&input)
    }

    async fn fundamental_output(&self, request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError> {
        let analyzer = &self.fundamental_analyzer;
        call_with_retry(AnalysisSource::Fundamental, &request.ticker, &self.config, move || {
            analyzer.analyze(request)
        })
        .await
    }

    async fn esg_output(&self, request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError> {
        let analyzer = &self.esg_analyzer;
        call_with_retry(AnalysisSource::Esg, &request.ticker, &self.config, move || analyzer.analyze(request)).await
    }

    async fn technical_output(&self, request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError> {
        let bars = self.bars(request).await?;
        tracing::debug!("Bars count for {}: {}", request.ticker, bars.len());

        let timeout = self.config.source_timeout;
        match tokio::time::timeout(timeout, self.technical_analyzer.analyze(request, &bars)).await {
            Ok(result) => result.map_err(|e| into_upstream(AnalysisSource::Technical, e)),
            Err(_) => {
                tracing::error!("Technical analysis for {} timed out after {:?}", request.ticker, timeout);
                Err(AnalysisError::upstream(
                    AnalysisSource::Technical,
                    format!("timed out after {:?}", timeout),
                ))
            }
        }
    }

    /// Cached bars for the request, fetched from the provider on a miss
    pub async fn bars(&self, request: &AnalysisRequest) -> Result<Vec<Bar>, AnalysisError> {
        let key = BarCacheKey::from(request);
        if let Some(bars) = self.bar_cache.get(&key) {
            tracing::debug!("Bar cache hit for {}", request.ticker);
            return Ok(bars);
        }

        let provider = &self.price_provider;
        let bars = call_with_retry(AnalysisSource::Technical, &request.ticker, &self.config, move || {
            provider.bars(request)
        })
        .await?;

        self.bar_cache.insert(key, bars.clone());
        Ok(bars)
    }
}
