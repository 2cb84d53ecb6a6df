use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use analysis_core::{
    AnalysisContext, AnalysisError, AnalysisFactor, AnalysisOutput, AnalysisRequest, AnalysisSource, Bar,
    EsgAnalyzer, FactorType, FundamentalAnalyzer, PriceSeriesProvider, TechnicalAnalyzer, Timeframe,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::*;

fn trending_bars(count: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let close = 50.0 + 0.4 * i as f64 + if i % 3 == 0 { 0.8 } else { 0.0 };
            Bar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: close - 0.2,
                high: close + 0.6,
                low: close - 0.7,
                close,
                volume: 250_000.0 + (i % 5) as f64 * 10_000.0,
            }
        })
        .collect()
}

fn fixed_output(source: AnalysisSource, score: f64) -> AnalysisOutput {
    AnalysisOutput {
        score,
        factors: vec![AnalysisFactor::new(source, FactorType::Positive, "steady", 0.5, 0.8)],
        details: BTreeMap::new(),
        confidence: 0.75,
    }
}

struct StaticBars {
    bars: Vec<Bar>,
    calls: AtomicU32,
}

impl StaticBars {
    fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            bars: trending_bars(count),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl PriceSeriesProvider for StaticBars {
    async fn bars(&self, _request: &AnalysisRequest) -> Result<Vec<Bar>, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bars.clone())
    }
}

/// Fails `failures` times with a retryable error, then returns `output`.
/// `reject` fails every call at once with a non-retryable error.
struct ScriptedAnalysis {
    source: AnalysisSource,
    output: AnalysisOutput,
    failures: u32,
    hang: bool,
    reject: bool,
    calls: AtomicU32,
}

impl ScriptedAnalysis {
    fn build(source: AnalysisSource, score: f64, failures: u32, hang: bool, reject: bool) -> Arc<Self> {
        Arc::new(Self {
            source,
            output: fixed_output(source, score),
            failures,
            hang,
            reject,
            calls: AtomicU32::new(0),
        })
    }

    fn ok(source: AnalysisSource, score: f64) -> Arc<Self> {
        Self::build(source, score, 0, false, false)
    }

    fn flaky(source: AnalysisSource, score: f64, failures: u32) -> Arc<Self> {
        Self::build(source, score, failures, false, false)
    }

    fn failing(source: AnalysisSource) -> Arc<Self> {
        Self::build(source, 50.0, u32::MAX, false, false)
    }

    fn hanging(source: AnalysisSource) -> Arc<Self> {
        Self::build(source, 50.0, 0, true, false)
    }

    fn rejecting(source: AnalysisSource) -> Arc<Self> {
        Self::build(source, 50.0, 0, false, true)
    }

    async fn run(&self) -> Result<AnalysisOutput, AnalysisError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(AnalysisError::InvalidInput("unknown ticker".to_string()));
        }
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if call < self.failures {
            return Err(AnalysisError::upstream(self.source, "service unavailable"));
        }
        Ok(self.output.clone())
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FundamentalAnalyzer for ScriptedAnalysis {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError> {
        self.run().await
    }
}

#[async_trait]
impl EsgAnalyzer for ScriptedAnalysis {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisOutput, AnalysisError> {
        self.run().await
    }
}

struct HangingTechnical;

#[async_trait]
impl TechnicalAnalyzer for HangingTechnical {
    async fn analyze(&self, _request: &AnalysisRequest, _bars: &[Bar]) -> Result<AnalysisOutput, AnalysisError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(fixed_output(AnalysisSource::Technical, 50.0))
    }
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        source_timeout: Duration::from_millis(100),
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        ..OrchestratorConfig::default()
    }
}

fn orchestrator(
    bars: Arc<StaticBars>,
    fundamental: Arc<ScriptedAnalysis>,
    esg: Arc<ScriptedAnalysis>,
) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(bars, fundamental, esg).with_config(fast_config())
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new("ACME", AnalysisContext::Investment, Some(Timeframe::ThreeMonths))
}

fn expect_upstream(result: Result<impl std::fmt::Debug, AnalysisError>, expected: AnalysisSource) -> String {
    match result {
        Err(AnalysisError::UpstreamFailure { analysis, reason }) => {
            assert_eq!(analysis, expected);
            reason
        }
        other => panic!("expected upstream failure from {}, got {:?}", expected, other),
    }
}

#[tokio::test]
async fn test_synthesizes_all_three_sources() {
    let fundamental = ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0);
    let esg = ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0);
    let orch = orchestrator(StaticBars::new(120), fundamental.clone(), esg.clone());

    let output = orch.analyze(&request()).await.unwrap();

    assert!(output.synthesis_score <= 100);
    assert!((0.0..=1.0).contains(&output.confidence));
    assert_eq!(output.report.sources.fundamental, fixed_output(AnalysisSource::Fundamental, 80.0));
    assert_eq!(output.report.sources.esg, fixed_output(AnalysisSource::Esg, 70.0));
    assert_eq!(output.report.sources.technical.details["bar_count"], 120.0);
    assert_eq!(fundamental.calls(), 1);
    assert_eq!(esg.calls(), 1);
}

#[tokio::test]
async fn test_failing_source_aborts_with_upstream_failure() {
    let esg = ScriptedAnalysis::failing(AnalysisSource::Esg);
    let orch = orchestrator(
        StaticBars::new(60),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        esg.clone(),
    );

    let reason = expect_upstream(orch.analyze(&request()).await, AnalysisSource::Esg);
    assert!(reason.contains("service unavailable"));
    // initial attempt + 2 retries
    assert_eq!(esg.calls(), 3);
}

#[tokio::test]
async fn test_hanging_source_times_out() {
    let orch = orchestrator(
        StaticBars::new(60),
        ScriptedAnalysis::hanging(AnalysisSource::Fundamental),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    );

    let started = Instant::now();
    let reason = expect_upstream(orch.analyze(&request()).await, AnalysisSource::Fundamental);
    assert!(reason.contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_hanging_technical_analyzer_times_out() {
    let orch = orchestrator(
        StaticBars::new(60),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    )
    .with_technical_analyzer(Arc::new(HangingTechnical));

    let result = tokio::time::timeout(Duration::from_secs(2), orch.analyze(&request()))
        .await
        .expect("technical step should be bounded by the source timeout");
    let reason = expect_upstream(result, AnalysisSource::Technical);
    assert!(reason.contains("timed out"));
}

#[tokio::test]
async fn test_first_failure_aborts_without_waiting_for_slow_sources() {
    let fundamental = ScriptedAnalysis::rejecting(AnalysisSource::Fundamental);
    let orch = AnalysisOrchestrator::new(
        StaticBars::new(60),
        fundamental.clone(),
        ScriptedAnalysis::hanging(AnalysisSource::Esg),
    )
    .with_config(OrchestratorConfig {
        source_timeout: Duration::from_millis(400),
        ..fast_config()
    });

    let started = Instant::now();
    let reason = expect_upstream(orch.analyze(&request()).await, AnalysisSource::Fundamental);
    assert!(reason.contains("unknown ticker"));
    assert!(started.elapsed() < Duration::from_millis(300));
    // non-retryable, so a single attempt
    assert_eq!(fundamental.calls(), 1);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let fundamental = ScriptedAnalysis::flaky(AnalysisSource::Fundamental, 80.0, 1);
    let orch = orchestrator(
        StaticBars::new(60),
        fundamental.clone(),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    );

    assert!(orch.analyze(&request()).await.is_ok());
    assert_eq!(fundamental.calls(), 2);
}

#[tokio::test]
async fn test_short_price_history_fails_technical_source() {
    let orch = orchestrator(
        StaticBars::new(5),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    );

    let reason = expect_upstream(orch.analyze(&request()).await, AnalysisSource::Technical);
    assert!(reason.contains("Insufficient data"));
}

#[tokio::test]
async fn test_bars_are_served_from_cache() {
    let bars = StaticBars::new(60);
    let orch = orchestrator(
        bars.clone(),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    );

    let first = orch.analyze(&request()).await.unwrap();
    let second = orch.analyze(&request()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(bars.calls.load(Ordering::SeqCst), 1);
    assert_eq!(orch.bar_cache().len(), 1);
}

#[tokio::test]
async fn test_empty_ticker_rejected_before_any_call() {
    let bars = StaticBars::new(60);
    let fundamental = ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0);
    let orch = orchestrator(bars.clone(), fundamental.clone(), ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0));

    let result = orch
        .analyze(&AnalysisRequest::new("", AnalysisContext::Trading, None))
        .await;
    assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    assert_eq!(bars.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fundamental.calls(), 0);
}

#[tokio::test]
async fn test_job_completes_and_can_be_purged() {
    let orch = orchestrator(
        StaticBars::new(60),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    );
    let jobs = SynthesisJobs::new(Arc::new(orch));

    let id = jobs.submit(request());
    assert_eq!(jobs.request(id), Some(request()));

    match jobs.wait(id).await {
        Some(JobStatus::Completed(output)) => assert!(output.synthesis_score <= 100),
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(!jobs.cancel(id));
    assert_eq!(jobs.purge_finished(), 1);
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_failed_job_reports_upstream_error() {
    let orch = orchestrator(
        StaticBars::new(60),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        ScriptedAnalysis::failing(AnalysisSource::Esg),
    );
    let jobs = SynthesisJobs::new(Arc::new(orch));

    let id = jobs.submit(request());
    match jobs.wait(id).await {
        Some(JobStatus::Failed(AnalysisError::UpstreamFailure { analysis, .. })) => {
            assert_eq!(analysis, AnalysisSource::Esg)
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_running_job() {
    let orch = AnalysisOrchestrator::new(
        StaticBars::new(60),
        ScriptedAnalysis::hanging(AnalysisSource::Fundamental),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    )
    .with_config(OrchestratorConfig {
        source_timeout: Duration::from_secs(60),
        ..fast_config()
    });
    let jobs = SynthesisJobs::new(Arc::new(orch));

    let id = jobs.submit(request());
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(jobs.cancel(id));
    assert_eq!(jobs.status(id), Some(JobStatus::Cancelled));
    assert_eq!(jobs.wait(id).await, Some(JobStatus::Cancelled));
    assert!(!jobs.cancel(id));
}

#[tokio::test]
async fn test_unknown_job_ids() {
    let orch = orchestrator(
        StaticBars::new(60),
        ScriptedAnalysis::ok(AnalysisSource::Fundamental, 80.0),
        ScriptedAnalysis::ok(AnalysisSource::Esg, 70.0),
    );
    let jobs = SynthesisJobs::new(Arc::new(orch));

    assert_eq!(jobs.status(99), None);
    assert!(jobs.subscribe(99).is_none());
    assert!(jobs.wait(99).await.is_none());
    assert!(!jobs.cancel(99));
}
