use analysis_core::{AnalysisError, AnalysisSource};
use std::future::Future;

use crate::config::OrchestratorConfig;

/// Run `call` under the per-attempt timeout, retrying retryable failures with
/// exponential backoff. Whatever error survives is reported as an
/// `UpstreamFailure` naming `source`.
pub async fn call_with_retry<T, F, Fut>(
    source: AnalysisSource,
    ticker: &str,
    config: &OrchestratorConfig,
    mut call: F,
) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    let attempts = config.max_retries.saturating_add(1);
    let mut last_error = AnalysisError::upstream(source, "not invoked");

    for attempt in 1..=attempts {
        if attempt > 1 {
            let delay = config.backoff_for(attempt - 1);
            tracing::warn!(
                "Retrying {} source for {} in {:?} (attempt {}/{}): {}",
                source,
                ticker,
                delay,
                attempt,
                attempts,
                last_error
            );
            tokio::time::sleep(delay).await;
        }

        let outcome = match tokio::time::timeout(config.source_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::upstream(
                source,
                format!("timed out after {:?}", config.source_timeout),
            )),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => last_error = e,
            Err(e) => {
                last_error = e;
                break;
            }
        }
    }

    tracing::error!("{} source failed for {}: {}", source, ticker, last_error);
    Err(into_upstream(source, last_error))
}

pub(crate) fn into_upstream(source: AnalysisSource, error: AnalysisError) -> AnalysisError {
    match error {
        AnalysisError::UpstreamFailure { analysis, reason } if analysis == source => {
            AnalysisError::UpstreamFailure { analysis, reason }
        }
        other => AnalysisError::upstream(source, other.to_string()),
    }
}
