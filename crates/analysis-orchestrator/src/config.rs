use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    // Per-source invocation limits
    pub source_timeout: Duration,  // 10s per attempt
    pub max_retries: u32,          // 2 (3 attempts total)
    pub initial_backoff: Duration, // 250ms, doubled per retry

    // Bar cache
    pub cache_ttl: Duration, // 5 minutes
    pub cache_capacity: usize, // 256 series
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(10),
            max_retries: 2,
            initial_backoff: Duration::from_millis(250),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 256,
        }
    }
}

impl OrchestratorConfig {
    /// Load `.env` (if present) and read `ORCHESTRATOR_*` overrides
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{} must be a whole number of milliseconds, got {:?}", key, raw)),
                None => Ok(default),
            }
        };

        let config = Self {
            source_timeout: millis("ORCHESTRATOR_SOURCE_TIMEOUT_MS", defaults.source_timeout)?,
            max_retries: lookup("ORCHESTRATOR_MAX_RETRIES")
                .unwrap_or_else(|| defaults.max_retries.to_string())
                .trim()
                .parse()
                .context("ORCHESTRATOR_MAX_RETRIES must be a non-negative integer")?,
            initial_backoff: millis("ORCHESTRATOR_INITIAL_BACKOFF_MS", defaults.initial_backoff)?,
            cache_ttl: lookup("ORCHESTRATOR_CACHE_TTL_SECS")
                .unwrap_or_else(|| defaults.cache_ttl.as_secs().to_string())
                .trim()
                .parse()
                .map(Duration::from_secs)
                .context("ORCHESTRATOR_CACHE_TTL_SECS must be a whole number of seconds")?,
            cache_capacity: lookup("ORCHESTRATOR_CACHE_CAPACITY")
                .unwrap_or_else(|| defaults.cache_capacity.to_string())
                .trim()
                .parse()
                .context("ORCHESTRATOR_CACHE_CAPACITY must be a non-negative integer")?,
        };

        if config.source_timeout.is_zero() {
            anyhow::bail!("ORCHESTRATOR_SOURCE_TIMEOUT_MS must be greater than zero");
        }
        Ok(config)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}
