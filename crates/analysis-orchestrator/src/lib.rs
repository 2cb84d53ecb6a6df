pub mod cache;
pub mod config;
pub mod jobs;
pub mod orchestrator;
pub mod retry;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use cache::{BarCache, BarCacheKey};
pub use config::OrchestratorConfig;
pub use jobs::{JobId, JobStatus, SynthesisJobs};
pub use orchestrator::AnalysisOrchestrator;
pub use retry::call_with_retry;
pub use telemetry::init_tracing;
