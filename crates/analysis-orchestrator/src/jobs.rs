use analysis_core::{AnalysisError, AnalysisRequest};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use synthesis_engine::SynthesisOutput;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::orchestrator::AnalysisOrchestrator;

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed(Box<SynthesisOutput>),
    Failed(AnalysisError),
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_) | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::Running => write!(f, "Running"),
            Self::Completed(output) => write!(f, "Completed (score {})", output.synthesis_score),
            Self::Failed(e) => write!(f, "Failed: {}", e),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

struct JobEntry {
    request: AnalysisRequest,
    status_tx: Arc<watch::Sender<JobStatus>>,
    status_rx: watch::Receiver<JobStatus>,
    handle: JoinHandle<()>,
}

/// Runs syntheses as background tasks. Callers poll or await the status
/// through a watch channel instead of blocking on the analysis.
pub struct SynthesisJobs {
    orchestrator: Arc<AnalysisOrchestrator>,
    jobs: DashMap<JobId, JobEntry>,
    next_id: AtomicU64,
}

/// Set a status unless the job already reached a terminal state
fn transition(status_tx: &watch::Sender<JobStatus>, next: JobStatus) -> bool {
    status_tx.send_if_modified(|current| {
        if current.is_terminal() {
            return false;
        }
        *current = next;
        true
    })
}

impl SynthesisJobs {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        Self {
            orchestrator,
            jobs: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue a synthesis. Must be called from within a tokio runtime.
    pub fn submit(&self, request: AnalysisRequest) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (status_tx, status_rx) = watch::channel(JobStatus::Queued);
        let status_tx = Arc::new(status_tx);

        let orchestrator = Arc::clone(&self.orchestrator);
        let task_tx = Arc::clone(&status_tx);
        let task_request = request.clone();
        let handle = tokio::spawn(async move {
            if !transition(&task_tx, JobStatus::Running) {
                return;
            }
            let status = match orchestrator.analyze(&task_request).await {
                Ok(output) => {
                    tracing::info!("Job {} for {} completed", id, task_request.ticker);
                    JobStatus::Completed(Box::new(output))
                }
                Err(e) => {
                    tracing::warn!("Job {} for {} failed: {}", id, task_request.ticker, e);
                    JobStatus::Failed(e)
                }
            };
            transition(&task_tx, status);
        });

        tracing::info!("Queued job {} for {}", id, request.ticker);
        self.jobs.insert(
            id,
            JobEntry {
                request,
                status_tx,
                status_rx,
                handle,
            },
        );
        id
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.get(&id).map(|entry| entry.status_rx.borrow().clone())
    }

    pub fn request(&self, id: JobId) -> Option<AnalysisRequest> {
        self.jobs.get(&id).map(|entry| entry.request.clone())
    }

    pub fn subscribe(&self, id: JobId) -> Option<watch::Receiver<JobStatus>> {
        self.jobs.get(&id).map(|entry| entry.status_rx.clone())
    }

    /// Wait until the job reaches a terminal state
    pub async fn wait(&self, id: JobId) -> Option<JobStatus> {
        let mut rx = self.subscribe(id)?;
        loop {
            let status = rx.borrow_and_update().clone();
            if status.is_terminal() {
                return Some(status);
            }
            if rx.changed().await.is_err() {
                return Some(rx.borrow().clone());
            }
        }
    }

    /// Abort a job that has not finished yet. Returns false for unknown or
    /// already finished jobs.
    pub fn cancel(&self, id: JobId) -> bool {
        let Some(entry) = self.jobs.get(&id) else {
            return false;
        };
        let cancelled = transition(&entry.status_tx, JobStatus::Cancelled);
        if cancelled {
            entry.handle.abort();
            tracing::info!("Cancelled job {} for {}", id, entry.request.ticker);
        }
        cancelled
    }

    /// Drop finished jobs from the registry, returning how many were removed
    pub fn purge_finished(&self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, entry| !entry.status_rx.borrow().is_terminal());
        before.saturating_sub(self.jobs.len())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
