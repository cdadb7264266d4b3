// Ports - Interface definitions (contracts)

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::domain::model::{VideoDimensions, Word};
use crate::error::{SubforgeError, SubforgeResult};
use crate::pipeline::job::JobStatus;

/// Port for reading source video dimensions
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe the source; `SourceUnavailable` if it is missing or unreadable
    async fn probe(&self, source: &Path) -> SubforgeResult<VideoDimensions>;
}

/// Port for the speech-to-text collaborator
#[async_trait]
pub trait TranscribePort: Send + Sync {
    /// Word-level transcript of the source's audio
    async fn transcribe(&self, source: &Path, ctx: &StageContext) -> SubforgeResult<Vec<Word>>;
}

/// Everything the encoder needs to burn a script into a video
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub script: PathBuf,
    pub output: PathBuf,
    /// Source duration, used to turn encoder time into a fraction
    pub duration_ms: Option<u64>,
}

/// Port for the video encoder/muxer
#[async_trait]
pub trait EncodePort: Send + Sync {
    /// Encode and return the path of the written output
    async fn encode(&self, request: &EncodeRequest, ctx: &StageContext) -> SubforgeResult<PathBuf>;
}

/// Observer notified of job changes
///
/// Called outside any pipeline lock, from the task driving the job.
pub trait JobObserver: Send + Sync {
    /// Called on every state transition, including the initial `queued`
    fn on_state(&self, status: &JobStatus);

    /// Called when progress advances within a state
    fn on_progress(&self, _status: &JobStatus) {}
}

/// Cooperative cancellation flag shared between a job and its stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        // Register before checking so a concurrent cancel is not missed
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Receiver of stage progress, as a fraction of the stage
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

struct NoopSink;

impl ProgressSink for NoopSink {
    fn report(&self, _fraction: f64) {}
}

/// Handle given to collaborators for progress and cancellation checkpoints
#[derive(Clone)]
pub struct StageContext {
    cancel: CancelToken,
    sink: Arc<dyn ProgressSink>,
}

impl StageContext {
    pub fn new(cancel: CancelToken, sink: Arc<dyn ProgressSink>) -> Self {
        Self { cancel, sink }
    }

    /// Context not tied to any job; progress is dropped
    pub fn detached() -> Self {
        Self::new(CancelToken::new(), Arc::new(NoopSink))
    }

    /// Report progress through the current stage (0.0 - 1.0)
    pub fn report(&self, fraction: f64) {
        if fraction.is_finite() {
            self.sink.report(fraction.clamp(0.0, 1.0));
        }
    }

    /// Cancellation checkpoint
    pub fn checkpoint(&self) -> SubforgeResult<()> {
        if self.cancel.is_cancelled() {
            Err(SubforgeError::CancellationRequested)
        } else {
            Ok(())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}
