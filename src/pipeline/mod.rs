//! Job pipeline: transcription, rendering and encoding for submitted videos
//!
//! Jobs are queued on a bounded channel and picked up by a fixed pool of
//! worker tasks, so at most `max_workers` jobs run at once and the rest stay
//! `queued`. Job records live in a registry behind a short-held lock; status
//! reads never wait on a running stage.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cues::{CueBuilder, CueSettings};
use crate::domain::model::{VideoGeometry, Word};
use crate::error::{ErrorKind, SubforgeError, SubforgeResult};
use crate::layout::{classify_with, LayoutSettings};
use crate::ports::{
    CancelToken, EncodePort, EncodeRequest, JobObserver, ProbePort, ProgressSink, StageContext,
    TranscribePort,
};
use crate::render::{write_script, RenderSettings, TimelineRenderer};
use crate::style::{StyleCatalog, StylePreset, StyleSummary};
use crate::utils::format_file_size;
use crate::utils::path::output_path;

pub mod job;
pub mod progress;
pub mod workspace;

use job::{JobId, JobRecord, JobState, JobStatus};
use workspace::{JobWorkspace, RunDirectory};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Jobs running at the same time
    pub max_workers: usize,
    /// Jobs waiting for a worker before `submit` applies backpressure
    pub queue_capacity: usize,
    /// Shared parent of the run directories holding per-job workspaces
    pub work_root: PathBuf,
    /// Where rendered videos go; next to the source when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().max(1),
            queue_capacity: 64,
            work_root: std::env::temp_dir().join("subforge"),
            output_dir: None,
        }
    }
}

/// Settings for the pure stages run inside a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    pub layout: LayoutSettings,
    pub cues: CueSettings,
    pub render: RenderSettings,
}

/// Collaborators the pipeline drives
#[derive(Clone)]
pub struct PipelinePorts {
    pub probe: Arc<dyn ProbePort>,
    pub transcriber: Arc<dyn TranscribePort>,
    pub encoder: Arc<dyn EncodePort>,
    pub observers: Vec<Arc<dyn JobObserver>>,
}

struct JobEntry {
    record: JobRecord,
    cancel: CancelToken,
}

struct Shared {
    jobs: RwLock<HashMap<JobId, JobEntry>>,
    ports: PipelinePorts,
    settings: PipelineSettings,
    stages: StageSettings,
    catalog: &'static StyleCatalog,
    /// This pipeline's own directory under the work root
    run_dir: RunDirectory,
    /// Signalled whenever a job reaches a terminal state
    finished: Notify,
}

/// Handle to a running pipeline
pub struct JobPipeline {
    shared: Arc<Shared>,
    queue: Mutex<Option<mpsc::Sender<JobId>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobPipeline {
    /// Start the worker pool; must be called from within a tokio runtime
    pub fn start(
        settings: PipelineSettings,
        stages: StageSettings,
        ports: PipelinePorts,
    ) -> SubforgeResult<Self> {
        std::fs::create_dir_all(&settings.work_root)?;
        let purged = workspace::purge_stale(&settings.work_root);
        if purged > 0 {
            info!("Removed {} stale run directories", purged);
        }
        let run_dir = RunDirectory::claim(&settings.work_root)?;

        let worker_count = settings.max_workers.max(1);
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let shared = Arc::new(Shared {
            jobs: RwLock::new(HashMap::new()),
            ports,
            settings,
            stages,
            catalog: StyleCatalog::builtin(),
            run_dir,
            finished: Notify::new(),
        });

        let workers = (0..worker_count)
            .map(|worker| {
                let shared = shared.clone();
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    debug!("Worker {} started", worker);
                    loop {
                        let next = receiver.lock().await.recv().await;
                        match next {
                            Some(id) => shared.run_job(id).await,
                            None => break,
                        }
                    }
                    debug!("Worker {} stopped", worker);
                })
            })
            .collect();

        info!("Job pipeline started with {} workers", worker_count);
        Ok(Self {
            shared,
            queue: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Submit a video for rendering with a style
    ///
    /// A live job for the same (source, style) is returned instead of a new
    /// one. An unknown style fails the new job immediately.
    pub async fn submit(&self, source: impl Into<PathBuf>, style_id: &str) -> SubforgeResult<JobId> {
        let source = source.into();
        let sender = lock(&self.queue).clone().ok_or(SubforgeError::PipelineClosed)?;

        let (id, status, enqueue) = {
            let mut jobs = self.shared.write_jobs();
            if let Some(existing) = jobs
                .values()
                .find(|entry| !entry.record.state().is_terminal() && entry.record.matches(&source, style_id))
            {
                let id = existing.record.id();
                debug!("Deduplicated submission of {} ({}) to job {}", source.display(), style_id, id);
                return Ok(id);
            }

            let id = JobId::new();
            let mut record = JobRecord::new(id, source.clone(), style_id);
            let enqueue = match self.shared.catalog.get(style_id) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Job {} rejected: {}", id, e);
                    record.fail(&e)?;
                    false
                }
            };
            let status = record.status();
            jobs.insert(
                id,
                JobEntry {
                    record,
                    cancel: CancelToken::new(),
                },
            );
            (id, status, enqueue)
        };

        info!("Submitted job {} for {} with style '{}'", id, source.display(), style_id);
        self.shared.notify_state(&status);

        if enqueue && sender.send(id).await.is_err() {
            self.shared.finish(id, Err(SubforgeError::PipelineClosed));
            return Err(SubforgeError::PipelineClosed);
        }
        Ok(id)
    }

    /// Current status of a job
    pub fn status(&self, id: JobId) -> SubforgeResult<JobStatus> {
        self.shared
            .read_jobs()
            .get(&id)
            .map(|entry| entry.record.status())
            .ok_or_else(|| SubforgeError::JobNotFound { id: id.to_string() })
    }

    /// Every known job, oldest first
    pub fn jobs(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = self
            .shared
            .read_jobs()
            .values()
            .map(|entry| entry.record.status())
            .collect();
        all.sort_by_key(|status| status.created_at);
        all
    }

    /// Available presets
    pub fn list_styles(&self) -> Vec<StyleSummary> {
        self.shared.catalog.list()
    }

    /// Cancel a job
    ///
    /// A queued job fails at once. A running job is signalled and fails at its
    /// next checkpoint. Terminal jobs are left as they are.
    pub fn cancel(&self, id: JobId) -> SubforgeResult<JobStatus> {
        let (status, changed) = {
            let mut jobs = self.shared.write_jobs();
            let entry = jobs
                .get_mut(&id)
                .ok_or_else(|| SubforgeError::JobNotFound { id: id.to_string() })?;

            match entry.record.state() {
                JobState::Completed | JobState::Failed => (entry.record.status(), false),
                JobState::Queued => {
                    entry.cancel.cancel();
                    entry.record.fail(&SubforgeError::CancellationRequested)?;
                    (entry.record.status(), true)
                }
                _ => {
                    entry.cancel.cancel();
                    (entry.record.status(), false)
                }
            }
        };

        info!("Cancellation requested for job {} ({})", id, status.state);
        if changed {
            self.shared.notify_state(&status);
            self.shared.finished.notify_waiters();
        }
        Ok(status)
    }

    /// Wait until a job reaches a terminal state
    pub async fn wait(&self, id: JobId) -> SubforgeResult<JobStatus> {
        loop {
            let finished = self.shared.finished.notified();
            let status = self.status(id)?;
            if status.state.is_terminal() {
                return Ok(status);
            }
            finished.await;
        }
    }

    /// Stop accepting work, cancel live jobs and wait for the workers
    pub async fn shutdown(&self) {
        lock(&self.queue).take();

        let live: Vec<JobId> = self
            .jobs()
            .into_iter()
            .filter(|status| !status.state.is_terminal())
            .map(|status| status.id)
            .collect();
        for id in live {
            if let Err(e) = self.cancel(id) {
                warn!("Could not cancel job {} during shutdown: {}", id, e);
            }
        }

        let workers: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }
        info!("Job pipeline stopped");
    }
}

impl Shared {
    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobEntry>> {
        self.jobs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobEntry>> {
        self.jobs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify_state(&self, status: &JobStatus) {
        for observer in &self.ports.observers {
            observer.on_state(status);
        }
    }

    fn notify_progress(&self, status: &JobStatus) {
        for observer in &self.ports.observers {
            observer.on_progress(status);
        }
    }

    /// Apply a forward transition and notify observers
    fn advance(&self, id: JobId, next: JobState, message: &str) -> SubforgeResult<()> {
        let status = {
            let mut jobs = self.write_jobs();
            let entry = jobs
                .get_mut(&id)
                .ok_or_else(|| SubforgeError::JobNotFound { id: id.to_string() })?;
            entry
                .record
                .transition(next, progress::band(next).start, message)?;
            entry.record.status()
        };

        debug!("Job {} -> {} ({}%)", id, status.state, status.progress);
        self.notify_state(&status);
        Ok(())
    }

    /// Raise progress inside the band of `state`
    fn report_progress(&self, id: JobId, state: JobState, fraction: f64) {
        let status = {
            let mut jobs = self.write_jobs();
            let Some(entry) = jobs.get_mut(&id) else {
                return;
            };
            if entry.record.state() != state
                || !entry.record.advance_progress(progress::band(state).at(fraction))
            {
                return;
            }
            entry.record.status()
        };
        self.notify_progress(&status);
    }

    /// Record the terminal outcome of a job
    fn finish(&self, id: JobId, outcome: SubforgeResult<PathBuf>) {
        let status = {
            let mut jobs = self.write_jobs();
            let Some(entry) = jobs.get_mut(&id) else {
                return;
            };
            if entry.record.state().is_terminal() {
                return;
            }

            // A cancelled job fails as cancelled whatever its last stage returned
            let outcome = match outcome {
                Err(e) if entry.cancel.is_cancelled() && !e.is_cancellation() => {
                    debug!("Job {} stopped after cancellation: {}", id, e);
                    Err(SubforgeError::CancellationRequested)
                }
                Ok(_) if entry.cancel.is_cancelled() => Err(SubforgeError::CancellationRequested),
                other => other,
            };
            let recorded = match &outcome {
                Ok(output) => entry.record.complete(output.clone()),
                Err(e) => entry.record.fail(e),
            };
            if let Err(e) = recorded {
                error!("Job {} could not be finalized: {}", id, e);
                return;
            }
            entry.record.status()
        };

        match (&status.output, &status.error) {
            (Some(output), _) => info!("Job {} completed: {}", id, output.display()),
            (_, Some(e)) if e.kind == ErrorKind::CancellationRequested => {
                info!("Job {} cancelled", id)
            }
            (_, Some(e)) => warn!("Job {} failed ({}): {}", id, e.kind, e.message),
            _ => {}
        }
        self.notify_state(&status);
        self.finished.notify_waiters();
    }

    fn job_context(&self, id: JobId) -> Option<(PathBuf, String, CancelToken)> {
        let jobs = self.read_jobs();
        let entry = jobs.get(&id)?;
        if entry.record.state() != JobState::Queued {
            return None;
        }
        Some((
            entry.record.source().clone(),
            entry.record.style_id().to_string(),
            entry.cancel.clone(),
        ))
    }

    fn stage_context(self: &Arc<Self>, id: JobId, state: JobState, cancel: &CancelToken) -> StageContext {
        StageContext::new(
            cancel.clone(),
            Arc::new(StageProgress {
                shared: self.clone(),
                id,
                state,
            }),
        )
    }

    async fn run_job(self: &Arc<Self>, id: JobId) {
        // Cancelled while queued, or already finished
        let Some((source, style_id, cancel)) = self.job_context(id) else {
            debug!("Skipping job {}: no longer queued", id);
            return;
        };

        let outcome = match JobWorkspace::create(self.run_dir.path(), id) {
            Ok(workspace) => {
                let outcome = self.execute(id, &source, &style_id, &cancel, &workspace).await;
                // Scratch space goes away before the terminal state is published
                drop(workspace);
                outcome
            }
            Err(e) => Err(e),
        };

        if let Err(SubforgeError::CueIntegrity { message }) = &outcome {
            error!("Job {} hit a cue integrity defect: {}", id, message);
        }
        self.finish(id, outcome);
    }

    async fn execute(
        self: &Arc<Self>,
        id: JobId,
        source: &Path,
        style_id: &str,
        cancel: &CancelToken,
        workspace: &JobWorkspace,
    ) -> SubforgeResult<PathBuf> {
        let style = self.catalog.get(style_id)?;

        // queued -> transcribing
        self.advance(id, JobState::Transcribing, "Acquiring source")?;
        let ctx = self.stage_context(id, JobState::Transcribing, cancel);
        let dimensions = self.ports.probe.probe(source).await?;
        let geometry = classify_with(dimensions.width, dimensions.height, &self.stages.layout)?;
        ctx.checkpoint()?;

        let words = self.ports.transcriber.transcribe(source, &ctx).await?;
        ctx.checkpoint()?;
        info!("Job {}: {} words transcribed", id, words.len());

        // transcribing -> rendering
        self.advance(id, JobState::Rendering, "Rendering subtitles")?;
        let ctx = self.stage_context(id, JobState::Rendering, cancel);
        let script_path = workspace.script_path();
        self.render(words, style, geometry, script_path.clone()).await?;
        ctx.report(1.0);
        ctx.checkpoint()?;

        // rendering -> encoding
        self.advance(id, JobState::Encoding, "Encoding video")?;
        let ctx = self.stage_context(id, JobState::Encoding, cancel);
        let request = EncodeRequest {
            source: source.to_path_buf(),
            script: script_path,
            output: output_path(self.settings.output_dir.as_deref(), source, style_id),
            duration_ms: dimensions.duration_ms,
        };
        let output = self.ports.encoder.encode(&request, &ctx).await?;
        ctx.checkpoint()?;

        let size = verify_output(&output)?;
        debug!("Job {} wrote {}", id, format_file_size(size));
        Ok(output)
    }

    /// Cue building, rendering and the script write, off the async workers
    async fn render(
        self: &Arc<Self>,
        words: Vec<Word>,
        style: &'static StylePreset,
        geometry: VideoGeometry,
        script_path: PathBuf,
    ) -> SubforgeResult<()> {
        let stages = self.stages.clone();
        tokio::task::spawn_blocking(move || {
            let cues = CueBuilder::new(stages.cues).build(&words, style, &geometry)?;
            let script = TimelineRenderer::new(stages.render).render(&cues, style, &geometry)?;
            write_script(&script_path, &script)
        })
        .await
        .map_err(|e| SubforgeError::render(format!("render task failed: {}", e)))?
    }
}

/// Encoder output must exist and hold data
fn verify_output(output: &Path) -> SubforgeResult<u64> {
    let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(SubforgeError::collaborator(
            "encode",
            format!("encoder reported {} but it is missing or empty", output.display()),
        ));
    }
    Ok(size)
}

/// Progress sink that writes into the job's current band
struct StageProgress {
    shared: Arc<Shared>,
    id: JobId,
    state: JobState,
}

impl ProgressSink for StageProgress {
    fn report(&self, fraction: f64) {
        self.shared.report_progress(self.id, self.state, fraction);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
