use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use subforge_cli::pipeline::{PipelinePorts, PipelineSettings, StageSettings};
use subforge_cli::ports::{EncodePort, EncodeRequest, JobObserver, ProbePort, StageContext, TranscribePort};
use subforge_cli::*;

/// Fake collaborators for driving the pipeline without ffmpeg
mod fakes {
    use super::*;

    pub fn words() -> Vec<Word> {
        vec![
            Word::new("Hello", 0, 400).unwrap(),
            Word::new("world", 450, 900).unwrap(),
            Word::new("this", 2500, 2800).unwrap(),
            Word::new("is", 2850, 3000).unwrap(),
            Word::new("subforge", 3050, 3600).unwrap(),
        ]
    }

    /// Reports a vertical canvas; sources named `missing*` are unavailable
    pub struct Probe;

    #[async_trait]
    impl ProbePort for Probe {
        async fn probe(&self, source: &Path) -> SubforgeResult<VideoDimensions> {
            let name = source.file_name().unwrap().to_string_lossy();
            if name.starts_with("missing") {
                return Err(SubforgeError::SourceUnavailable {
                    message: format!("{} does not exist", source.display()),
                });
            }
            Ok(VideoDimensions {
                width: 1080,
                height: 1920,
                duration_ms: Some(4000),
            })
        }
    }

    /// Returns fixed words, optionally held until a gate permit is available
    pub struct Transcriber {
        pub words: Vec<Word>,
        pub gate: Option<Arc<Semaphore>>,
        pub running: AtomicUsize,
        pub peak: AtomicUsize,
    }

    impl Transcriber {
        pub fn new(words: Vec<Word>) -> Self {
            Self {
                words,
                gate: None,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        pub fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(words())
            }
        }
    }

    #[async_trait]
    impl TranscribePort for Transcriber {
        async fn transcribe(&self, _source: &Path, ctx: &StageContext) -> SubforgeResult<Vec<Word>> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let outcome = match &self.gate {
                Some(gate) => tokio::select! {
                    permit = gate.acquire() => {
                        permit.unwrap().forget();
                        Ok(())
                    }
                    _ = ctx.cancel_token().cancelled() => Err(SubforgeError::CancellationRequested),
                },
                None => Ok(()),
            };
            self.running.fetch_sub(1, Ordering::SeqCst);
            outcome?;

            ctx.report(0.5);
            ctx.report(1.0);
            Ok(self.words.clone())
        }
    }

    /// Copies the script into the output, or fails with a fixed message
    #[derive(Default)]
    pub struct Encoder {
        pub failure: Option<String>,
        pub gate: Option<Arc<Semaphore>>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl EncodePort for Encoder {
        async fn encode(&self, request: &EncodeRequest, ctx: &StageContext) -> SubforgeResult<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if let Some(message) = &self.failure {
                return Err(SubforgeError::collaborator("encode", message.clone()));
            }
            ctx.report(0.5);
            let script = std::fs::read_to_string(&request.script)?;
            std::fs::create_dir_all(request.output.parent().unwrap())?;
            std::fs::write(&request.output, script)?;
            ctx.report(1.0);
            Ok(request.output.clone())
        }
    }

    /// Waits for cancellation, then reports its own failure like a killed tool
    pub struct KilledTranscriber;

    #[async_trait]
    impl TranscribePort for KilledTranscriber {
        async fn transcribe(&self, _source: &Path, ctx: &StageContext) -> SubforgeResult<Vec<Word>> {
            ctx.cancel_token().cancelled().await;
            Err(SubforgeError::collaborator("transcribe", "asr exited with signal 9"))
        }
    }

    /// Records every notification in order
    #[derive(Default)]
    pub struct Recorder {
        pub events: Mutex<Vec<(JobState, u8)>>,
    }

    impl JobObserver for Recorder {
        fn on_state(&self, status: &JobStatus) {
            self.events.lock().unwrap().push((status.state, status.progress));
        }

        fn on_progress(&self, status: &JobStatus) {
            self.events.lock().unwrap().push((status.state, status.progress));
        }
    }

    /// Cancels a job as soon as it enters the rendering state
    #[derive(Default)]
    pub struct CancelOnRender {
        pub pipeline: OnceLock<Weak<JobPipeline>>,
    }

    impl JobObserver for CancelOnRender {
        fn on_state(&self, status: &JobStatus) {
            if status.state != JobState::Rendering {
                return;
            }
            if let Some(pipeline) = self.pipeline.get().and_then(Weak::upgrade) {
                pipeline.cancel(status.id).unwrap();
            }
        }
    }
}

use fakes::*;

struct Harness {
    root: TempDir,
    transcriber: Arc<dyn TranscribePort>,
    encoder: Arc<Encoder>,
}

impl Harness {
    fn new(transcriber: Transcriber, encoder: Encoder) -> Self {
        Self::with_transcriber(Arc::new(transcriber), encoder)
    }

    fn with_transcriber(transcriber: Arc<dyn TranscribePort>, encoder: Encoder) -> Self {
        Self {
            root: TempDir::new().unwrap(),
            transcriber,
            encoder: Arc::new(encoder),
        }
    }

    fn settings(&self, max_workers: usize) -> PipelineSettings {
        PipelineSettings {
            max_workers,
            queue_capacity: 16,
            work_root: self.root.path().join("work"),
            output_dir: Some(self.root.path().join("out")),
        }
    }

    fn start(&self, max_workers: usize, observers: Vec<Arc<dyn JobObserver>>) -> JobPipeline {
        let ports = PipelinePorts {
            probe: Arc::new(Probe),
            transcriber: self.transcriber.clone(),
            encoder: self.encoder.clone(),
            observers,
        };
        JobPipeline::start(self.settings(max_workers), StageSettings::default(), ports).unwrap()
    }

    fn source(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Job directories still present in any run directory
    fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.root.path().join("work"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|run| run.file_type().unwrap().is_dir())
            .flat_map(|run| std::fs::read_dir(run.path()).unwrap().filter_map(Result::ok))
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("job-"))
            .count()
    }
}

async fn wait_for_state(pipeline: &JobPipeline, id: JobId, state: JobState) {
    for _ in 0..500 {
        if pipeline.status(id).unwrap().state == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached {}", id, state);
}

#[tokio::test]
async fn test_job_completes_with_output() {
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let pipeline = harness.start(2, Vec::new());

    let id = pipeline.submit(harness.source("talk.mp4"), "gaming").await.unwrap();
    let status = pipeline.wait(id).await.unwrap();

    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.progress, 100);
    assert!(status.error.is_none());

    let output = status.output.unwrap();
    assert_eq!(output, harness.root.path().join("out").join("talk_gaming_with_subtitles.mp4"));
    let burned = std::fs::read_to_string(&output).unwrap();
    assert!(burned.starts_with("[Script Info]"));
    assert!(burned.contains("Style: gaming,"));

    assert_eq!(harness.leftover_workspaces(), 0);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_unknown_style_fails_at_submit() {
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let id = pipeline.submit(harness.source("talk.mp4"), "comic_sans").await.unwrap();
    let status = pipeline.status(id).unwrap();

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.progress, 0);
    assert_eq!(status.error.unwrap().kind, ErrorKind::UnknownStyle);
    assert_eq!(harness.encoder.calls.load(Ordering::SeqCst), 0);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_progress_is_monotonic_through_every_state() {
    let recorder = Arc::new(Recorder::default());
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let pipeline = harness.start(1, vec![recorder.clone() as Arc<dyn JobObserver>]);

    let id = pipeline.submit(harness.source("talk.mp4"), "tiktok_viral").await.unwrap();
    pipeline.wait(id).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    let progress: Vec<u8> = events.iter().map(|(_, p)| *p).collect();
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", progress);

    let mut states: Vec<JobState> = events.iter().map(|(s, _)| *s).collect();
    states.dedup();
    assert_eq!(
        states,
        vec![
            JobState::Queued,
            JobState::Transcribing,
            JobState::Rendering,
            JobState::Encoding,
            JobState::Completed,
        ]
    );

    for (state, progress) in &events {
        let (low, high) = match state {
            JobState::Queued => (0, 0),
            JobState::Transcribing => (0, 40),
            JobState::Rendering => (40, 45),
            JobState::Encoding => (45, 95),
            JobState::Completed => (100, 100),
            JobState::Failed => unreachable!(),
        };
        assert!((low..=high).contains(progress), "{} at {}%", state, progress);
    }
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_cancel_during_rendering_never_encodes() {
    let canceller = Arc::new(CancelOnRender::default());
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let pipeline = Arc::new(harness.start(1, vec![canceller.clone() as Arc<dyn JobObserver>]));
    canceller.pipeline.set(Arc::downgrade(&pipeline)).unwrap();

    let source = harness.source("talk.mp4");
    let id = pipeline.submit(source.clone(), "minimalist").await.unwrap();
    let status = pipeline.wait(id).await.unwrap();

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.unwrap().kind, ErrorKind::CancellationRequested);
    assert!(status.output.is_none());
    assert_eq!(harness.encoder.calls.load(Ordering::SeqCst), 0);
    assert!(!harness
        .root
        .path()
        .join("out")
        .join("talk_minimalist_with_subtitles.mp4")
        .exists());
    assert_eq!(harness.leftover_workspaces(), 0);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_cancel_while_queued_fails_immediately() {
    let gate = Arc::new(Semaphore::new(0));
    let harness = Harness::new(Transcriber::gated(gate.clone()), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let first = pipeline.submit(harness.source("a.mp4"), "gaming").await.unwrap();
    let second = pipeline.submit(harness.source("b.mp4"), "gaming").await.unwrap();
    wait_for_state(&pipeline, first, JobState::Transcribing).await;

    let cancelled = pipeline.cancel(second).unwrap();
    assert_eq!(cancelled.state, JobState::Failed);
    assert_eq!(cancelled.progress, 0);
    assert_eq!(cancelled.error.unwrap().kind, ErrorKind::CancellationRequested);

    gate.add_permits(1);
    assert_eq!(pipeline.wait(first).await.unwrap().state, JobState::Completed);
    assert_eq!(pipeline.wait(second).await.unwrap().state, JobState::Failed);
    assert_eq!(harness.encoder.calls.load(Ordering::SeqCst), 1);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_cancel_running_job_at_checkpoint() {
    let gate = Arc::new(Semaphore::new(0));
    let harness = Harness::new(Transcriber::gated(gate), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let id = pipeline.submit(harness.source("a.mp4"), "gaming").await.unwrap();
    wait_for_state(&pipeline, id, JobState::Transcribing).await;
    pipeline.cancel(id).unwrap();

    let status = pipeline.wait(id).await.unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.unwrap().kind, ErrorKind::CancellationRequested);
    assert!(status.progress < 40);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_submission_returns_live_job() {
    let gate = Arc::new(Semaphore::new(0));
    let harness = Harness::new(Transcriber::gated(gate.clone()), Encoder::default());
    let pipeline = harness.start(2, Vec::new());

    let source = harness.source("talk.mp4");
    let first = pipeline.submit(source.clone(), "gaming").await.unwrap();
    let again = pipeline.submit(source.clone(), "gaming").await.unwrap();
    let other_style = pipeline.submit(source.clone(), "minimalist").await.unwrap();

    assert_eq!(first, again);
    assert_ne!(first, other_style);
    assert_eq!(pipeline.jobs().len(), 2);

    gate.add_permits(2);
    pipeline.wait(first).await.unwrap();
    pipeline.wait(other_style).await.unwrap();

    // Finished jobs no longer absorb resubmissions
    gate.add_permits(1);
    let fresh = pipeline.submit(source, "gaming").await.unwrap();
    assert_ne!(fresh, first);
    assert_eq!(pipeline.wait(fresh).await.unwrap().state, JobState::Completed);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
    let gate = Arc::new(Semaphore::new(0));
    let transcriber = Arc::new(Transcriber::gated(gate.clone()));
    let harness = Harness::with_transcriber(transcriber.clone(), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let first = pipeline.submit(harness.source("a.mp4"), "gaming").await.unwrap();
    let second = pipeline.submit(harness.source("b.mp4"), "gaming").await.unwrap();
    wait_for_state(&pipeline, first, JobState::Transcribing).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pipeline.status(second).unwrap().state, JobState::Queued);

    gate.add_permits(2);
    assert_eq!(pipeline.wait(first).await.unwrap().state, JobState::Completed);
    assert_eq!(pipeline.wait(second).await.unwrap().state, JobState::Completed);
    assert_eq!(transcriber.peak.load(Ordering::SeqCst), 1);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_collaborator_failure_recorded_verbatim() {
    let encoder = Encoder {
        failure: Some("disk full".to_string()),
        ..Encoder::default()
    };
    let harness = Harness::new(Transcriber::new(words()), encoder);
    let pipeline = harness.start(1, Vec::new());

    let id = pipeline.submit(harness.source("talk.mp4"), "gaming").await.unwrap();
    let status = pipeline.wait(id).await.unwrap();

    assert_eq!(status.state, JobState::Failed);
    assert!(status.progress >= 45 && status.progress < 100);
    assert!(status.output.is_none());
    let error = status.error.unwrap();
    assert_eq!(error.kind, ErrorKind::CollaboratorFailure);
    assert!(error.message.contains("disk full"));
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_missing_source_fails_job() {
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let id = pipeline.submit(harness.source("missing.mp4"), "gaming").await.unwrap();
    let status = pipeline.wait(id).await.unwrap();

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.unwrap().kind, ErrorKind::SourceUnavailable);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_empty_transcript_fails_job() {
    let harness = Harness::new(Transcriber::new(Vec::new()), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let id = pipeline.submit(harness.source("silent.mp4"), "gaming").await.unwrap();
    let status = pipeline.wait(id).await.unwrap();

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.unwrap().kind, ErrorKind::EmptyTranscript);
    assert_eq!(harness.encoder.calls.load(Ordering::SeqCst), 0);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_stale_workspaces_purged_on_start() {
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let work = harness.root.path().join("work");
    let crashed = work.join("run-4294967294-crashed");
    std::fs::create_dir_all(crashed.join("job-abc")).unwrap();
    std::fs::write(crashed.join("owner.pid"), "4294967294").unwrap();
    std::fs::create_dir_all(work.join("keep-me")).unwrap();

    let pipeline = harness.start(1, Vec::new());
    if cfg!(target_os = "linux") {
        assert!(!crashed.exists());
        assert_eq!(harness.leftover_workspaces(), 0);
    }
    assert!(work.join("keep-me").exists());
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_pipelines_sharing_a_work_root_keep_their_workspaces() {
    let gate = Arc::new(Semaphore::new(0));
    let encoder = Encoder {
        gate: Some(gate.clone()),
        ..Encoder::default()
    };
    let harness = Harness::new(Transcriber::new(words()), encoder);
    let first = harness.start(1, Vec::new());

    let id = first.submit(harness.source("talk.mp4"), "gaming").await.unwrap();
    wait_for_state(&first, id, JobState::Encoding).await;
    assert_eq!(harness.leftover_workspaces(), 1);

    // A second pipeline on the same root must not touch the live job
    let second = harness.start(1, Vec::new());
    assert_eq!(harness.leftover_workspaces(), 1);

    gate.add_permits(1);
    let status = first.wait(id).await.unwrap();
    assert_eq!(status.state, JobState::Completed, "{:?}", status.error);

    second.shutdown().await;
    first.shutdown().await;
}

#[tokio::test]
async fn test_collaborator_error_after_cancel_counts_as_cancelled() {
    let harness = Harness::with_transcriber(Arc::new(KilledTranscriber), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let id = pipeline.submit(harness.source("talk.mp4"), "gaming").await.unwrap();
    wait_for_state(&pipeline, id, JobState::Transcribing).await;
    pipeline.cancel(id).unwrap();

    let status = pipeline.wait(id).await.unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.unwrap().kind, ErrorKind::CancellationRequested);
    assert!(status.output.is_none());
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_unknown_job_and_closed_pipeline() {
    let harness = Harness::new(Transcriber::new(words()), Encoder::default());
    let pipeline = harness.start(1, Vec::new());

    let err = pipeline.status(JobId::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::JobNotFound);
    assert_eq!(pipeline.list_styles().len(), 5);

    pipeline.shutdown().await;
    let err = pipeline.submit(harness.source("late.mp4"), "gaming").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PipelineClosed);
}
