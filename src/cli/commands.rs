//! Command implementations

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::transcript_file::parse_words;
use crate::adapters::{
    CommandTranscriber, FfmpegEncoder, FfprobeAdapter, Settings, TomlConfigAdapter,
    TracingObserver, TranscriptFileAdapter,
};
use crate::cli::args::{ClassifyArgs, ConfigArgs, RenderArgs, RunArgs, StylesArgs};
use crate::cues::CueBuilder;
use crate::layout::classify_with;
use crate::pipeline::job::{JobState, JobStatus};
use crate::pipeline::{JobPipeline, PipelinePorts};
use crate::ports::{JobObserver, TranscribePort};
use crate::render::{write_script, ScriptFormat, TimelineRenderer};
use crate::style::StyleCatalog;

/// Execute the styles command
pub fn styles(args: StylesArgs) -> Result<()> {
    let styles = StyleCatalog::builtin().list();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&styles)?);
        return Ok(());
    }

    for style in styles {
        println!("{:<22} {:<22} {}", style.id, style.name, style.description);
    }
    Ok(())
}

/// Execute the classify command
pub fn classify(args: ClassifyArgs, settings: &Settings) -> Result<()> {
    let geometry = classify_with(args.width, args.height, &settings.layout)?;
    println!("{}", serde_json::to_string_pretty(&geometry)?);
    Ok(())
}

/// Execute the render command
pub fn render(args: RenderArgs, settings: &Settings) -> Result<()> {
    let mut style = StyleCatalog::builtin().get(&args.style)?.clone();
    if let Some(color) = args.highlight_color {
        style.highlight_color = color;
    }
    let geometry = classify_with(args.width, args.height, &settings.layout)?;

    let json = std::fs::read_to_string(&args.words)
        .with_context(|| format!("Failed to read word file {}", args.words.display()))?;
    let words = parse_words(&json)?;

    let cues = CueBuilder::new(settings.cues.clone()).build(&words, &style, &geometry)?;
    let format = ScriptFormat::from(args.format);
    let script =
        TimelineRenderer::new(settings.render.clone()).render_as(format, &cues, &style, &geometry)?;
    write_script(&args.output, &script)?;

    info!(
        "Wrote {} cues from {} words to {}",
        cues.len(),
        words.len(),
        args.output.display()
    );
    println!("{}", args.output.display());
    Ok(())
}

/// Execute the config command
pub fn config(args: ConfigArgs, settings: &Settings) -> Result<()> {
    match args.write {
        Some(path) => {
            TomlConfigAdapter::save(settings, &path)?;
            println!("{}", path.display());
        }
        None => print!("{}", TomlConfigAdapter::to_toml(settings)?),
    }
    Ok(())
}

/// Prints job changes for an interactive run
struct ConsoleProgress;

impl ConsoleProgress {
    fn print(status: &JobStatus) {
        eprintln!("[{:>3}%] {:<12} {}", status.progress, status.state, status.message);
    }
}

impl JobObserver for ConsoleProgress {
    fn on_state(&self, status: &JobStatus) {
        Self::print(status);
    }

    fn on_progress(&self, status: &JobStatus) {
        Self::print(status);
    }
}

fn transcriber_for(args: &RunArgs, settings: &Settings) -> Result<Arc<dyn TranscribePort>> {
    if let Some(path) = &args.transcript {
        return Ok(Arc::new(TranscriptFileAdapter::new(path)));
    }
    if !settings.tools.transcriber.is_empty() {
        return Ok(Arc::new(CommandTranscriber::new(&settings.tools.transcriber)?));
    }
    Ok(Arc::new(TranscriptFileAdapter::sidecar()))
}

/// Execute the run command
///
/// Ctrl-C cancels the job; the command still waits for it to settle.
pub async fn run(args: RunArgs, settings: &Settings) -> Result<()> {
    let observers: Vec<Arc<dyn JobObserver>> =
        vec![Arc::new(TracingObserver::new()), Arc::new(ConsoleProgress)];
    let ports = PipelinePorts {
        probe: Arc::new(FfprobeAdapter::new(settings.tools.ffprobe.clone())),
        transcriber: transcriber_for(&args, settings)?,
        encoder: Arc::new(FfmpegEncoder::new(settings.encoder.clone())),
        observers,
    };

    let pipeline = JobPipeline::start(settings.pipeline.clone(), settings.stages(), ports)?;
    let id = pipeline.submit(args.input.clone(), &args.style).await?;

    let status = tokio::select! {
        status = pipeline.wait(id) => status?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            warn!("Interrupted, cancelling job {}", id);
            pipeline.cancel(id)?;
            pipeline.wait(id).await?
        }
    };
    pipeline.shutdown().await;

    match (status.state, &status.output, &status.error) {
        (JobState::Completed, Some(output), _) => {
            println!("{}", output.display());
            Ok(())
        }
        (_, _, Some(error)) => bail!("Job {} failed ({}): {}", id, error.kind, error.message),
        _ => bail!("Job {} ended in state {}", id, status.state),
    }
}
