//! External ASR command adapter
//!
//! Runs a configured speech-to-text program that writes a word file, then
//! reads it back with the transcript file parser. Arguments may use the
//! `{input}` and `{output}` placeholders.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::transcript_file::TranscriptFileAdapter;
use crate::domain::model::Word;
use crate::error::{SubforgeError, SubforgeResult};
use crate::ports::{StageContext, TranscribePort};

/// Transcriber that shells out to an ASR tool
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    /// `command` is the program followed by its arguments
    pub fn new(command: &[String]) -> SubforgeResult<Self> {
        let (program, args) = command.split_first().ok_or_else(|| SubforgeError::Config {
            message: "transcriber command is empty".to_string(),
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl TranscribePort for CommandTranscriber {
    async fn transcribe(&self, source: &Path, ctx: &StageContext) -> SubforgeResult<Vec<Word>> {
        let scratch = tempfile::tempdir()?;
        let words_path = scratch.path().join("words.json");
        let args = self.expand_args(source, &words_path);
        debug!("Running transcriber: {} {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output();

        // Dropping the output future kills the child on cancellation
        let output = tokio::select! {
            output = child => output.map_err(|e| {
                SubforgeError::collaborator("transcribe", format!("could not run {}: {}", self.program, e))
            })?,
            _ = ctx.cancel_token().cancelled() => {
                warn!("Transcription of {} cancelled", source.display());
                return Err(SubforgeError::CancellationRequested);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubforgeError::collaborator(
                "transcribe",
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }
        ctx.report(0.9);

        let words = TranscriptFileAdapter::load(&words_path).await?;
        ctx.report(1.0);
        info!("Transcribed {}: {} words", source.display(), words.len());
        Ok(words)
    }
}
