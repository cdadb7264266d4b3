//! FFmpeg execution adapter
//!
//! Burns an ASS script into the source video with the `ass` filter. Progress
//! comes from `-progress pipe:1`; the output is written under a temporary
//! name and only renamed into place once ffmpeg succeeds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{SubforgeError, SubforgeResult};
use crate::ports::{EncodePort, EncodeRequest, StageContext};
use crate::utils::time::parse_timestamp_ms;

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub ffmpeg: PathBuf,
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 20,
        }
    }
}

/// FFmpeg-based encoder
pub struct FfmpegEncoder {
    settings: EncoderSettings,
}

impl FfmpegEncoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Full argument list for one encode
    pub fn build_args(&self, request: &EncodeRequest, partial: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            request.source.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("ass={}", escape_filter_path(&request.script)),
            "-c:v".to_string(),
            self.settings.video_codec.clone(),
            "-preset".to_string(),
            self.settings.preset.clone(),
            "-crf".to_string(),
            self.settings.crf.to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            partial.to_string_lossy().to_string(),
        ]
    }
}

/// Temporary name the encode is written to
fn partial_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output.mp4".to_string());
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "mp4".to_string());
    output.with_file_name(format!(".{}.partial.{}", name, extension))
}

/// Escape a path for use inside an ffmpeg filter argument
pub fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | '[' | ']' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Encoded position from one `-progress` line, in milliseconds
///
/// ffmpeg's `out_time_ms` is actually microseconds.
pub fn parse_progress_line(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value.trim().parse::<u64>().ok().map(|us| us / 1000),
        "out_time" => parse_timestamp_ms(value),
        _ => None,
    }
}

#[async_trait]
impl EncodePort for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest, ctx: &StageContext) -> SubforgeResult<PathBuf> {
        if let Some(parent) = request.output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let partial = partial_path(&request.output);
        let args = self.build_args(request, &partial);
        debug!("Running {} {:?}", self.settings.ffmpeg.display(), args);

        let mut child = Command::new(&self.settings.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SubforgeError::collaborator(
                    "encode",
                    format!("could not run {}: {}", self.settings.ffmpeg.display(), e),
                )
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SubforgeError::collaborator("encode", "ffmpeg stdout was not captured")
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            SubforgeError::collaborator("encode", "ffmpeg stderr was not captured")
        })?;
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text).await;
            text
        });

        let mut lines = BufReader::new(stdout).lines();
        let cancelled = loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let (Some(done_ms), Some(total_ms)) = (parse_progress_line(&line), request.duration_ms) {
                            if total_ms > 0 {
                                ctx.report(done_ms as f64 / total_ms as f64);
                            }
                        }
                    }
                    Ok(None) | Err(_) => break false,
                },
                _ = ctx.cancel_token().cancelled() => break true,
            }
        };

        if cancelled {
            warn!("Encoding of {} cancelled", request.source.display());
            let _ = child.kill().await;
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(SubforgeError::CancellationRequested);
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            let _ = tokio::fs::remove_file(&partial).await;
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(SubforgeError::collaborator(
                "encode",
                format!("ffmpeg exited with {}: {}", status, tail.join(" | ")),
            ));
        }

        tokio::fs::rename(&partial, &request.output).await?;
        ctx.report(1.0);
        info!("Encoded {}", request.output.display());
        Ok(request.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EncodeRequest {
        EncodeRequest {
            source: PathBuf::from("/v/in.mp4"),
            script: PathBuf::from("/tmp/job-1/subtitles.ass"),
            output: PathBuf::from("/out/in_gaming_with_subtitles.mp4"),
            duration_ms: Some(10_000),
        }
    }

    #[test]
    fn test_build_args() {
        let encoder = FfmpegEncoder::new(EncoderSettings::default());
        let args = encoder.build_args(&request(), Path::new("/out/.partial.mp4"));

        assert_eq!(args[0], "-y");
        assert!(args.contains(&"ass=/tmp/job-1/subtitles.ass".to_string()));
        assert!(args.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-progress", "pipe:1"]));
        assert_eq!(args.last().unwrap(), "/out/.partial.mp4");
    }

    #[test]
    fn test_filter_path_escaping() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\subs\\a.ass")),
            "C\\:\\\\subs\\\\a.ass"
        );
        assert_eq!(escape_filter_path(Path::new("/it's.ass")), "/it\\'s.ass");
    }

    #[test]
    fn test_parse_progress_lines() {
        assert_eq!(parse_progress_line("out_time_ms=1500000"), Some(1500));
        assert_eq!(parse_progress_line("out_time_us=2500000"), Some(2500));
        assert_eq!(parse_progress_line("out_time=00:00:03.250000"), Some(3250));
        assert_eq!(parse_progress_line("out_time=N/A"), None);
        assert_eq!(parse_progress_line("progress=continue"), None);
    }

    #[test]
    fn test_partial_path_is_hidden_sibling() {
        let partial = partial_path(Path::new("/out/talk.mp4"));
        assert_eq!(partial, PathBuf::from("/out/.talk.mp4.partial.mp4"));
    }
}
