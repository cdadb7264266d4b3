//! FFprobe adapter for source dimensions
//!
//! Runs the `ffprobe` binary and reads the first video stream's size and the
//! container duration from its JSON output.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::domain::model::VideoDimensions;
use crate::error::{SubforgeError, SubforgeResult};
use crate::ports::ProbePort;
use crate::utils::path::validate_source;
use crate::utils::time::parse_timestamp_ms;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<i64>,
    height: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl FfprobeAdapter {
    /// Create new FFprobe adapter using `binary` (e.g. `ffprobe`)
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, source: &Path) -> SubforgeResult<VideoDimensions> {
        validate_source(source)?;

        let output = Command::new(&self.binary)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height:format=duration"])
            .args(["-of", "json"])
            .arg(source)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SubforgeError::collaborator(
                    "probe",
                    format!("could not run {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubforgeError::SourceUnavailable {
                message: format!("{}: {}", source.display(), stderr.trim()),
            });
        }

        let dimensions = parse_probe_json(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "Probed {}: {}x{}, {:?} ms",
            source.display(),
            dimensions.width,
            dimensions.height,
            dimensions.duration_ms
        );
        Ok(dimensions)
    }
}

/// Extract dimensions from `ffprobe -of json` output
pub fn parse_probe_json(json: &str) -> SubforgeResult<VideoDimensions> {
    let parsed: ProbeOutput = serde_json::from_str(json).map_err(|e| {
        SubforgeError::collaborator("probe", format!("unreadable ffprobe output: {}", e))
    })?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.width.is_some() && s.height.is_some())
        .ok_or_else(|| SubforgeError::SourceUnavailable {
            message: "no video stream found".to_string(),
        })?;

    Ok(VideoDimensions {
        width: stream.width.unwrap_or_default(),
        height: stream.height.unwrap_or_default(),
        duration_ms: parsed
            .format
            .and_then(|f| f.duration)
            .and_then(|d| parse_timestamp_ms(&d)),
    })
}
