// TOML config adapter - Settings loaded from and saved to TOML files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapters::exec_ffmpeg::EncoderSettings;
use crate::cues::CueSettings;
use crate::error::{SubforgeError, SubforgeResult};
use crate::layout::LayoutSettings;
use crate::pipeline::{PipelineSettings, StageSettings};
use crate::render::RenderSettings;
use crate::utils::logging::LoggingSettings;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "subforge.toml";

/// External tool locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ffprobe: PathBuf,
    /// ASR program and arguments; `{input}` and `{output}` are substituted
    pub transcriber: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            transcriber: Vec::new(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub pipeline: PipelineSettings,
    pub layout: LayoutSettings,
    pub cues: CueSettings,
    pub render: RenderSettings,
    pub encoder: EncoderSettings,
    pub tools: ToolSettings,
}

impl Settings {
    /// Settings for the pure stages of a job
    pub fn stages(&self) -> StageSettings {
        StageSettings {
            layout: self.layout.clone(),
            cues: self.cues.clone(),
            render: self.render.clone(),
        }
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> SubforgeResult<()> {
        let invalid = |message: &str| {
            Err(SubforgeError::Config {
                message: message.to_string(),
            })
        };

        if self.pipeline.max_workers == 0 {
            return invalid("pipeline.max_workers must be at least 1");
        }
        if self.pipeline.queue_capacity == 0 {
            return invalid("pipeline.queue_capacity must be at least 1");
        }
        if !(0.0..0.5).contains(&self.layout.safe_area_ratio) {
            return invalid("layout.safe_area_ratio must be in [0, 0.5)");
        }
        if self.cues.max_chars == Some(0) {
            return invalid("cues.max_chars must be at least 1");
        }
        if self.encoder.crf > 51 {
            return invalid("encoder.crf cannot exceed 51");
        }
        Ok(())
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse settings from TOML text
    pub fn parse(content: &str) -> SubforgeResult<Settings> {
        let settings: Settings = toml::from_str(content).map_err(|e| SubforgeError::Config {
            message: format!("failed to parse TOML config: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> SubforgeResult<Settings> {
        let content = std::fs::read_to_string(path).map_err(|e| SubforgeError::Config {
            message: format!("failed to read config file {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// Serialize settings as TOML
    pub fn to_toml(settings: &Settings) -> SubforgeResult<String> {
        toml::to_string_pretty(settings).map_err(|e| SubforgeError::Config {
            message: format!("failed to serialize config: {}", e),
        })
    }

    /// Write settings to a file, creating parent directories
    pub fn save(settings: &Settings, path: &Path) -> SubforgeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::to_toml(settings)?)?;
        Ok(())
    }

    /// Candidate config files, most specific first
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        if let Some(dir) = config_home {
            paths.push(dir.join("subforge").join("config.toml"));
        }
        paths
    }
}
