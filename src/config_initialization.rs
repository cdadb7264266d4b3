//! Configuration hierarchy: CLI > environment > file > defaults

use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::adapters::toml_config::{Settings, TomlConfigAdapter};
use crate::error::{SubforgeError, SubforgeResult};
use crate::utils::logging::LogFormat;

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub max_workers: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

/// Effective settings and where they came from
///
/// Settings are resolved before logging exists, so the provenance is kept
/// here and reported by [`LoadedSettings::log_summary`] once it does.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// Config file that was read, if any
    pub source: Option<PathBuf>,
    /// `SUBFORGE_*` variables that were applied
    pub env_overrides: Vec<&'static str>,
}

impl LoadedSettings {
    /// Report provenance through tracing; call after logging is initialized
    pub fn log_summary(&self) {
        match &self.source {
            Some(path) => info!("Loaded configuration from {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }
        if !self.env_overrides.is_empty() {
            info!(
                "Applied {} environment overrides: {}",
                self.env_overrides.len(),
                self.env_overrides.join(", ")
            );
        }
        debug!("Effective settings: {:?}", self.settings);
    }
}

/// Build the effective settings
///
/// An explicit `--config` file must exist; otherwise the first default
/// location that exists is used, if any.
pub fn load_settings(config: Option<&Path>, cli: &CliOverrides) -> SubforgeResult<LoadedSettings> {
    let source = match config {
        Some(path) => Some(path.to_path_buf()),
        None => TomlConfigAdapter::default_paths()
            .into_iter()
            .find(|path| path.is_file()),
    };
    let mut settings = match &source {
        Some(path) => TomlConfigAdapter::load(path)?,
        None => Settings::default(),
    };

    let env_overrides = apply_env(&mut settings, |key| std::env::var(key).ok())?;
    apply_cli(&mut settings, cli);
    settings.validate()?;
    Ok(LoadedSettings {
        settings,
        source,
        env_overrides,
    })
}

/// Apply `SUBFORGE_*` variables, returning the names of those that were set
pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> SubforgeResult<Vec<&'static str>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = Vec::new();
    let mut var = |key: &'static str| {
        let value = lookup(key).filter(|v| !v.trim().is_empty());
        if value.is_some() {
            applied.push(key);
        }
        value
    };

    if let Some(v) = var("SUBFORGE_MAX_WORKERS") {
        settings.pipeline.max_workers = parse_env("SUBFORGE_MAX_WORKERS", &v)?;
    }
    if let Some(v) = var("SUBFORGE_WORK_ROOT") {
        settings.pipeline.work_root = PathBuf::from(v);
    }
    if let Some(v) = var("SUBFORGE_OUTPUT_DIR") {
        settings.pipeline.output_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = var("SUBFORGE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = var("SUBFORGE_LOG_FORMAT") {
        settings.logging.format = parse_log_format(&v)?;
    }
    if let Some(v) = var("SUBFORGE_FFMPEG") {
        settings.encoder.ffmpeg = PathBuf::from(v);
    }
    if let Some(v) = var("SUBFORGE_FFPROBE") {
        settings.tools.ffprobe = PathBuf::from(v);
    }
    if let Some(v) = var("SUBFORGE_SILENCE_BREAK_MS") {
        settings.cues.silence_break_ms = parse_env("SUBFORGE_SILENCE_BREAK_MS", &v)?;
    }
    if let Some(v) = var("SUBFORGE_SAFE_AREA_RATIO") {
        settings.layout.safe_area_ratio = parse_env("SUBFORGE_SAFE_AREA_RATIO", &v)?;
    }

    Ok(applied)
}

/// Apply command-line values on top of everything else
pub fn apply_cli(settings: &mut Settings, cli: &CliOverrides) {
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if cli.json_logs {
        settings.logging.format = LogFormat::Json;
    }
    if let Some(workers) = cli.max_workers {
        settings.pipeline.max_workers = workers;
    }
    if let Some(dir) = &cli.output_dir {
        settings.pipeline.output_dir = Some(dir.clone());
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> SubforgeResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| SubforgeError::Config {
        message: format!("{} has invalid value '{}': {}", key, value, e),
    })
}

fn parse_log_format(value: &str) -> SubforgeResult<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        other => Err(SubforgeError::Config {
            message: format!("SUBFORGE_LOG_FORMAT must be pretty, compact or json, got '{}'", other),
        }),
    }
}
