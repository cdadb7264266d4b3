//! Logging setup for the binary and integration harnesses

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{SubforgeError, SubforgeResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text format
    Pretty,
    /// Compact single-line text
    Compact,
    /// JSON lines for structured collection
    Json,
}

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`, `subforge_cli=debug`)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include target module information
    pub target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            target: false,
        }
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output on stdout stays machine-readable.
pub fn init_logging(settings: &LoggingSettings) -> SubforgeResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| SubforgeError::Config {
            message: format!("invalid log level '{}': {}", settings.level, e),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(settings.target)
        .with_writer(std::io::stderr);

    let installed = match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| SubforgeError::Config {
        message: format!("logging already initialized: {}", e),
    })?;

    tracing::debug!("Logging initialized ({:?}, level {})", settings.format, settings.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = LoggingSettings::default();
        assert_eq!(settings.level, "info");
        assert_eq!(settings.format, LogFormat::Compact);
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: LoggingSettings = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
        assert!(!settings.target);
    }
}
