// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tracing_log;
pub mod transcribe_command;
pub mod transcript_file;

// Re-export adapters
pub use exec_ffmpeg::{EncoderSettings, FfmpegEncoder};
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::{Settings, TomlConfigAdapter, ToolSettings};
pub use tracing_log::TracingObserver;
pub use transcribe_command::CommandTranscriber;
pub use transcript_file::TranscriptFileAdapter;
