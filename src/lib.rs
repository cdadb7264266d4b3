//! Subforge library
//!
//! Styled, word-highlighted subtitles for short-form video: a preset catalog,
//! an aspect-ratio classifier, a cue builder, an ASS timeline renderer and an
//! asynchronous job pipeline that drives transcription and encoding through
//! pluggable ports.

pub mod adapters;
pub mod cli;
pub mod config_initialization;
pub mod cues;
pub mod domain;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod ports;
pub mod render;
pub mod style;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{Cue, CueBreak, Orientation, VideoDimensions, VideoGeometry, Word};
pub use error::{ErrorKind, SubforgeError, SubforgeResult};
pub use pipeline::job::{JobId, JobState, JobStatus};
pub use pipeline::JobPipeline;
pub use style::{StyleCatalog, StylePreset};
