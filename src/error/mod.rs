//! Error handling module for Subforge

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Subforge operations
#[derive(Error, Debug)]
pub enum SubforgeError {
    /// Style identifier is not registered in the catalog
    #[error("Unknown style: {id}")]
    UnknownStyle { id: String },

    /// Video dimensions are zero or negative
    #[error("Invalid video dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    /// Transcription produced no words
    #[error("Transcript is empty: no words to render")]
    EmptyTranscript,

    /// Word timestamps are malformed or out of order
    #[error("Invalid transcript: {message}")]
    InvalidTranscript { message: String },

    /// Cue partition invariant was breached (logic defect)
    #[error("Cue integrity check failed: {message}")]
    CueIntegrity { message: String },

    /// Subtitle script could not be produced
    #[error("Render failed: {message}")]
    Render { message: String },

    /// Source video is missing or unreadable
    #[error("Source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// External transcription/encoding/probe collaborator failed
    #[error("{stage} collaborator failed: {message}")]
    Collaborator { stage: String, message: String },

    /// Job was cancelled before reaching completion
    #[error("Cancellation requested")]
    CancellationRequested,

    /// Job state machine refused a transition
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Pipeline no longer accepts work
    #[error("Pipeline is shut down")]
    PipelineClosed,

    /// No job with the given identifier exists
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Subforge operations
pub type SubforgeResult<T> = std::result::Result<T, SubforgeError>;

/// Classified error kind recorded on failed jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownStyle,
    InvalidDimensions,
    EmptyTranscript,
    InvalidTranscript,
    CueIntegrityError,
    RenderError,
    SourceUnavailable,
    CollaboratorFailure,
    CancellationRequested,
    InvalidTransition,
    PipelineClosed,
    JobNotFound,
    Config,
    Io,
}

impl SubforgeError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubforgeError::UnknownStyle { .. } => ErrorKind::UnknownStyle,
            SubforgeError::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            SubforgeError::EmptyTranscript => ErrorKind::EmptyTranscript,
            SubforgeError::InvalidTranscript { .. } => ErrorKind::InvalidTranscript,
            SubforgeError::CueIntegrity { .. } => ErrorKind::CueIntegrityError,
            SubforgeError::Render { .. } => ErrorKind::RenderError,
            SubforgeError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            SubforgeError::Collaborator { .. } => ErrorKind::CollaboratorFailure,
            SubforgeError::CancellationRequested => ErrorKind::CancellationRequested,
            SubforgeError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            SubforgeError::PipelineClosed => ErrorKind::PipelineClosed,
            SubforgeError::JobNotFound { .. } => ErrorKind::JobNotFound,
            SubforgeError::Config { .. } => ErrorKind::Config,
            SubforgeError::Io(_) | SubforgeError::Json(_) => ErrorKind::Io,
        }
    }

    /// Wrap a collaborator failure, keeping its message verbatim
    pub fn collaborator(stage: &str, message: impl Into<String>) -> Self {
        SubforgeError::Collaborator {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SubforgeError::CancellationRequested)
    }

    /// Wrap any upstream failure as a render error
    pub fn render(message: impl Into<String>) -> Self {
        SubforgeError::Render {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnknownStyle => "UnknownStyle",
            ErrorKind::InvalidDimensions => "InvalidDimensions",
            ErrorKind::EmptyTranscript => "EmptyTranscript",
            ErrorKind::InvalidTranscript => "InvalidTranscript",
            ErrorKind::CueIntegrityError => "CueIntegrityError",
            ErrorKind::RenderError => "RenderError",
            ErrorKind::SourceUnavailable => "SourceUnavailable",
            ErrorKind::CollaboratorFailure => "CollaboratorFailure",
            ErrorKind::CancellationRequested => "CancellationRequested",
            ErrorKind::InvalidTransition => "InvalidTransition",
            ErrorKind::PipelineClosed => "PipelineClosed",
            ErrorKind::JobNotFound => "JobNotFound",
            ErrorKind::Config => "Config",
            ErrorKind::Io => "Io",
        };
        write!(f, "{}", name)
    }
}
