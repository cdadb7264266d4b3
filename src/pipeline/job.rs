//! Job records and the lifecycle state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ErrorKind, SubforgeError, SubforgeResult};

/// Job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = SubforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(JobId)
            .map_err(|_| SubforgeError::JobNotFound { id: s.to_string() })
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Transcribing,
    Rendering,
    Encoding,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// The next state on the success path
    pub fn successor(&self) -> Option<JobState> {
        match self {
            JobState::Queued => Some(JobState::Transcribing),
            JobState::Transcribing => Some(JobState::Rendering),
            JobState::Rendering => Some(JobState::Encoding),
            JobState::Encoding => Some(JobState::Completed),
            JobState::Completed | JobState::Failed => None,
        }
    }

    /// Forward by exactly one step, or to `Failed` from any live state
    pub fn can_transition_to(&self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JobState::Failed || self.successor() == Some(next)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Queued => "queued",
            JobState::Transcribing => "transcribing",
            JobState::Rendering => "rendering",
            JobState::Encoding => "encoding",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Error recorded on a failed job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SubforgeError> for JobError {
    fn from(error: &SubforgeError) -> Self {
        let message = error.to_string();
        Self {
            kind: error.kind(),
            message: if message.trim().is_empty() {
                error.kind().to_string()
            } else {
                message
            },
        }
    }
}

/// Point-in-time view of a job, safe to hand out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub source: PathBuf,
    pub style_id: String,
    pub state: JobState,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable job record owned by the pipeline registry
///
/// All state changes go through [`JobRecord::transition`]; progress only
/// moves forward and terminal records never change again.
#[derive(Debug, Clone)]
pub struct JobRecord {
    id: JobId,
    source: PathBuf,
    style_id: String,
    state: JobState,
    progress: u8,
    message: String,
    error: Option<JobError>,
    output: Option<PathBuf>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: JobId, source: PathBuf, style_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source,
            style_id: style_id.into(),
            state: JobState::Queued,
            progress: 0,
            message: "Waiting for a worker".to_string(),
            error: None,
            output: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source(&self) -> &PathBuf {
        &self.source
    }

    pub fn style_id(&self) -> &str {
        &self.style_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Same (source, style) pair
    pub fn matches(&self, source: &PathBuf, style_id: &str) -> bool {
        &self.source == source && self.style_id == style_id
    }

    /// Move to `next`, raising progress to `progress_floor` if it is higher
    pub fn transition(
        &mut self,
        next: JobState,
        progress_floor: u8,
        message: impl Into<String>,
    ) -> SubforgeResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SubforgeError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        self.state = next;
        self.progress = self.progress.max(progress_floor.min(100));
        self.message = message.into();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Raise progress within the current state; returns whether it moved
    pub fn advance_progress(&mut self, progress: u8) -> bool {
        let progress = progress.min(100);
        if self.state.is_terminal() || progress <= self.progress {
            return false;
        }
        self.progress = progress;
        self.updated_at = Utc::now();
        true
    }

    /// Record a failure; progress stays where it was
    pub fn fail(&mut self, error: &SubforgeError) -> SubforgeResult<()> {
        let recorded = JobError::from(error);
        let message = recorded.message.clone();
        self.transition(JobState::Failed, 0, message)?;
        self.error = Some(recorded);
        Ok(())
    }

    /// Record the output and finish
    pub fn complete(&mut self, output: PathBuf) -> SubforgeResult<()> {
        self.transition(JobState::Completed, 100, "Completed")?;
        self.output = Some(output);
        Ok(())
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            id: self.id,
            source: self.source.clone(),
            style_id: self.style_id.clone(),
            state: self.state,
            progress: self.progress,
            message: self.message.clone(),
            error: self.error.clone(),
            output: self.output.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
