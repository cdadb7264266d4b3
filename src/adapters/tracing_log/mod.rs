// Tracing log adapter - Structured job events using tracing crate

use tracing::{debug, info, warn};

use crate::pipeline::job::{JobState, JobStatus};
use crate::ports::JobObserver;

/// Observer that turns job changes into log events
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl JobObserver for TracingObserver {
    fn on_state(&self, status: &JobStatus) {
        match (status.state, &status.error) {
            (JobState::Failed, Some(error)) => warn!(
                job_id = %status.id,
                state = %status.state,
                progress = status.progress,
                error_kind = %error.kind,
                "{}",
                error.message
            ),
            _ => info!(
                job_id = %status.id,
                state = %status.state,
                progress = status.progress,
                style = %status.style_id,
                "{}",
                status.message
            ),
        }
    }

    fn on_progress(&self, status: &JobStatus) {
        debug!(
            job_id = %status.id,
            state = %status.state,
            progress = status.progress,
            "progress"
        );
    }
}
