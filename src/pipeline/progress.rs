//! Progress bands per pipeline stage

use super::job::JobState;

/// Percentage range a state's progress moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    pub start: u8,
    pub end: u8,
}

impl ProgressBand {
    /// Band position for a fraction of the stage
    pub fn at(&self, fraction: f64) -> u8 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let span = f64::from(self.end - self.start);
        self.start + (span * fraction).floor() as u8
    }
}

/// Band owned by each state
pub fn band(state: JobState) -> ProgressBand {
    match state {
        JobState::Queued => ProgressBand { start: 0, end: 0 },
        JobState::Transcribing => ProgressBand { start: 0, end: 40 },
        JobState::Rendering => ProgressBand { start: 40, end: 45 },
        JobState::Encoding => ProgressBand { start: 45, end: 95 },
        JobState::Completed => ProgressBand {
            start: 100,
            end: 100,
        },
        // Failure freezes progress wherever it was
        JobState::Failed => ProgressBand { start: 0, end: 0 },
    }
}
