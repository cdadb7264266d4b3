//! SubRip sidecar export

use crate::domain::model::Cue;
use crate::utils::time::format_srt_time;

/// Cues as numbered SRT blocks
pub fn write_srt(cues: &[Cue]) -> String {
    cues.iter()
        .enumerate()
        .map(|(index, cue)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                index + 1,
                format_srt_time(cue.start_ms),
                format_srt_time(cue.end_ms),
                cue.text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
