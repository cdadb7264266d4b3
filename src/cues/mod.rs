//! Cue builder: groups timed words into on-screen lines

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::model::{validate_words, Cue, CueBreak, VideoGeometry, Word};
use crate::error::{SubforgeError, SubforgeResult};
use crate::style::{StylePreset, REFERENCE_FONT_RATIO};

/// Default pause that forces a new cue
pub const DEFAULT_SILENCE_BREAK_MS: u64 = 1200;
/// Default minimum time a cue stays on screen
pub const DEFAULT_MIN_CUE_MS: u64 = 700;

/// Cue grouping configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueSettings {
    /// Pause (onset to onset) at or beyond which a new cue starts
    pub silence_break_ms: u64,
    /// Minimum display time of a cue
    pub min_cue_ms: u64,
    /// Overrides the geometry's character budget when set
    pub max_chars: Option<usize>,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            silence_break_ms: DEFAULT_SILENCE_BREAK_MS,
            min_cue_ms: DEFAULT_MIN_CUE_MS,
            max_chars: None,
        }
    }
}

/// Greedy line grouping
pub struct CueBuilder {
    settings: CueSettings,
}

impl Default for CueBuilder {
    fn default() -> Self {
        Self::new(CueSettings::default())
    }
}

impl CueBuilder {
    pub fn new(settings: CueSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CueSettings {
        &self.settings
    }

    /// Character budget for one line of this style on this canvas
    pub fn char_budget(&self, style: &StylePreset, geometry: &VideoGeometry) -> usize {
        // An explicit override is taken as-is
        if let Some(max_chars) = self.settings.max_chars {
            return max_chars.max(1);
        }

        let base = geometry.layout.max_chars_per_line;
        let font_ratio = style.font_size.ratio(geometry.height);
        // Epsilon keeps the reference font from flooring to base - 1
        let scaled = (base as f64 * REFERENCE_FONT_RATIO / font_ratio + 1e-9).floor() as usize;
        scaled.max(1)
    }

    /// Partition `words` into cues
    pub fn build(
        &self,
        words: &[Word],
        style: &StylePreset,
        geometry: &VideoGeometry,
    ) -> SubforgeResult<Vec<Cue>> {
        validate_words(words)?;

        let budget = self.char_budget(style, geometry);
        let max_words = style.max_words_per_cue.max(1);

        let mut groups: Vec<(Vec<Word>, CueBreak)> = Vec::new();
        let mut current: Vec<Word> = Vec::new();
        let mut current_len = 0usize;
        let mut opened_by = CueBreak::First;

        for word in words {
            if let Some(previous) = current.last() {
                if let Some(reason) =
                    self.break_reason(previous, word, current_len, current.len(), budget, max_words)
                {
                    groups.push((std::mem::take(&mut current), opened_by));
                    current_len = 0;
                    opened_by = reason;
                }
            }

            current_len += if current.is_empty() {
                word.char_len()
            } else {
                word.char_len() + 1
            };
            current.push(word.clone());
        }
        groups.push((current, opened_by));

        let cues = self.assign_times(groups);
        verify_partition(words, &cues)?;

        debug!(
            "Grouped {} words into {} cues (budget {} chars, {} words max)",
            words.len(),
            cues.len(),
            budget,
            max_words
        );
        Ok(cues)
    }

    /// Reason to close the current line before `word`, checked in precedence order
    fn break_reason(
        &self,
        previous: &Word,
        word: &Word,
        current_len: usize,
        current_words: usize,
        budget: usize,
        max_words: usize,
    ) -> Option<CueBreak> {
        if current_len + 1 + word.char_len() > budget {
            return Some(CueBreak::LineFull);
        }
        if word.start_ms.saturating_sub(previous.start_ms) >= self.settings.silence_break_ms {
            return Some(CueBreak::Silence);
        }
        if current_words >= max_words {
            return Some(CueBreak::WordLimit);
        }
        None
    }

    fn assign_times(&self, groups: Vec<(Vec<Word>, CueBreak)>) -> Vec<Cue> {
        let next_starts: Vec<Option<u64>> = groups
            .iter()
            .skip(1)
            .map(|(words, _)| words.first().map(|w| w.start_ms))
            .chain(std::iter::once(None))
            .collect();

        groups
            .into_iter()
            .zip(next_starts)
            .map(|((words, opened_by), next_start)| {
                let start_ms = words.first().map(|w| w.start_ms).unwrap_or_default();
                let natural_end = words.last().map(|w| w.end_ms).unwrap_or(start_ms);
                let mut end_ms = natural_end.max(start_ms.saturating_add(self.settings.min_cue_ms));
                if let Some(next_start) = next_start {
                    end_ms = end_ms.min(next_start);
                }

                Cue {
                    words,
                    start_ms,
                    end_ms: end_ms.max(start_ms),
                    opened_by,
                }
            })
            .collect()
    }
}

/// Every word appears once, in order, and cue windows never overlap
fn verify_partition(words: &[Word], cues: &[Cue]) -> SubforgeResult<()> {
    let flattened: Vec<&Word> = cues.iter().flat_map(|cue| cue.words.iter()).collect();
    if flattened.len() != words.len() || flattened.iter().zip(words).any(|(a, b)| *a != b) {
        return Err(integrity_breach(format!(
            "cues hold {} words, transcript has {}",
            flattened.len(),
            words.len()
        )));
    }

    for (index, cue) in cues.iter().enumerate() {
        if cue.words.is_empty() {
            return Err(integrity_breach(format!("cue {} is empty", index)));
        }
        if cue.end_ms < cue.start_ms {
            return Err(integrity_breach(format!("cue {} ends before it starts", index)));
        }
        if index > 0 && cue.start_ms < cues[index - 1].end_ms {
            return Err(integrity_breach(format!(
                "cue {} overlaps cue {}",
                index,
                index - 1
            )));
        }
    }

    Ok(())
}

fn integrity_breach(message: String) -> SubforgeError {
    error!("Cue integrity breach: {}", message);
    SubforgeError::CueIntegrity { message }
}
