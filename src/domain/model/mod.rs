// Domain models - Core types and data structures

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SubforgeError, SubforgeResult};

/// A transcribed token with its own timing, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Word {
    /// Create a new word with validation
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> SubforgeResult<Self> {
        if end_ms < start_ms {
            return Err(SubforgeError::InvalidTranscript {
                message: format!("word ends before it starts ({} < {})", end_ms, start_ms),
            });
        }

        Ok(Self {
            text: text.into().trim().to_string(),
            start_ms,
            end_ms,
        })
    }

    /// Number of displayed characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Check that a word sequence is usable as a timing source
pub fn validate_words(words: &[Word]) -> SubforgeResult<()> {
    if words.is_empty() {
        return Err(SubforgeError::EmptyTranscript);
    }

    for (index, word) in words.iter().enumerate() {
        if word.end_ms < word.start_ms {
            return Err(SubforgeError::InvalidTranscript {
                message: format!("word {} ends before it starts", index),
            });
        }
        if index > 0 && word.start_ms < words[index - 1].start_ms {
            return Err(SubforgeError::InvalidTranscript {
                message: format!("word {} starts before word {}", index, index - 1),
            });
        }
    }

    Ok(())
}

/// Why a cue was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueBreak {
    /// First cue of the transcript
    First,
    /// Previous line ran out of characters
    LineFull,
    /// Time from the previous word's onset reached the silence threshold
    Silence,
    /// Previous line reached the preset's word count
    WordLimit,
}

/// One on-screen subtitle line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub words: Vec<Word>,
    pub start_ms: u64,
    pub end_ms: u64,
    pub opened_by: CueBreak,
}

impl Cue {
    /// Line text as displayed
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Display duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Orientation derived from the video's aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
    Square,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Vertical => write!(f, "vertical"),
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Square => write!(f, "square"),
        }
    }
}

/// Subtitle layout resolved for one canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Minimum distance from any canvas edge, in pixels
    pub safe_margin: u32,
    /// Left/right margin written into the style record
    pub margin_h: u32,
    /// Distance from the top or bottom edge to the anchored line
    pub anchor_offset: u32,
    /// Usable line width in pixels
    pub max_line_width: u32,
    /// Character budget at the reference font size
    pub max_chars_per_line: usize,
}

/// Canvas dimensions with their derived orientation and layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGeometry {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub layout: Layout,
}

/// Raw dimensions and duration reported by the probe collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDimensions {
    pub width: i64,
    pub height: i64,
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests;
