//! Timeline renderer: cues to a styled subtitle script
//!
//! Rendering happens in two steps. [`TimelineRenderer::events`] resolves every
//! cue into a [`RenderEvent`] (position, fade, highlight windows) and
//! [`ass::serialize`] serializes those events. The script is assembled in
//! memory; callers either get the whole text or an error.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::model::{Cue, VideoGeometry};
use crate::error::{SubforgeError, SubforgeResult};
use crate::style::{Anchor, StylePreset};

pub mod ass;
pub mod srt;

/// Default fade-in length
pub const DEFAULT_FADE_MS: u64 = 150;

/// Scale used by the scale-up effect when the preset sets none
pub const DEFAULT_HIGHLIGHT_SCALE: f64 = 1.2;

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Upper bound of the fade-in at the start of each cue
    pub fade_ms: u64,
    /// Title written into the script header
    pub title: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fade_ms: DEFAULT_FADE_MS,
            title: "Subforge".to_string(),
        }
    }
}

/// Output script format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFormat {
    Ass,
    Srt,
}

impl ScriptFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ScriptFormat::Ass => "ass",
            ScriptFormat::Srt => "srt",
        }
    }
}

/// Time window during which one word is emphasized, in absolute milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightWindow {
    pub word_index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl HighlightWindow {
    pub fn is_empty(&self) -> bool {
        self.end_ms <= self.start_ms
    }
}

/// One displayed line, fully resolved against style and canvas
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    pub cue: Cue,
    /// Anchor point `(x, y)` in canvas pixels
    pub position: (u32, u32),
    /// ASS numpad alignment
    pub alignment: u8,
    /// Fade-in length, when the preset fades
    pub fade_ms: Option<u64>,
    /// One window per word, empty when word highlighting is off
    pub highlights: Vec<HighlightWindow>,
}

/// Turns cues into subtitle scripts
#[derive(Debug, Clone, Default)]
pub struct TimelineRenderer {
    settings: RenderSettings,
}

impl TimelineRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Resolve cues into display events
    pub fn events(
        &self,
        cues: &[Cue],
        style: &StylePreset,
        geometry: &VideoGeometry,
    ) -> SubforgeResult<Vec<RenderEvent>> {
        check_inputs(cues, geometry)?;

        let position = anchor_position(style, geometry);
        let alignment = style.anchor.alignment();

        let events = cues
            .iter()
            .map(|cue| RenderEvent {
                cue: cue.clone(),
                position,
                alignment,
                fade_ms: style
                    .animation
                    .fade_in
                    .then(|| fade_length(self.settings.fade_ms, cue)),
                highlights: if style.animation.word_highlight {
                    highlight_windows(cue)
                } else {
                    Vec::new()
                },
            })
            .collect();

        Ok(events)
    }

    /// Render cues as a complete ASS script
    pub fn render(
        &self,
        cues: &[Cue],
        style: &StylePreset,
        geometry: &VideoGeometry,
    ) -> SubforgeResult<String> {
        let events = self.events(cues, style, geometry)?;
        let script = ass::serialize(&self.settings, &events, style, geometry)?;

        debug!(
            "Rendered {} events for style '{}' on {}x{} ({} bytes)",
            events.len(),
            style.id,
            geometry.width,
            geometry.height,
            script.len()
        );
        Ok(script)
    }

    /// Render in the requested format
    pub fn render_as(
        &self,
        format: ScriptFormat,
        cues: &[Cue],
        style: &StylePreset,
        geometry: &VideoGeometry,
    ) -> SubforgeResult<String> {
        match format {
            ScriptFormat::Ass => self.render(cues, style, geometry),
            ScriptFormat::Srt => {
                check_inputs(cues, geometry)?;
                Ok(srt::write_srt(cues))
            }
        }
    }
}

fn check_inputs(cues: &[Cue], geometry: &VideoGeometry) -> SubforgeResult<()> {
    if cues.is_empty() {
        return Err(SubforgeError::render("no cues to render"));
    }
    if geometry.width == 0 || geometry.height == 0 {
        return Err(SubforgeError::render(format!(
            "unusable canvas {}x{}",
            geometry.width, geometry.height
        )));
    }
    if let Some(index) = cues
        .windows(2)
        .position(|pair| pair[1].start_ms < pair[0].start_ms)
    {
        return Err(SubforgeError::render(format!(
            "cue {} starts before cue {}",
            index + 1,
            index
        )));
    }
    Ok(())
}

/// Fade-in length for a cue: the configured fade, capped at a quarter of the cue
pub fn fade_length(fade_ms: u64, cue: &Cue) -> u64 {
    fade_ms.min(cue.duration_ms() / 4)
}

/// Per-word highlight windows, contained in the cue and never overlapping
///
/// Each word keeps its own `[start, end)` clamped to the cue; an overlap with
/// the following word is resolved by cutting the earlier word at the later
/// word's start.
pub fn highlight_windows(cue: &Cue) -> Vec<HighlightWindow> {
    let clamp = |ms: u64| ms.clamp(cue.start_ms, cue.end_ms);

    cue.words
        .iter()
        .enumerate()
        .map(|(index, word)| {
            let start_ms = clamp(word.start_ms);
            let mut end_ms = clamp(word.end_ms).max(start_ms);
            if let Some(next) = cue.words.get(index + 1) {
                end_ms = end_ms.min(clamp(next.start_ms).max(start_ms));
            }
            HighlightWindow {
                word_index: index,
                start_ms,
                end_ms,
            }
        })
        .collect()
}

/// Anchor point of the subtitle line, kept inside the safe area
pub fn anchor_position(style: &StylePreset, geometry: &VideoGeometry) -> (u32, u32) {
    let width = geometry.width;
    let height = geometry.height;
    let safe = geometry.layout.safe_margin;
    let font_px = style.font_size.resolve(height);

    // Lowest and highest baseline that keep one text line inside the safe area
    let top_limit = safe.saturating_add(font_px).min(height);
    let bottom_limit = height.saturating_sub(safe).max(top_limit);

    let x = width / 2;
    let y = match style.anchor {
        Anchor::BottomCenter => height.saturating_sub(geometry.layout.anchor_offset),
        Anchor::MiddleCenter => height / 2 + font_px / 2,
        Anchor::TopCenter => geometry.layout.anchor_offset.saturating_add(font_px),
    };

    // \pos refers to the alignment point; normalize to the baseline for clamping
    let y = y.clamp(top_limit, bottom_limit);
    let y = match style.anchor {
        Anchor::BottomCenter => y,
        Anchor::MiddleCenter => y.saturating_sub(font_px / 2),
        Anchor::TopCenter => y.saturating_sub(font_px),
    };

    (x, y)
}

/// Write a script atomically: a temp file in the target directory, then rename
pub fn write_script(path: &Path, contents: &str) -> SubforgeResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| SubforgeError::Io(e.error))?;

    info!("Wrote subtitle script: {}", path.display());
    Ok(())
}
