//! Style catalog: the fixed set of subtitle presets
//!
//! The table is built once on first access and never mutated afterwards, so
//! every job reads it concurrently without locking.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{SubforgeError, SubforgeResult};

pub mod color;

pub use color::Color;

/// Preset used when a caller does not pick one
pub const DEFAULT_STYLE: &str = "instagram_classic";

/// Font ratio the layout character budgets are calibrated for
pub const REFERENCE_FONT_RATIO: f64 = 0.05;

/// Font size, either absolute or scaled from canvas height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    Fixed(u32),
    Dynamic { ratio: f64, min_px: u32 },
}

impl FontSize {
    /// Absolute size in pixels for a canvas of the given height
    pub fn resolve(&self, canvas_height: u32) -> u32 {
        match *self {
            FontSize::Fixed(px) => px.max(1),
            FontSize::Dynamic { ratio, min_px } => {
                let scaled = (canvas_height as f64 * ratio).round() as u32;
                scaled.max(min_px).max(1)
            }
        }
    }

    /// Size expressed as a fraction of canvas height
    pub fn ratio(&self, canvas_height: u32) -> f64 {
        if canvas_height == 0 {
            return REFERENCE_FONT_RATIO;
        }
        self.resolve(canvas_height) as f64 / canvas_height as f64
    }
}

/// Where the subtitle line sits on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    BottomCenter,
    MiddleCenter,
    TopCenter,
}

impl Anchor {
    /// ASS numpad alignment code
    pub fn alignment(&self) -> u8 {
        match self {
            Anchor::BottomCenter => 2,
            Anchor::MiddleCenter => 5,
            Anchor::TopCenter => 8,
        }
    }
}

/// Glow strength around highlighted words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlowIntensity {
    None,
    Soft,
    Strong,
}

impl GlowIntensity {
    /// Shadow depth in pixels
    pub fn shadow(&self) -> u32 {
        match self {
            GlowIntensity::None => 0,
            GlowIntensity::Soft => 2,
            GlowIntensity::Strong => 3,
        }
    }

    /// Edge blur strength
    pub fn blur(&self) -> u32 {
        match self {
            GlowIntensity::None => 0,
            GlowIntensity::Soft => 2,
            GlowIntensity::Strong => 4,
        }
    }
}

/// Glow parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub color: Color,
    pub intensity: GlowIntensity,
}

/// How a highlighted word is emphasized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightEffect {
    ColorChange,
    ScaleUp,
    GlowPulse,
    BackgroundHighlight,
}

/// Animation switches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationFlags {
    pub word_highlight: bool,
    pub fade_in: bool,
    /// Scale multiplier applied while a word is highlighted
    pub scale_on_highlight: Option<f64>,
}

/// A named bundle of font, color and animation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePreset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub best_for: String,
    pub font_family: String,
    pub font_size: FontSize,
    pub bold: bool,
    pub primary_color: Color,
    pub highlight_color: Color,
    pub outline_color: Color,
    pub outline_width: u32,
    pub glow: Glow,
    pub background: Option<Color>,
    pub anchor: Anchor,
    pub highlight_effect: HighlightEffect,
    pub max_words_per_cue: usize,
    pub animation: AnimationFlags,
}

/// Discovery entry returned by [`StyleCatalog::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Immutable preset table
#[derive(Debug)]
pub struct StyleCatalog {
    presets: Vec<StylePreset>,
}

impl StyleCatalog {
    /// Process-wide catalog of built-in presets
    pub fn builtin() -> &'static StyleCatalog {
        static CATALOG: OnceLock<StyleCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| StyleCatalog {
            presets: builtin_presets(),
        })
    }

    /// Look up a preset by identifier
    pub fn get(&self, id: &str) -> SubforgeResult<&StylePreset> {
        self.presets
            .iter()
            .find(|preset| preset.id == id)
            .ok_or_else(|| SubforgeError::UnknownStyle { id: id.to_string() })
    }

    /// Presets in registration order
    pub fn list(&self) -> Vec<StyleSummary> {
        self.presets
            .iter()
            .map(|preset| StyleSummary {
                id: preset.id.clone(),
                name: preset.name.clone(),
                description: preset.description.clone(),
            })
            .collect()
    }

    pub fn presets(&self) -> &[StylePreset] {
        &self.presets
    }
}

fn builtin_presets() -> Vec<StylePreset> {
    let no_glow = Glow {
        color: Color::BLACK,
        intensity: GlowIntensity::None,
    };

    vec![
        StylePreset {
            id: "instagram_classic".to_string(),
            name: "Instagram Classic".to_string(),
            description: "Clean white text with gold highlight".to_string(),
            best_for: "Professional content, tutorials".to_string(),
            font_family: "Arial".to_string(),
            font_size: FontSize::Dynamic {
                ratio: 0.05,
                min_px: 16,
            },
            bold: true,
            primary_color: Color::WHITE,
            highlight_color: Color::rgb(0xff, 0xd7, 0x00),
            outline_color: Color::BLACK,
            outline_width: 2,
            glow: no_glow,
            background: None,
            anchor: Anchor::BottomCenter,
            highlight_effect: HighlightEffect::ColorChange,
            max_words_per_cue: 3,
            animation: AnimationFlags {
                word_highlight: true,
                fade_in: false,
                scale_on_highlight: None,
            },
        },
        StylePreset {
            id: "tiktok_viral".to_string(),
            name: "TikTok Viral".to_string(),
            description: "Bold text with cyan glow effect".to_string(),
            best_for: "Dance videos, trends, young audience".to_string(),
            font_family: "Arial".to_string(),
            font_size: FontSize::Dynamic {
                ratio: 0.055,
                min_px: 16,
            },
            bold: true,
            primary_color: Color::WHITE,
            highlight_color: Color::rgb(0x00, 0xff, 0xff),
            outline_color: Color::BLACK,
            outline_width: 1,
            glow: Glow {
                color: Color::rgb(0x00, 0xff, 0xff),
                intensity: GlowIntensity::Strong,
            },
            background: None,
            anchor: Anchor::BottomCenter,
            highlight_effect: HighlightEffect::GlowPulse,
            max_words_per_cue: 4,
            animation: AnimationFlags {
                word_highlight: true,
                fade_in: true,
                scale_on_highlight: Some(1.1),
            },
        },
        StylePreset {
            id: "youtube_professional".to_string(),
            name: "YouTube Professional".to_string(),
            description: "Red background highlight style".to_string(),
            best_for: "Educational content, business videos".to_string(),
            font_family: "Arial".to_string(),
            font_size: FontSize::Dynamic {
                ratio: 0.045,
                min_px: 16,
            },
            bold: true,
            primary_color: Color::WHITE,
            highlight_color: Color::rgb(0xff, 0x00, 0x00),
            outline_color: Color::BLACK,
            outline_width: 2,
            glow: no_glow,
            background: Some(Color::BLACK.with_alpha(0x80)),
            anchor: Anchor::BottomCenter,
            highlight_effect: HighlightEffect::BackgroundHighlight,
            max_words_per_cue: 3,
            animation: AnimationFlags {
                word_highlight: true,
                fade_in: true,
                scale_on_highlight: None,
            },
        },
        StylePreset {
            id: "minimalist".to_string(),
            name: "Minimalist".to_string(),
            description: "Subtle scale effect with soft colors".to_string(),
            best_for: "Aesthetic content, quotes".to_string(),
            font_family: "Arial".to_string(),
            font_size: FontSize::Dynamic {
                ratio: 0.04,
                min_px: 16,
            },
            bold: false,
            primary_color: Color::WHITE,
            highlight_color: Color::rgb(0x4a, 0x90, 0xe2),
            outline_color: Color::rgb(0x40, 0x40, 0x40),
            outline_width: 1,
            glow: no_glow,
            background: None,
            anchor: Anchor::MiddleCenter,
            highlight_effect: HighlightEffect::ScaleUp,
            max_words_per_cue: 3,
            animation: AnimationFlags {
                word_highlight: true,
                fade_in: true,
                scale_on_highlight: Some(1.2),
            },
        },
        StylePreset {
            id: "gaming".to_string(),
            name: "Gaming/Streamer".to_string(),
            description: "Bold green glow with thick outline".to_string(),
            best_for: "Gaming content, reactions".to_string(),
            font_family: "Arial".to_string(),
            font_size: FontSize::Dynamic {
                ratio: 0.06,
                min_px: 18,
            },
            bold: true,
            primary_color: Color::WHITE,
            highlight_color: Color::rgb(0x00, 0xff, 0x00),
            outline_color: Color::BLACK,
            outline_width: 3,
            glow: Glow {
                color: Color::rgb(0x00, 0xff, 0x00),
                intensity: GlowIntensity::Strong,
            },
            background: None,
            anchor: Anchor::BottomCenter,
            highlight_effect: HighlightEffect::GlowPulse,
            max_words_per_cue: 2,
            animation: AnimationFlags {
                word_highlight: true,
                fade_in: false,
                scale_on_highlight: None,
            },
        },
    ]
}
