//! Aspect-ratio classification and per-orientation subtitle layout
//!
//! Pure functions of the canvas size. The thresholds are fixed so scripts
//! rendered by different builds line up.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::{Layout, Orientation, VideoGeometry};
use crate::error::{SubforgeError, SubforgeResult};

/// height / width at or above this is vertical
pub const VERTICAL_THRESHOLD: f64 = 1.2;
/// height / width at or below this is horizontal
pub const HORIZONTAL_THRESHOLD: f64 = 0.83;
/// Default safe-area margin as a fraction of the shorter side
pub const DEFAULT_SAFE_AREA_RATIO: f64 = 0.05;

const MAX_SAFE_AREA_RATIO: f64 = 0.45;

/// Layout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Safe-area margin as a fraction of the shorter side
    pub safe_area_ratio: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            safe_area_ratio: DEFAULT_SAFE_AREA_RATIO,
        }
    }
}

/// Per-orientation layout constants
#[derive(Debug, Clone, Copy)]
struct OrientationProfile {
    line_width_ratio: f64,
    anchor_offset_ratio: f64,
    max_chars: usize,
}

fn profile(orientation: Orientation) -> OrientationProfile {
    match orientation {
        Orientation::Vertical => OrientationProfile {
            line_width_ratio: 0.90,
            anchor_offset_ratio: 0.25,
            max_chars: 24,
        },
        Orientation::Square => OrientationProfile {
            line_width_ratio: 0.85,
            anchor_offset_ratio: 0.20,
            max_chars: 32,
        },
        Orientation::Horizontal => OrientationProfile {
            line_width_ratio: 0.80,
            anchor_offset_ratio: 0.15,
            max_chars: 42,
        },
    }
}

/// Classify with the default safe-area margin
pub fn classify(width: i64, height: i64) -> SubforgeResult<VideoGeometry> {
    classify_with(width, height, &LayoutSettings::default())
}

/// Classify a canvas and resolve its layout
pub fn classify_with(
    width: i64,
    height: i64,
    settings: &LayoutSettings,
) -> SubforgeResult<VideoGeometry> {
    if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
        return Err(SubforgeError::InvalidDimensions { width, height });
    }

    let (width, height) = (width as u32, height as u32);
    let orientation = orientation_for(width, height);
    let layout = resolve_layout(width, height, orientation, settings);

    debug!(
        "Classified {}x{} as {} (safe margin {}px, {} chars/line)",
        width, height, orientation, layout.safe_margin, layout.max_chars_per_line
    );

    Ok(VideoGeometry {
        width,
        height,
        orientation,
        layout,
    })
}

/// Orientation from the height/width ratio
pub fn orientation_for(width: u32, height: u32) -> Orientation {
    let ratio = height as f64 / width as f64;
    if ratio >= VERTICAL_THRESHOLD {
        Orientation::Vertical
    } else if ratio <= HORIZONTAL_THRESHOLD {
        Orientation::Horizontal
    } else {
        Orientation::Square
    }
}

fn resolve_layout(
    width: u32,
    height: u32,
    orientation: Orientation,
    settings: &LayoutSettings,
) -> Layout {
    let profile = profile(orientation);
    let safe_ratio = settings.safe_area_ratio.clamp(0.0, MAX_SAFE_AREA_RATIO);
    let shorter = width.min(height);
    let safe_margin = (shorter as f64 * safe_ratio).ceil() as u32;

    let usable_width = width.saturating_sub(safe_margin * 2).max(1);
    let max_line_width = ((width as f64 * profile.line_width_ratio).round() as u32)
        .min(usable_width)
        .max(1);
    let margin_h = ((width - max_line_width) / 2).max(safe_margin);
    let anchor_offset = ((height as f64 * profile.anchor_offset_ratio).round() as u32)
        .max(safe_margin);

    Layout {
        safe_margin,
        margin_h,
        anchor_offset,
        max_line_width,
        max_chars_per_line: profile.max_chars,
    }
}
