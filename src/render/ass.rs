//! Advanced SubStation Alpha serialization

use std::fmt::Write;

use super::{HighlightWindow, RenderEvent, RenderSettings, DEFAULT_HIGHLIGHT_SCALE};
use crate::domain::model::VideoGeometry;
use crate::error::{SubforgeError, SubforgeResult};
use crate::style::{Color, GlowIntensity, HighlightEffect, StylePreset};
use crate::utils::time::{format_ass_time, quantize_cs};

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Border width used to paint the background-highlight box
const HIGHLIGHT_BORDER: u32 = 6;

/// Serialize resolved events into a complete script
pub fn serialize(
    settings: &RenderSettings,
    events: &[RenderEvent],
    style: &StylePreset,
    geometry: &VideoGeometry,
) -> SubforgeResult<String> {
    let mut out = String::new();
    write_header(&mut out, settings, style, geometry).map_err(format_failure)?;
    for event in events {
        write_event(&mut out, event, style).map_err(format_failure)?;
    }
    Ok(out)
}

fn format_failure(e: std::fmt::Error) -> SubforgeError {
    SubforgeError::render(format!("script formatting failed: {}", e))
}

fn write_header(
    out: &mut String,
    settings: &RenderSettings,
    style: &StylePreset,
    geometry: &VideoGeometry,
) -> std::fmt::Result {
    writeln!(out, "[Script Info]")?;
    writeln!(out, "Title: {} - {}", settings.title, style.name)?;
    writeln!(out, "ScriptType: v4.00+")?;
    writeln!(out, "PlayResX: {}", geometry.width)?;
    writeln!(out, "PlayResY: {}", geometry.height)?;
    // Cues are already budgeted to one line; never let the renderer re-wrap
    writeln!(out, "WrapStyle: 2")?;
    writeln!(out, "ScaledBorderAndShadow: yes")?;
    writeln!(out)?;

    writeln!(out, "[V4+ Styles]")?;
    writeln!(out, "{}", STYLE_FORMAT)?;
    writeln!(out, "{}", style_record(style, geometry))?;
    writeln!(out)?;

    writeln!(out, "[Events]")?;
    writeln!(out, "{}", EVENT_FORMAT)
}

/// `Style:` line for a preset resolved on a canvas
pub fn style_record(style: &StylePreset, geometry: &VideoGeometry) -> String {
    let back = style
        .background
        .unwrap_or_else(|| Color::BLACK.with_alpha(0x80));
    let shadow = if style.background.is_some() { 1 } else { 0 };

    format!(
        "Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,1,{},{},{},{},{},{},1",
        style.id,
        style.font_family,
        style.font_size.resolve(geometry.height),
        style.primary_color.to_ass_style(),
        style.highlight_color.to_ass_style(),
        style.outline_color.to_ass_style(),
        back.to_ass_style(),
        if style.bold { -1 } else { 0 },
        style.outline_width,
        shadow,
        style.anchor.alignment(),
        geometry.layout.margin_h,
        geometry.layout.margin_h,
        geometry.layout.anchor_offset,
    )
}

fn write_event(out: &mut String, event: &RenderEvent, style: &StylePreset) -> std::fmt::Result {
    let start = quantize_cs(event.cue.start_ms);
    let end = quantize_cs(event.cue.end_ms).max(start);

    let mut text = format!(
        "{{\\an{}\\pos({},{})",
        event.alignment, event.position.0, event.position.1
    );
    if let Some(fade) = event.fade_ms {
        write!(text, "\\fad({},0)", fade)?;
    }
    text.push('}');

    if event.highlights.is_empty() {
        text.push_str(&sanitize(&event.cue.text()));
    } else {
        let words: Vec<String> = event
            .cue
            .words
            .iter()
            .zip(&event.highlights)
            .map(|(word, window)| highlighted_word(&word.text, window, start, style))
            .collect();
        text.push_str(&words.join(" "));
    }

    writeln!(
        out,
        "Dialogue: 0,{},{},{},,0,0,0,,{}",
        format_ass_time(start),
        format_ass_time(end),
        style.id,
        text
    )
}

/// One word wrapped in its own override block
///
/// `\r` drops the previous word's transforms so each word only carries its own.
fn highlighted_word(
    text: &str,
    window: &HighlightWindow,
    event_start: u64,
    style: &StylePreset,
) -> String {
    let text = sanitize(text);
    if window.is_empty() {
        return format!("{{\\r}}{}", text);
    }

    let on = window.start_ms - event_start;
    let off = window.end_ms - event_start;
    let (emphasis, reset) = effect_tags(style);

    format!(
        "{{\\r\\t({on},{on},{emphasis})\\t({off},{off},{reset})}}{text}",
        on = on,
        off = off,
        emphasis = emphasis,
        reset = reset,
        text = text
    )
}

/// Override tags that switch a word into and out of emphasis
fn effect_tags(style: &StylePreset) -> (String, String) {
    let highlight = style.highlight_color.to_ass_tag();
    let primary = style.primary_color.to_ass_tag();

    let (mut emphasis, mut reset) = match style.highlight_effect {
        HighlightEffect::ColorChange | HighlightEffect::ScaleUp => {
            (format!("\\c{}", highlight), format!("\\c{}", primary))
        }
        HighlightEffect::GlowPulse if style.glow.intensity != GlowIntensity::None => (
            format!(
                "\\c{}\\4c{}\\shad{}\\blur{}",
                highlight,
                style.glow.color.to_ass_tag(),
                style.glow.intensity.shadow(),
                style.glow.intensity.blur()
            ),
            format!("\\c{}\\shad0\\blur0", primary),
        ),
        HighlightEffect::GlowPulse => (format!("\\c{}", highlight), format!("\\c{}", primary)),
        HighlightEffect::BackgroundHighlight => (
            format!("\\3c{}\\bord{}", highlight, HIGHLIGHT_BORDER),
            format!(
                "\\3c{}\\bord{}",
                style.outline_color.to_ass_tag(),
                style.outline_width
            ),
        ),
    };

    let scale = match style.highlight_effect {
        HighlightEffect::ScaleUp => Some(
            style
                .animation
                .scale_on_highlight
                .unwrap_or(DEFAULT_HIGHLIGHT_SCALE),
        ),
        _ => style.animation.scale_on_highlight,
    };
    if let Some(scale) = scale {
        let percent = (scale * 100.0).round() as u32;
        emphasis.push_str(&format!("\\fscx{0}\\fscy{0}", percent));
        reset.push_str("\\fscx100\\fscy100");
    }

    (emphasis, reset)
}

/// Neutralize characters that would open override blocks or escapes
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            '\\' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}
