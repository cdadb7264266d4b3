//! Timestamp parsing and formatting

/// Format milliseconds as an ASS timestamp (`H:MM:SS.cc`), truncating to centiseconds
pub fn format_ass_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
}

/// Format milliseconds as an SRT timestamp (`HH:MM:SS,mmm`)
pub fn format_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Truncate milliseconds to the centisecond grid ASS timestamps use
pub fn quantize_cs(ms: u64) -> u64 {
    ms - ms % 10
}

/// Convert fractional seconds to whole milliseconds
///
/// Negative and non-finite inputs map to zero.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

/// Parse a timestamp into milliseconds
///
/// Accepts plain seconds (`12.5`), `MM:SS(.fff)` and `HH:MM:SS(.ffffff)`,
/// the last being what ffmpeg reports as `out_time`.
pub fn parse_timestamp_ms(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if !text.contains(':') {
        let seconds: f64 = text.parse().ok()?;
        return (seconds >= 0.0).then(|| seconds_to_ms(seconds));
    }

    let parts: Vec<&str> = text.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0u64, m.parse::<u64>().ok()?, s.parse::<f64>().ok()?),
        [h, m, s] => (
            h.parse::<u64>().ok()?,
            m.parse::<u64>().ok()?,
            s.parse::<f64>().ok()?,
        ),
        _ => return None,
    };
    if seconds < 0.0 || (parts.len() == 3 && minutes >= 60) {
        return None;
    }

    Some(hours * 3_600_000 + minutes * 60_000 + seconds_to_ms(seconds))
}
