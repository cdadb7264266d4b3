//! Path helpers for job inputs and outputs

use std::path::{Path, PathBuf};

use crate::error::{SubforgeError, SubforgeResult};

/// Suffix appended to every rendered video
pub const OUTPUT_SUFFIX: &str = "with_subtitles";

/// Container extension of rendered videos
pub const OUTPUT_EXTENSION: &str = "mp4";

/// File stem of `path`, or `video` when it has none
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string())
}

/// `<stem>_<style>_with_subtitles.mp4`
pub fn output_file_name(source: &Path, style_id: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        stem_of(source),
        style_id,
        OUTPUT_SUFFIX,
        OUTPUT_EXTENSION
    )
}

/// Output location for `source` rendered with `style_id`
///
/// Without an output directory the video lands next to its source.
pub fn output_path(output_dir: Option<&Path>, source: &Path, style_id: &str) -> PathBuf {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    dir.join(output_file_name(source, style_id))
}

/// Ensure `source` is an existing, non-empty file
pub fn validate_source(source: &Path) -> SubforgeResult<()> {
    let metadata = std::fs::metadata(source).map_err(|e| SubforgeError::SourceUnavailable {
        message: format!("{}: {}", source.display(), e),
    })?;

    if !metadata.is_file() {
        return Err(SubforgeError::SourceUnavailable {
            message: format!("{} is not a file", source.display()),
        });
    }
    if metadata.len() == 0 {
        return Err(SubforgeError::SourceUnavailable {
            message: format!("{} is empty", source.display()),
        });
    }
    Ok(())
}
