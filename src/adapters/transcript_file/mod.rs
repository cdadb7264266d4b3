//! Transcript file adapter
//!
//! Reads word timings produced ahead of time by an ASR run. Two layouts are
//! accepted: a flat list of `{text, start_ms, end_ms}` objects, and the
//! whisper-style `{"segments": [{"words": [{"word", "start", "end"}]}]}`
//! with times in seconds.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::model::Word;
use crate::error::{SubforgeError, SubforgeResult};
use crate::ports::{StageContext, TranscribePort};
use crate::utils::time::seconds_to_ms;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptDocument {
    Flat(Vec<FlatWord>),
    Segmented { segments: Vec<Segment> },
}

#[derive(Debug, Deserialize)]
struct FlatWord {
    text: String,
    start_ms: u64,
    end_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    words: Vec<SegmentWord>,
}

#[derive(Debug, Deserialize)]
struct SegmentWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parse a word file in either supported layout
///
/// Blank tokens are dropped; the remaining words must be well-formed.
pub fn parse_words(json: &str) -> SubforgeResult<Vec<Word>> {
    let document: TranscriptDocument =
        serde_json::from_str(json).map_err(|e| SubforgeError::InvalidTranscript {
            message: format!("unrecognized word file: {}", e),
        })?;

    let raw: Vec<(String, u64, u64)> = match document {
        TranscriptDocument::Flat(words) => words
            .into_iter()
            .map(|w| (w.text, w.start_ms, w.end_ms))
            .collect(),
        TranscriptDocument::Segmented { segments } => segments
            .into_iter()
            .flat_map(|segment| segment.words)
            .map(|w| (w.word, seconds_to_ms(w.start), seconds_to_ms(w.end)))
            .collect(),
    };

    raw.into_iter()
        .filter(|(text, _, _)| !text.trim().is_empty())
        .map(|(text, start, end)| Word::new(text, start, end))
        .collect()
}

/// Where a transcript for `source` is looked up
pub fn sidecar_path(source: &Path) -> PathBuf {
    source.with_extension("words.json")
}

/// Transcriber backed by word files on disk
pub struct TranscriptFileAdapter {
    /// Fixed file to read; otherwise `<source>.words.json`
    path: Option<PathBuf>,
}

impl TranscriptFileAdapter {
    /// Read every transcript from one file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Read each source's sidecar file
    pub fn sidecar() -> Self {
        Self { path: None }
    }

    /// Read and parse a word file
    pub async fn load(path: &Path) -> SubforgeResult<Vec<Word>> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            SubforgeError::collaborator(
                "transcribe",
                format!("could not read {}: {}", path.display(), e),
            )
        })?;
        parse_words(&json)
    }
}

#[async_trait]
impl TranscribePort for TranscriptFileAdapter {
    async fn transcribe(&self, source: &Path, ctx: &StageContext) -> SubforgeResult<Vec<Word>> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| sidecar_path(source));
        debug!("Reading transcript for {} from {}", source.display(), path.display());

        ctx.checkpoint()?;
        let words = Self::load(&path).await?;
        ctx.report(1.0);

        info!("Loaded {} words from {}", words.len(), path.display());
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_flat_words() {
        let json = r#"[
            {"text": "hello", "start_ms": 0, "end_ms": 500},
            {"text": " world ", "start_ms": 600, "end_ms": 1100}
        ]"#;
        let words = parse_words(json).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].text, "world");
        assert_eq!(words[1].end_ms, 1100);
    }

    #[test]
    fn test_parse_whisper_segments() {
        let json = r#"{"segments": [
            {"text": "Hi there", "words": [
                {"word": " Hi", "start": 0.0, "end": 0.32},
                {"word": " there", "start": 0.4, "end": 0.9}
            ]},
            {"words": [{"word": " ", "start": 1.0, "end": 1.1}]}
        ]}"#;
        let words = parse_words(json).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hi");
        assert_eq!((words[1].start_ms, words[1].end_ms), (400, 900));
    }

    #[test]
    fn test_reversed_word_rejected() {
        let json = r#"[{"text": "oops", "start_ms": 900, "end_ms": 100}]"#;
        let err = parse_words(json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTranscript);
    }

    #[test]
    fn test_unknown_layout_rejected() {
        let err = parse_words(r#"{"words": 3}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTranscript);
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/v/talk.mp4")),
            PathBuf::from("/v/talk.words.json")
        );
    }

    #[tokio::test]
    async fn test_transcribe_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.json");
        std::fs::write(&path, r#"[{"text": "hi", "start_ms": 0, "end_ms": 300}]"#).unwrap();

        let adapter = TranscriptFileAdapter::new(&path);
        let words = adapter
            .transcribe(Path::new("/v/any.mp4"), &StageContext::detached())
            .await
            .unwrap();
        assert_eq!(words.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_collaborator_failure() {
        let adapter = TranscriptFileAdapter::sidecar();
        let err = adapter
            .transcribe(Path::new("/no/such/video.mp4"), &StageContext::detached())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
    }
}
