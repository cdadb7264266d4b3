// Unit tests for domain models

use crate::domain::model::*;
use crate::error::ErrorKind;

#[test]
fn test_word_trims_text() {
    let word = Word::new("  hello ", 0, 500).unwrap();
    assert_eq!(word.text, "hello");
    assert_eq!(word.char_len(), 5);
    assert_eq!(word.duration_ms(), 500);
}

#[test]
fn test_word_rejects_negative_duration() {
    let err = Word::new("oops", 500, 100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTranscript);
}

#[test]
fn test_word_char_len_counts_unicode_scalars() {
    let word = Word::new("café", 0, 10).unwrap();
    assert_eq!(word.char_len(), 4);
}

#[test]
fn test_validate_words_empty() {
    let err = validate_words(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyTranscript);
}

#[test]
fn test_validate_words_out_of_order() {
    let words = vec![
        Word::new("b", 600, 900).unwrap(),
        Word::new("a", 100, 400).unwrap(),
    ];
    let err = validate_words(&words).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTranscript);
}

#[test]
fn test_validate_words_allows_overlap_between_neighbours() {
    // Starts are ordered even though the first word runs past the second's start
    let words = vec![
        Word::new("a", 0, 700).unwrap(),
        Word::new("b", 500, 900).unwrap(),
    ];
    assert!(validate_words(&words).is_ok());
}

#[test]
fn test_cue_text_joins_words() {
    let cue = Cue {
        words: vec![
            Word::new("hello", 0, 500).unwrap(),
            Word::new("world", 600, 1100).unwrap(),
        ],
        start_ms: 0,
        end_ms: 1100,
        opened_by: CueBreak::First,
    };
    assert_eq!(cue.text(), "hello world");
    assert_eq!(cue.duration_ms(), 1100);
}

#[test]
fn test_orientation_display() {
    assert_eq!(Orientation::Vertical.to_string(), "vertical");
    assert_eq!(Orientation::Horizontal.to_string(), "horizontal");
    assert_eq!(Orientation::Square.to_string(), "square");
}
