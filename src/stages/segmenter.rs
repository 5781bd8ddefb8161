// src/stages/segmenter.rs
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use super::SegmentationBackend;
use crate::error::PipelineError;
use crate::types::TextSegment;

/// Default soft cap on segment length, in characters
pub const DEFAULT_MAX_SEGMENT_LENGTH: usize = 100;

/// Greedy sentence packer.
///
/// Sentences end at ". ". Sentences are appended to the running segment until
/// the next one would push it past `max_len` characters. A sentence longer than
/// `max_len` is never split; it becomes a segment of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSegmenter;

impl SegmentationBackend for SentenceSegmenter {
    fn segment(&self, text: &str, max_len: usize) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in split_sentences(&normalized) {
            let sentence_len = sentence.chars().count();
            if !current.is_empty() && current_len + 1 + sentence_len > max_len {
                segments.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(&sentence);
            current_len += sentence_len;
        }

        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// Split on ". ", keeping each sentence's terminating period.
fn split_sentences(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split(". ").collect();
    let last = pieces.len().saturating_sub(1);
    pieces
        .iter()
        .enumerate()
        .filter_map(|(i, piece)| {
            let piece = piece.trim();
            if piece.is_empty() {
                None
            } else if i < last {
                Some(format!("{}.", piece))
            } else {
                Some(piece.to_string())
            }
        })
        .collect()
}

/// Segmentation stage: wraps a backend and enforces the non-empty contract
#[derive(Clone)]
pub struct TextSegmenter {
    backend: Arc<dyn SegmentationBackend>,
    max_len: usize,
}

impl TextSegmenter {
    pub fn new(backend: Arc<dyn SegmentationBackend>, max_len: usize) -> Self {
        Self {
            backend,
            max_len: max_len.max(1),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn segment(&self, text: &str) -> Result<Vec<TextSegment>, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let segments: Vec<TextSegment> = self
            .backend
            .segment(text, self.max_len)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(i, text)| TextSegment { index: i + 1, text })
            .collect();

        if segments.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        Ok(segments)
    }
}

impl Default for TextSegmenter {
    fn default() -> Self {
        Self::new(Arc::new(SentenceSegmenter), DEFAULT_MAX_SEGMENT_LENGTH)
    }
}

/// Words of four or more letters, de-duplicated case-insensitively, in order
pub fn key_concepts(text: &str) -> Vec<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new(r"\b[A-Za-z]{4,}\b").expect("valid regex"));

    let mut seen = HashSet::new();
    word.find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| seen.insert(w.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, max_len: usize) -> Vec<String> {
        SentenceSegmenter.segment(text, max_len)
    }

    #[test]
    fn test_packs_sentences_up_to_limit() {
        let text = "Cats are great. Dogs are loyal. Birds can fly.";
        assert_eq!(segment(text, 100), vec![text.to_string()]);
        assert_eq!(
            segment(text, 32),
            vec!["Cats are great. Dogs are loyal.", "Birds can fly."]
        );
        assert_eq!(
            segment(text, 10),
            vec!["Cats are great.", "Dogs are loyal.", "Birds can fly."]
        );
    }

    #[test]
    fn test_long_sentence_is_kept_whole() {
        let long = "This single sentence is far longer than the tiny limit we pass in";
        let segments = segment(long, 10);
        assert_eq!(segments, vec![long.to_string()]);
    }

    #[test]
    fn test_sentences_reappear_once_in_order() {
        let text = "One fish.  Two fish.\nRed fish. Blue fish. And a final line without a period";
        for max_len in [5, 20, 40, 200] {
            let joined = segment(text, max_len).join(" ");
            assert_eq!(
                joined,
                "One fish. Two fish. Red fish. Blue fish. And a final line without a period"
            );
        }
    }

    #[test]
    fn test_stage_numbers_segments_from_one() {
        let segmenter = TextSegmenter::new(Arc::new(SentenceSegmenter), 16);
        let segments = segmenter.segment("Cats are great. Dogs are loyal.").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[1].index, 2);
        assert_eq!(segments[1].text, "Dogs are loyal.");
    }

    #[test]
    fn test_empty_input_fails() {
        let segmenter = TextSegmenter::default();
        assert!(matches!(segmenter.segment("   \n "), Err(PipelineError::EmptyInput)));
        assert!(matches!(segmenter.segment(""), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn test_key_concepts() {
        let concepts = key_concepts("Rural villages get internet. Villages need rural internet access!");
        assert_eq!(concepts, vec!["Rural", "villages", "internet", "need", "access"]);
    }
}
