//! Text segmentation for synthesis.
//!
//! Synthesis models accept a bounded amount of text per call. The chunker
//! packs whole words greedily into segments of at most `max_chars_per_segment`
//! characters, counting one joining space per word.

use std::iter::Peekable;
use std::str::SplitWhitespace;

/// Default synthesis segment length in characters.
pub const DEFAULT_MAX_CHARS: usize = 600;

/// Greedy word-boundary text chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Maximum number of characters in a segment, including inter-word spaces.
    /// A single word longer than this becomes its own segment; words are
    /// never split. Defaults to 600.
    pub max_chars_per_segment: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            max_chars_per_segment: DEFAULT_MAX_CHARS,
        }
    }
}

impl TextChunker {
    /// Creates a chunker with the specified max chars per segment.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars_per_segment: max_chars,
        }
    }

    /// Returns a lazy iterator over the segments of `text`.
    pub fn segments<'a>(&self, text: &'a str) -> Segments<'a> {
        Segments {
            words: text.split_whitespace().peekable(),
            max_chars: self.max_chars_per_segment,
        }
    }

    /// Splits `text` into segments. Empty or blank input yields no segments.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.segments(text).collect()
    }
}

/// Splits `text` with the given maximum segment length.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    TextChunker::new(max_chars).split(text)
}

/// Iterator returned by [`TextChunker::segments`].
pub struct Segments<'a> {
    words: Peekable<SplitWhitespace<'a>>,
    max_chars: usize,
}

impl Iterator for Segments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut segment = String::new();
        // Each accumulated word counts its length plus one joining space.
        let mut length = 0usize;

        while let Some(word) = self.words.peek() {
            let word_len = word.chars().count();
            if length > 0 && length + word_len + 1 > self.max_chars {
                break;
            }
            if !segment.is_empty() {
                segment.push(' ');
            }
            segment.push_str(word);
            length += word_len + 1;
            self.words.next();
        }

        if segment.is_empty() { None } else { Some(segment) }
    }
}
