//! Character-offset access to markup text.
//!
//! Markup spans count characters, Rust strings index bytes:
//!
//! ```text
//!   Text:  "Zoë said"
//!   chars:  Z o ë _ s a i d      ë is char 2
//!   bytes:  Z o ë ë _ s a i d    ë is bytes 2..4
//! ```
//!
//! `CharText` precomputes the char → byte table once per document so every
//! span slice afterwards is O(1). ASCII text skips the table entirely.

use crate::span::Span;

/// A borrowed text with O(1) character-offset slicing.
#[derive(Debug, Clone)]
pub struct CharText<'a> {
    text: &'a str,
    char_to_byte: Vec<usize>,
    char_len: usize,
    is_ascii: bool,
}

impl<'a> CharText<'a> {
    /// Index the given text.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        if text.is_ascii() {
            Self {
                text,
                char_to_byte: Vec::new(),
                char_len: text.len(),
                is_ascii: true,
            }
        } else {
            let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
            let char_len = char_to_byte.len();
            char_to_byte.push(text.len());
            Self {
                text,
                char_to_byte,
                char_len,
                is_ascii: false,
            }
        }
    }

    /// The underlying string.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Byte offset of a character offset, clamped to the end of the text.
    #[must_use]
    pub fn char_to_byte(&self, char_idx: usize) -> usize {
        let char_idx = char_idx.min(self.char_len);
        if self.is_ascii {
            char_idx
        } else {
            self.char_to_byte[char_idx]
        }
    }

    /// Text covered by a span. Out-of-range offsets are clamped and inverted
    /// spans yield an empty string.
    #[must_use]
    pub fn slice(&self, span: Span) -> &'a str {
        self.slice_chars(span.start, span.end)
    }

    /// Text between two character offsets, clamped like [`CharText::slice`].
    #[must_use]
    pub fn slice_chars(&self, start: usize, end: usize) -> &'a str {
        let start = self.char_to_byte(start);
        let end = self.char_to_byte(end);
        if start >= end {
            ""
        } else {
            &self.text[start..end]
        }
    }

    /// `width` characters on each side of the span, with the span marked as
    /// `>>span<<`.
    #[must_use]
    pub fn context(&self, span: Span, width: usize) -> String {
        format!(
            "{}>>{}<<{}",
            self.slice_chars(span.start.saturating_sub(width), span.start),
            self.slice(span),
            self.slice_chars(span.end, span.end.saturating_add(width)),
        )
    }
}
