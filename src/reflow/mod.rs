//! Line reflow: wraps raw text into fixed-width display lines.
//!
//! Pure functions only. Widths are measured in terminal display columns
//! (`unicode-width`), so wide glyphs take two columns.

use std::num::NonZeroUsize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Lower bound for [`estimate_words_per_line`].
///
/// Keeps the words-to-lines conversion finite for text without words.
pub const MIN_WORDS_PER_LINE: f64 = 1.0;

/// Output of reflowing a text at one width.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflowed {
    /// Display lines in reading order.
    pub lines: Vec<String>,
    /// Average words per display line, never below [`MIN_WORDS_PER_LINE`].
    pub avg_words_per_line: f64,
}

/// Wrap `text` and estimate its pacing density in one pass.
pub fn reflow(text: &str, width: NonZeroUsize) -> Reflowed {
    let lines = wrap(text, width);
    let avg_words_per_line = estimate_words_per_line(&lines);
    Reflowed {
        lines,
        avg_words_per_line,
    }
}

/// Greedy word wrap.
///
/// - Source newlines are kept as paragraph breaks; a blank source line
///   becomes an empty display line.
/// - Runs of whitespace inside a paragraph collapse to one space.
/// - A word wider than `width` is split at character boundaries.
/// - Leading and trailing blank lines of the whole text are dropped, so
///   whitespace-only text yields no lines.
pub fn wrap(text: &str, width: NonZeroUsize) -> Vec<String> {
    let width = width.get();
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        let mut current = String::new();
        let mut current_width = 0usize;

        for word in paragraph.split_whitespace() {
            let word_width = word.width();

            if word_width > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let mut chunks = split_long_word(word, width);
                // Last chunk stays open so following words can join it.
                let tail = chunks.pop().unwrap_or_default();
                lines.extend(chunks);
                current_width = tail.width();
                current = tail;
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + 1 + word_width <= width {
                current.push(' ');
                current.push_str(word);
                current_width += 1 + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }

        // Empty paragraphs land here too and produce a blank line.
        lines.push(current);
    }

    lines
}

/// Average words per display line across `lines`.
///
/// Blank lines count toward the denominator: they take screen time like any
/// other line. Returns [`MIN_WORDS_PER_LINE`] for empty input.
pub fn estimate_words_per_line<S: AsRef<str>>(lines: &[S]) -> f64 {
    if lines.is_empty() {
        return MIN_WORDS_PER_LINE;
    }
    let words: usize = lines
        .iter()
        .map(|line| line.as_ref().split_whitespace().count())
        .sum();
    (words as f64 / lines.len() as f64).max(MIN_WORDS_PER_LINE)
}

fn split_long_word(word: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut chunk_width = 0usize;

    for ch in word.chars() {
        // Zero-width and control characters never force a break.
        let ch_width = ch.width().unwrap_or(0);
        if chunk_width + ch_width > width && !chunk.is_empty() {
            chunks.push(std::mem::take(&mut chunk));
            chunk_width = 0;
        }
        chunk.push(ch);
        chunk_width += ch_width;
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}
