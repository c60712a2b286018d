//! Property-based tests for line reflow.

use proptest::prelude::*;
use std::num::NonZeroUsize;
use telescroll::reflow::{estimate_words_per_line, wrap, MIN_WORDS_PER_LINE};
use unicode_width::UnicodeWidthStr;

fn non_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

proptest! {
    #[test]
    fn lines_fit_width(text in "[a-z ]{0,200}", width in 1usize..50) {
        let lines = wrap(&text, NonZeroUsize::new(width).unwrap());
        for line in &lines {
            prop_assert!(line.width() <= width, "{:?} wider than {}", line, width);
        }
    }

    #[test]
    fn wrapping_keeps_every_character(text in "[a-zA-Z0-9 \n.,]{0,300}", width in 1usize..40) {
        let lines = wrap(&text, NonZeroUsize::new(width).unwrap());
        prop_assert_eq!(non_whitespace(&lines.concat()), non_whitespace(&text));
    }

    #[test]
    fn wide_glyphs_fit_when_width_allows(text in "[日本語テキスト ]{0,60}", width in 2usize..30) {
        let lines = wrap(&text, NonZeroUsize::new(width).unwrap());
        for line in &lines {
            prop_assert!(line.width() <= width);
        }
    }

    #[test]
    fn no_line_has_edge_spaces(text in "[a-z ]{0,200}", width in 1usize..50) {
        for line in wrap(&text, NonZeroUsize::new(width).unwrap()) {
            prop_assert_eq!(line.trim(), line.as_str());
        }
    }

    #[test]
    fn words_per_line_has_floor(lines in prop::collection::vec("[a-z ]{0,30}", 0..20)) {
        let estimate = estimate_words_per_line(&lines);
        prop_assert!(estimate >= MIN_WORDS_PER_LINE);
        prop_assert!(estimate.is_finite());
    }
}
