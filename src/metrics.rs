//! Word and character counts for extracted text.
//!
//! Words are maximal runs of word characters (alphanumeric or `_`), so
//! punctuation-only tokens such as the `---` of page separators, runs of
//! spaces left by OCR, and hyphens never inflate the count.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextMetrics {
    pub word_count: usize,
    pub character_length: usize,
}

impl TextMetrics {
    pub fn of(text: &str) -> Self {
        Self {
            word_count: count_words(text),
            character_length: text.chars().count(),
        }
    }

    /// `None` yields zero counts.
    pub fn of_optional(text: Option<&str>) -> Self {
        text.map(Self::of).unwrap_or_default()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Count word-boundary delimited runs of word characters.
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in text.chars() {
        let word = is_word_char(c);
        if word && !in_word {
            count += 1;
        }
        in_word = word;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(text: &str) -> (usize, usize) {
        let m = TextMetrics::of(text);
        (m.word_count, m.character_length)
    }

    #[test]
    fn test_empty_and_none() {
        assert_eq!(pair(""), (0, 0));
        assert_eq!(TextMetrics::of_optional(None), TextMetrics::default());
    }

    #[test]
    fn test_simple_sentence() {
        assert_eq!(pair("Hello world"), (2, 11));
    }

    #[test]
    fn test_punctuation_not_counted() {
        assert_eq!(pair("Hello, world! How are you?"), (5, 26));
    }

    #[test]
    fn test_repeated_spaces() {
        assert_eq!(pair("Hello    world   test"), (3, 21));
    }

    #[test]
    fn test_page_separators_do_not_inflate() {
        let text = "--- Page 1 ---\nAlpha beta\n\n--- Page 2 ---\nGamma";
        // "Page", "1", "Alpha", "beta", "Page", "2", "Gamma"
        assert_eq!(count_words(text), 7);
    }

    #[test]
    fn test_hyphen_and_underscore() {
        assert_eq!(count_words("state-of-the-art"), 4);
        assert_eq!(count_words("snake_case_name"), 1);
        assert_eq!(count_words("  ...  !!! "), 0);
    }

    #[test]
    fn test_unicode_counts_chars_not_bytes() {
        let m = TextMetrics::of("café naïve");
        assert_eq!(m.word_count, 2);
        assert_eq!(m.character_length, 10);
    }
}
