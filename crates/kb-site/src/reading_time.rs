//! Reading-time estimation.

use std::sync::LazyLock;

use regex::Regex;

use crate::metadata::ReadingTime;

/// Words read per minute.
pub const WORDS_PER_MINUTE: u64 = 300;

/// Each CJK character counts as one word; other scripts count runs of
/// letters and digits (with inner apostrophes or hyphens).
static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]|[\p{Latin}\p{Cyrillic}\p{Greek}\d]+(?:['’\-][\p{Latin}\p{Cyrillic}\p{Greek}\d]+)*",
    )
    .unwrap()
});

/// Count words in plain text.
#[must_use]
pub fn count_words(text: &str) -> u64 {
    WORD_PATTERN.find_iter(text).count() as u64
}

/// Estimate reading time of plain text.
#[must_use]
pub fn estimate(text: &str) -> ReadingTime {
    let words = count_words(text);
    #[allow(clippy::cast_precision_loss)]
    let minutes = (words as f64 / WORDS_PER_MINUTE as f64 * 100.0).round() / 100.0;
    ReadingTime { minutes, words }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_latin_words() {
        assert_eq!(count_words("The quick brown fox, don't stop!"), 5);
        assert_eq!(count_words("state-of-the-art v2"), 2);
    }

    #[test]
    fn test_counts_cjk_characters() {
        assert_eq!(count_words("工厂模式"), 4);
        assert_eq!(count_words("使用 Builder 模式"), 5);
    }

    #[test]
    fn test_counts_cyrillic() {
        assert_eq!(count_words("Привет мир"), 2);
    }

    #[test]
    fn test_ignores_punctuation_only() {
        assert_eq!(count_words("--- ... !!! ，。"), 0);
    }

    #[test]
    fn test_estimate_rounds_to_two_decimals() {
        let text = "word ".repeat(792);
        assert_eq!(
            estimate(&text),
            ReadingTime {
                minutes: 2.64,
                words: 792
            }
        );
        assert_eq!(estimate("a b c").minutes, 0.01);
        assert_eq!(estimate("").minutes, 0.0);
    }
}
