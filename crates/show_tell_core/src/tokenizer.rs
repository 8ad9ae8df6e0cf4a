//! crates/show_tell_core/src/tokenizer.rs
//!
//! Sentence and word segmentation using the Unicode default boundary rules.

use unicode_segmentation::UnicodeSegmentation;

/// Splits free text into trimmed, non-empty sentences in order of appearance.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercases a sentence and re-joins its word tokens with single spaces.
///
/// Punctuation is kept as its own token, so `"Sales rose."` becomes
/// `"sales rose ."`.
pub fn normalize(sentence: &str) -> String {
    sentence
        .to_lowercase()
        .split_word_bounds()
        .filter(|token| !token.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
