//! Deterministic text cleanup applied before every review.

use unicode_normalization::UnicodeNormalization;

/// Square brackets, including the forms NFKC folds into `[` / `]`.
/// `【】` is left alone: it marks the product name.
const BRACKETS: &[char] = &['[', ']', '［', '］', '﹇', '﹈'];

/// Normalize review input.
///
/// In order: drop square brackets (keeping their content), NFKC-fold
/// full-width forms, lowercase ASCII letters only, trim.
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(text: &str) -> String {
    let without_brackets: String = text.chars().filter(|c| !BRACKETS.contains(c)).collect();
    let folded: String = without_brackets.nfkc().collect();
    folded.to_ascii_lowercase().trim().to_string()
}
