//! Normalisation of surface forms and document text.
//!
//! Every maximal run of Unicode whitespace, punctuation or symbol codepoints
//! collapses to a single space and the result is trimmed. The dictionary and
//! the matchers both go through [`normalize`], so a dictionary key always
//! equals the form the automaton sees at runtime.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\p{P}\p{S}\p{Z}]+").unwrap());

/// Normalise `text`; if `surround` is set the result is enclosed in one space
/// on each side.
pub fn normalize(text: &str, surround: bool) -> String {
    let composed: String = text.nfc().collect();
    let collapsed = SEPARATORS.replace_all(&composed, " ");
    let trimmed = collapsed.trim_matches(' ');
    if surround {
        let mut out = String::with_capacity(trimmed.len() + 2);
        out.push(' ');
        out.push_str(trimmed);
        out.push(' ');
        out
    } else {
        trimmed.to_string()
    }
}
