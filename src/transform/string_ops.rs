use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Trims and collapses internal whitespace runs to a single space, borrowing
/// the original when it is already normalized. Returns `None` when nothing but
/// whitespace remains.
pub fn normalize_whitespace(input: &str) -> Option<Cow<'_, str>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut previous_space = false;
    let already_normalized = trimmed.chars().all(|ch| {
        let ok = !(ch.is_whitespace() && (ch != ' ' || previous_space));
        previous_space = ch == ' ';
        ok
    });
    if already_normalized {
        Some(Cow::Borrowed(trimmed))
    } else {
        Some(Cow::Owned(
            trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
        ))
    }
}

/// Decomposes to NFD and drops nonspacing marks (`São` → `Sao`).
pub fn remove_accents(input: &str) -> Cow<'_, str> {
    if input.is_ascii() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .nfd()
            .filter(|ch| ch.general_category() != GeneralCategory::NonspacingMark)
            .collect(),
    )
}

/// Uppercases the first letter of each space-separated word and lowercases the rest.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for (idx, word) in input.split(' ').enumerate() {
        if idx > 0 {
            output.push(' ');
        }
        let mut seen_letter = false;
        for ch in word.chars() {
            if !seen_letter && ch.is_alphabetic() {
                output.extend(ch.to_uppercase());
                seen_letter = true;
            } else {
                output.extend(ch.to_lowercase());
            }
        }
    }
    output
}
