//! Shared text normalisation.
//!
//! Column suggestion goes through [`fold_text`] so that "Ação", "acao" and
//! "ACAO" compare equal. Identity keys for duplicate detection are stricter:
//! emails are only trimmed and lowercased, phones keep their digits.

use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics, collapse inner whitespace, trim.
pub fn fold_text(input: &str) -> String {
    // Decompose to NFD and drop combining marks
    let stripped: String = input
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect();

    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Label form used for header/field matching: folded, without the `*` required marker.
pub fn normalize_label(label: &str) -> String {
    fold_text(&label.replace('*', ""))
}

/// Identity key for an email address: trimmed and lowercased; `None` when blank.
pub fn email_key(email: &str) -> Option<String> {
    let key = email.trim().to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Identity key for a phone number: its digits only; `None` when it has none.
pub fn phone_key(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}
