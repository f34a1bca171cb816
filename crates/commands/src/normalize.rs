use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds free chat text into a matching token: lower-case, canonical
/// decomposition with combining marks dropped, surrounding whitespace trimmed.
///
/// `normalize("  Paguei DIÁRIA ")` is `"paguei diaria"`.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}
