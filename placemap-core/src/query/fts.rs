use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Turn free text into an FTS5 MATCH expression.
///
/// The text is NFC-composed and split into terms of letters, digits and
/// combining marks, so decomposed input (`"Krako\u{301}w"`) yields the same
/// term as its precomposed form and mark stripping is left to the index
/// tokenizer. Each term is quoted so FTS5 operators and punctuation in the
/// input never reach the query parser, and terms are OR-combined so a partial
/// match still ranks. Text without any terms yields an empty string, which
/// callers treat as "no hits".
pub fn prepare_fts_query(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed
        .split(|c: char| !(c.is_alphanumeric() || is_combining_mark(c)))
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{}\"", term.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" OR ")
}
